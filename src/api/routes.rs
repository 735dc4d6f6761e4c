//! API route configuration and the request pipeline.

use axum::routing::get;
use axum::{Json, Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::error::ErrorResponse;
use super::handlers::{self, HealthResponse};
use super::pipeline;
use super::state::AppState;
use super::v0_9::{self, *};
use super::version::{VersionError, VersionMap};

/// Browser documentation UI.
pub const DOCS_PATH: &str = "/docs";

/// Controller namespaces and the routers they contribute.
const CONTROLLERS: &[(&str, fn() -> Router<AppState>)] = &[(v0_9::NAMESPACE, v0_9::router)];

/// Version map for every controller namespace in the crate.
pub fn version_map() -> Result<VersionMap, VersionError> {
    let namespaces: Vec<&'static str> = CONTROLLERS.iter().map(|(ns, _)| *ns).collect();
    VersionMap::from_namespaces(&namespaces)
}

fn controllers_for(namespace: &str) -> Option<fn() -> Router<AppState>> {
    CONTROLLERS
        .iter()
        .find(|(ns, _)| *ns == namespace)
        .map(|(_, router)| *router)
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "McLaren API",
        version = "v0.9",
        description = "Races, cars and drivers"
    ),
    paths(
        handlers::health,
        v0_9::list_races,
        v0_9::get_race,
        v0_9::create_race,
        v0_9::update_race,
        v0_9::delete_race,
        v0_9::list_cars,
        v0_9::get_car,
        v0_9::create_car,
        v0_9::update_car,
        v0_9::delete_car,
        v0_9::list_car_drivers,
        v0_9::car_graph,
        v0_9::list_drivers,
        v0_9::get_driver,
        v0_9::create_driver,
        v0_9::update_driver,
        v0_9::delete_driver,
        v0_9::list_driver_wins,
        v0_9::driver_graph,
    ),
    components(
        schemas(
            HealthResponse,
            RaceResponse,
            RaceRequest,
            RaceList,
            CarResponse,
            CarRequest,
            CarList,
            DriverResponse,
            DriverRequest,
            DriverList,
            ErrorResponse,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "races", description = "Grand prix calendar and results"),
        (name = "cars", description = "Car management endpoints"),
        (name = "drivers", description = "Driver management endpoints")
    )
)]
pub struct ApiDoc;

/// Path of the machine-readable description for the documented version.
pub fn docs_json_path(state: &AppState) -> Option<String> {
    state
        .versions()
        .latest()
        .map(|v| format!("{}/{}/docs.json", DOCS_PATH, v.group_name()))
}

/// Build the application.
///
/// Requests pass through, in order: documentation endpoints, HTTPS
/// enforcement, routing, authorization and content negotiation (matched
/// routes only) and finally the controller. Panic recovery, error reporting and the supported-versions
/// header wrap all of it.
pub fn create_router(state: AppState) -> Router {
    let api = ApiDoc::openapi();

    let mut docs: Router<AppState> = Router::new().merge(Scalar::with_url(DOCS_PATH, api.clone()));
    if let Some(path) = docs_json_path(&state) {
        docs = docs.route(
            &path,
            get(move || {
                let api = api.clone();
                async move { Json(api) }
            }),
        );
    }

    let mut controllers: Router<AppState> =
        Router::new().route("/health", get(handlers::health));
    for version in state.versions().versions() {
        let Some(router) = state.versions().namespace(version).and_then(controllers_for) else {
            continue;
        };
        let routed = router()
            .route_layer(middleware::from_fn(pipeline::negotiate_content))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                pipeline::authorize,
            ));
        controllers = controllers.nest(&version.path_prefix(), routed);
    }
    let controllers = controllers
        .fallback(pipeline::route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pipeline::enforce_https,
        ));

    docs.merge(controllers)
        .layer(CatchPanicLayer::custom(pipeline::panic_response))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pipeline::handle_errors,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pipeline::report_api_versions,
        ))
        .with_state(state)
}
