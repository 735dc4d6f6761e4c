//! Version 0.9 controllers.
//!
//! The module name is the version: `v0_9` is served as `v0.9`.

mod cars;
mod drivers;
mod races;

#[cfg(test)]
mod cars_test;
#[cfg(test)]
mod races_test;

pub use cars::*;
pub use drivers::*;
pub use races::*;

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::api::state::AppState;

/// Namespace this version's controllers live in.
pub const NAMESPACE: &str = module_path!();

/// Register handlers, one method per line.
macro_rules! routes {
    ($($method:ident $path:literal => $handler:path),* $(,)?) => {{
        let router: Router<AppState> = Router::new();
        $(
            let router = router.route($path, $method($handler));
        )*
        router
    }};
}

/// Routes for this version, relative to its `/api/v0.9` prefix.
pub fn router() -> Router<AppState> {
    let race_routes = routes! {
        get "/races" => list_races,
        post "/races" => create_race,
        get "/races/{id}" => get_race,
        put "/races/{id}" => update_race,
        delete "/races/{id}" => delete_race,
    };

    let car_routes = routes! {
        get "/cars" => list_cars,
        post "/cars" => create_car,
        get "/cars/{id}" => get_car,
        put "/cars/{id}" => update_car,
        delete "/cars/{id}" => delete_car,
        get "/cars/{id}/drivers" => list_car_drivers,
        get "/cars/{id}/graph" => car_graph,
    };

    let driver_routes = routes! {
        get "/drivers" => list_drivers,
        post "/drivers" => create_driver,
        get "/drivers/{id}" => get_driver,
        put "/drivers/{id}" => update_driver,
        delete "/drivers/{id}" => delete_driver,
        get "/drivers/{id}/wins" => list_driver_wins,
        get "/drivers/{id}/graph" => driver_graph,
    };

    race_routes.merge(car_routes).merge(driver_routes)
}
