use super::version::{ApiVersion, VersionError, VersionMap};

#[test]
fn namespace_suffix_encodes_version() {
    let version = ApiVersion::from_namespace("mclaren_api::api::v0_9").unwrap();
    assert_eq!(version, ApiVersion::new(0, 9));
    assert_eq!(version.to_string(), "0.9");
    assert_eq!(version.group_name(), "v0.9");
    assert_eq!(version.path_prefix(), "/api/v0.9");

    assert_eq!(
        ApiVersion::from_namespace("v2_10").unwrap(),
        ApiVersion::new(2, 10)
    );
}

#[test]
fn controller_namespace_maps_to_v0_9() {
    assert_eq!(
        ApiVersion::from_namespace(super::v0_9::NAMESPACE).unwrap(),
        ApiVersion::new(0, 9)
    );
}

#[test]
fn malformed_namespaces_are_rejected() {
    for namespace in ["mclaren_api::api", "api::v0", "api::v0_", "api::vx_9", "api::0_9"] {
        assert!(
            matches!(
                ApiVersion::from_namespace(namespace),
                Err(VersionError::MalformedNamespace { .. })
            ),
            "{namespace} should be rejected"
        );
    }
}

#[test]
fn url_tokens_parse_with_or_without_prefix() {
    assert_eq!(ApiVersion::parse("v0.9").unwrap(), ApiVersion::new(0, 9));
    assert_eq!(ApiVersion::parse("0.9").unwrap(), ApiVersion::new(0, 9));
    assert!(ApiVersion::parse("v1").is_err());
    assert!(ApiVersion::parse("latest").is_err());
    assert!(ApiVersion::parse("v0.9.1").is_err());
}

#[test]
fn map_resolves_only_mapped_versions() {
    let map = VersionMap::from_namespaces(&["crate::api::v0_9", "crate::api::v1_0"]).unwrap();

    assert_eq!(map.resolve("v0.9"), Some(ApiVersion::new(0, 9)));
    assert_eq!(map.resolve("v1.0"), Some(ApiVersion::new(1, 0)));
    assert_eq!(map.resolve("v0.8"), None);
    assert_eq!(map.resolve("drivers"), None);
    assert_eq!(map.namespace(ApiVersion::new(1, 0)), Some("crate::api::v1_0"));
    assert_eq!(map.latest(), Some(ApiVersion::new(1, 0)));
    assert_eq!(map.supported(), "0.9, 1.0");
}

#[test]
fn two_namespaces_cannot_claim_one_version() {
    let err = VersionMap::from_namespaces(&["a::v0_9", "b::v0_09"]).unwrap_err();
    assert_eq!(
        err,
        VersionError::Duplicate {
            version: ApiVersion::new(0, 9),
            first: "a::v0_9".to_string(),
            second: "b::v0_09".to_string(),
        }
    );
}

#[test]
fn crate_version_map_serves_v0_9() {
    let map = super::version_map().unwrap();
    assert_eq!(map.latest(), Some(ApiVersion::new(0, 9)));
    assert_eq!(map.supported(), "0.9");
}
