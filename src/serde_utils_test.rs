use serde_json::json;

use crate::db::{Car, Driver, DriverRole, Race};
use crate::serde_utils::{EntityGraph, GraphError};

fn mcl35m() -> Car {
    Car {
        id: Some(1),
        name: "MCL35M".to_string(),
        season: 2021,
        engine: "Mercedes M12".to_string(),
        team: "McLaren".to_string(),
    }
}

fn driver(id: i64, name: &str) -> Driver {
    Driver {
        id: Some(id),
        name: name.to_string(),
        nationality: None,
        team: "McLaren".to_string(),
        number: None,
        role: DriverRole::Race,
        car_id: Some(1),
    }
}

/// car → drivers → each driver's car points back at the root.
fn cyclic_graph() -> EntityGraph {
    let mut graph = EntityGraph::new();
    let car = graph.insert(&mcl35m());
    for (id, name) in [(10, "Lando Norris"), (11, "Daniel Ricciardo")] {
        let d = graph.insert(&driver(id, name));
        graph.link_many(car, "drivers", d);
        graph.link_one(d, "car", car);
    }
    graph
}

#[test]
fn insert_deduplicates_by_kind_and_id() {
    let mut graph = EntityGraph::new();
    let a = graph.insert(&mcl35m());
    let b = graph.insert(&mcl35m());
    assert_eq!(a, b);
    assert_eq!(graph.len(), 1);

    // Same id, different kind: distinct nodes.
    let d = graph.insert(&driver(1, "Lando Norris"));
    assert_ne!(a, d);
}

#[test]
fn cycles_encode_with_references() {
    let encoded = cyclic_graph().to_json();

    assert_eq!(encoded["$id"], "1");
    assert_eq!(encoded["$type"], "Car");
    let drivers = encoded["drivers"]["$values"].as_array().unwrap();
    assert_eq!(drivers.len(), 2);
    for d in drivers {
        assert_eq!(d["car"], json!({"$ref": "1"}));
    }
}

#[test]
fn decoding_preserves_reference_identity() {
    let text = serde_json::to_string(&cyclic_graph()).unwrap();
    let decoded: EntityGraph = serde_json::from_str(&text).unwrap();

    let root = decoded.root().unwrap();
    assert_eq!(decoded.node(root).kind, "Car");
    let drivers = decoded.many(root, "drivers");
    assert_eq!(drivers.len(), 2);
    for d in drivers {
        assert_eq!(decoded.one(*d, "car"), Some(root));
    }
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded, EntityGraph::from_json(&decoded.to_json()).unwrap());
}

#[test]
fn shared_references_decode_to_one_node() {
    let input = json!({
        "$id": "1",
        "$type": "Race",
        "name": "Italian Grand Prix",
        "winner": {"$id": "2", "$type": "Driver", "name": "Daniel Ricciardo"},
        "fastest_lap": {"$ref": "2"}
    });
    let graph = EntityGraph::from_json(&input).unwrap();
    let root = graph.root().unwrap();
    assert_eq!(graph.one(root, "winner"), graph.one(root, "fastest_lap"));
    assert_eq!(graph.len(), 2);
}

#[test]
fn empty_to_many_link_survives_round_trip() {
    let mut graph = EntityGraph::new();
    let lando = graph.insert(&driver(10, "Lando Norris"));
    graph.declare_many(lando, "wins");

    let decoded = EntityGraph::from_json(&graph.to_json()).unwrap();
    let root = decoded.root().unwrap();
    assert!(decoded.many(root, "wins").is_empty());
    assert!(decoded.node(root).links.contains_key("wins"));
    assert!(!decoded.node(root).fields.contains_key("wins"));
}

#[test]
fn reference_before_its_id_resolves() {
    // The root's "car" is a $ref; the car's $id only appears later, nested
    // under "teammate".
    let input = json!({
        "$id": "1",
        "$type": "Driver",
        "name": "Lando Norris",
        "car": {"$ref": "3"},
        "teammate": {
            "$id": "2",
            "$type": "Driver",
            "name": "Oscar Piastri",
            "car": {"$id": "3", "$type": "Car", "name": "MCL38"}
        }
    });
    let graph = EntityGraph::from_json(&input).unwrap();
    let root = graph.root().unwrap();
    let teammate = graph.one(root, "teammate").unwrap();

    let car = graph.one(root, "car").unwrap();
    assert_eq!(graph.one(teammate, "car"), Some(car));
    assert_eq!(graph.node(car).kind, "Car");
    assert_eq!(graph.len(), 3);
}

#[test]
fn reference_inside_values_before_its_id_resolves() {
    let input = json!({
        "$id": "1",
        "$type": "Car",
        "drivers": {"$values": [{"$ref": "2"}]},
        "reserve": {"$id": "2", "$type": "Driver", "name": "Pato O'Ward"}
    });
    let graph = EntityGraph::from_json(&input).unwrap();
    let root = graph.root().unwrap();
    assert_eq!(graph.many(root, "drivers"), &[graph.one(root, "reserve").unwrap()]);
}

#[test]
fn reference_to_unknown_id_is_rejected() {
    let input = json!({"$id": "1", "next": {"$ref": "2"}});
    assert_eq!(
        EntityGraph::from_json(&input),
        Err(GraphError::UnresolvedReference("2".to_string()))
    );
}

#[test]
fn duplicate_id_is_rejected() {
    let input = json!({"$id": "1", "other": {"$id": "1"}});
    assert_eq!(
        EntityGraph::from_json(&input),
        Err(GraphError::DuplicateId("1".to_string()))
    );
}

#[test]
fn scalar_fields_are_kept() {
    let mut graph = EntityGraph::new();
    let race = Race {
        id: Some(5),
        name: "British Grand Prix".to_string(),
        circuit: "Silverstone".to_string(),
        country: "United Kingdom".to_string(),
        season: 2024,
        round: 12,
        date: Some("2024-07-07".to_string()),
        winner_id: None,
    };
    graph.insert(&race);

    let decoded = EntityGraph::from_json(&graph.to_json()).unwrap();
    let fields = &decoded.node(decoded.root().unwrap()).fields;
    assert_eq!(fields["circuit"], "Silverstone");
    assert_eq!(fields["winner_id"], serde_json::Value::Null);
}
