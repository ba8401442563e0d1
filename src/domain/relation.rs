//! Relation data as reported by the host framework.
//!
//! A relation name (e.g. `website`) can have several instances, each with
//! its own relation id (e.g. `website:12`). Every instance carries the
//! key/value data published by each participating unit, the local unit
//! included.

use std::collections::BTreeMap;

use super::value::{Mapping, Value};

/// Synthetic key holding the relation id in a flattened record
pub const RELID_MARKER: &str = "__relid__";

/// Synthetic key holding the publishing unit in a flattened record
pub const UNIT_MARKER: &str = "__unit__";

/// Unit name -> published data, for a single relation instance
pub type RelationUnits = BTreeMap<String, Mapping>;

/// Relation id -> units, for every instance of one relation name
pub type RelationInstances = BTreeMap<String, RelationUnits>;

/// Relation name -> instances
pub type RelationTree = BTreeMap<String, RelationInstances>;

/// Convert the raw tree into a nested value for the vars file
pub fn tree_to_value(tree: &RelationTree) -> Value {
    let by_name = tree
        .iter()
        .map(|(name, instances)| {
            let by_rid = instances
                .iter()
                .map(|(rid, units)| {
                    let by_unit = units
                        .iter()
                        .map(|(unit, data)| (unit.clone(), Value::Mapping(data.clone())))
                        .collect::<Mapping>();
                    (rid.clone(), Value::Mapping(by_unit))
                })
                .collect::<Mapping>();
            (name.clone(), Value::Mapping(by_rid))
        })
        .collect::<Mapping>();

    Value::Mapping(by_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_to_value_keeps_nesting() {
        let mut data = Mapping::new();
        data.insert("hostname".to_string(), Value::from("10.0.0.5"));

        let mut units = RelationUnits::new();
        units.insert("db/0".to_string(), data);

        let mut instances = RelationInstances::new();
        instances.insert("db:3".to_string(), units);

        let mut tree = RelationTree::new();
        tree.insert("db".to_string(), instances);
        tree.insert("website".to_string(), RelationInstances::new());

        let value = tree_to_value(&tree);
        let root = value.as_mapping().unwrap();

        let hostname = root["db"].as_mapping().unwrap()["db:3"]
            .as_mapping()
            .unwrap()["db/0"]
            .as_mapping()
            .unwrap()["hostname"]
            .clone();
        assert_eq!(hostname, Value::from("10.0.0.5"));
        assert_eq!(root["website"], Value::Mapping(Mapping::new()));
    }
}
