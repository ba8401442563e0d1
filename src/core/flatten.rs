//! Relation flattening.
//!
//! The relation tree (name -> id -> unit -> data) is awkward to use from
//! playbooks and templates, so it is reshaped into views that are easier
//! to consume:
//!
//! - `current`: data of the active relation, empty outside relation hooks
//! - `namespaced`: active relation data as `{relation}{sep}{key}` top-level
//!   entries (deprecated, kept for existing playbooks)
//! - `full`: the untouched tree
//! - `records`: per relation name, one record per remote unit carrying the
//!   relation id and unit name alongside the unit's data

use std::collections::BTreeMap;

use crate::domain::{Mapping, RelationTree, Value, RELID_MARKER, UNIT_MARKER};

use super::keys::{normalize_key, without_hyphens};

/// All relation-derived views for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationViews {
    /// Data of the active relation
    pub current: Mapping,

    /// Deprecated namespaced entries for the active relation
    pub namespaced: Mapping,

    /// The full relation tree
    pub full: RelationTree,

    /// Relation name -> records of every remote unit
    pub records: BTreeMap<String, Vec<Mapping>>,
}

/// Inputs to [`flatten_relations`]
#[derive(Debug, Clone, Copy)]
pub struct FlattenInput<'a> {
    /// Active relation name, if any
    pub relation_type: Option<&'a str>,

    /// Data of the active relation
    pub relation_data: &'a Mapping,

    /// Every known relation
    pub relations: &'a RelationTree,

    /// Local unit, excluded from the records view
    pub local_unit: &'a str,

    /// Separator between relation name and key in namespaced entries
    pub separator: &'a str,
}

/// Derive every relation view
pub fn flatten_relations(input: FlattenInput<'_>) -> RelationViews {
    let (current, namespaced) = match input.relation_type {
        Some(relation_type) => (
            input.relation_data.clone(),
            namespaced_entries(relation_type, input.relation_data, input.separator),
        ),
        None => (Mapping::new(), Mapping::new()),
    };

    RelationViews {
        current,
        namespaced,
        full: input.relations.clone(),
        records: relation_records(input.relations, input.local_unit),
    }
}

/// `{relation}{sep}{key}` entries, hyphens rewritten across the whole key
pub fn namespaced_entries(relation_type: &str, data: &Mapping, separator: &str) -> Mapping {
    data.iter()
        .map(|(key, value)| {
            let namespaced = format!("{}{}{}", relation_type, separator, key);
            (normalize_key(&namespaced), value.clone())
        })
        .collect()
}

/// One record per remote unit for every relation name
///
/// Relation names with no instances still get an (empty) entry. The local
/// unit's own data never shows up.
pub fn relation_records(tree: &RelationTree, local_unit: &str) -> BTreeMap<String, Vec<Mapping>> {
    tree.iter()
        .map(|(name, instances)| {
            let records = instances
                .iter()
                .flat_map(|(rid, units)| {
                    units
                        .iter()
                        .filter(|(unit, _)| unit.as_str() != local_unit)
                        .map(move |(unit, data)| unit_record(rid, unit, data))
                })
                .collect::<Vec<_>>();
            (name.clone(), records)
        })
        .collect()
}

fn unit_record(rid: &str, unit: &str, data: &Mapping) -> Mapping {
    let mut record = Mapping::new();
    record.insert(RELID_MARKER.to_string(), Value::from(rid));
    record.insert(UNIT_MARKER.to_string(), Value::from(unit));
    // published data wins over the markers on collision
    record.extend(without_hyphens(data));
    record
}
