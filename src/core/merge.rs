//! State merging.
//!
//! Builds the layer written on top of the previously persisted vars:
//! charm config, unit identity, and the relation views. Layers are applied
//! in order, so a later layer wins on key collision:
//!
//! 1. config (hyphens rewritten unless allowed)
//! 2. identity fields
//! 3. `current_relation`
//! 4. deprecated namespaced relation entries
//! 5. `relations_full`
//! 6. `relations`
//!
//! Identity is applied after config, so a config option named `local_unit`
//! or `service_name` never masks the unit identity.

use crate::domain::relation::tree_to_value;
use crate::domain::{HookSnapshot, Mapping, Value};

use super::flatten::{flatten_relations, FlattenInput, RelationViews};
use super::keys::without_hyphens;

pub const CHARM_DIR_KEY: &str = "charm_dir";
pub const LOCAL_UNIT_KEY: &str = "local_unit";
pub const SERVICE_NAME_KEY: &str = "service_name";
pub const PRIVATE_ADDRESS_KEY: &str = "unit_private_address";
pub const PUBLIC_ADDRESS_KEY: &str = "unit_public_address";
pub const CURRENT_RELATION_KEY: &str = "current_relation";
pub const RELATIONS_FULL_KEY: &str = "relations_full";
pub const RELATIONS_KEY: &str = "relations";

/// Options controlling the merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Separator between relation name and key in namespaced entries
    pub namespace_separator: String,

    /// Keep hyphens in config keys
    pub allow_hyphens_in_keys: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            namespace_separator: ":".to_string(),
            allow_hyphens_in_keys: true,
        }
    }
}

impl MergeOptions {
    /// Options suited to Ansible variable names
    pub fn ansible() -> Self {
        Self {
            namespace_separator: "__".to_string(),
            allow_hyphens_in_keys: false,
        }
    }
}

/// Build the layer for this invocation
pub fn merged_layer(snapshot: &HookSnapshot, options: &MergeOptions) -> Mapping {
    let mut layer = Mapping::new();

    layer.extend(config_layer(snapshot, options));

    let identity = &snapshot.identity;
    let identity_fields = [
        (CHARM_DIR_KEY, &identity.charm_dir),
        (LOCAL_UNIT_KEY, &identity.local_unit),
        (SERVICE_NAME_KEY, &identity.service_name),
        (PRIVATE_ADDRESS_KEY, &identity.private_address),
        (PUBLIC_ADDRESS_KEY, &identity.public_address),
    ];
    for (key, value) in identity_fields {
        layer.insert(key.to_string(), Value::from(value.as_str()));
    }

    let views = flatten_relations(FlattenInput {
        relation_type: snapshot.relation_type.as_deref(),
        relation_data: &snapshot.relation_data,
        relations: &snapshot.relations,
        local_unit: &identity.local_unit,
        separator: &options.namespace_separator,
    });
    layer.extend(relation_layer(views));

    layer
}

/// Apply a layer over existing state, replacing values key by key
///
/// Keys absent from the layer are kept as they were.
pub fn merge_into(existing: &mut Mapping, layer: Mapping) {
    existing.extend(layer);
}

fn config_layer(snapshot: &HookSnapshot, options: &MergeOptions) -> Mapping {
    if options.allow_hyphens_in_keys {
        snapshot.config.clone()
    } else {
        without_hyphens(&snapshot.config)
    }
}

fn relation_layer(views: RelationViews) -> Mapping {
    let mut layer = Mapping::new();

    layer.insert(CURRENT_RELATION_KEY.to_string(), Value::Mapping(views.current));
    layer.extend(views.namespaced);
    layer.insert(RELATIONS_FULL_KEY.to_string(), tree_to_value(&views.full));

    let records = views
        .records
        .into_iter()
        .map(|(name, records)| {
            let records = records.into_iter().map(Value::Mapping).collect::<Vec<_>>();
            (name, Value::Sequence(records))
        })
        .collect::<Mapping>();
    layer.insert(RELATIONS_KEY.to_string(), Value::Mapping(records));

    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;

    fn snapshot() -> HookSnapshot {
        let mut snapshot = HookSnapshot::new(
            Identity::for_unit("svc/1").with_addresses("10.0.3.2", "123.123.123.123"),
        );
        snapshot
            .config
            .insert("private-address".to_string(), Value::from("10.10.10.10"));
        snapshot
    }

    #[test]
    fn test_hyphens_allowed_by_default() {
        let layer = merged_layer(&snapshot(), &MergeOptions::default());

        assert_eq!(layer["private-address"], Value::from("10.10.10.10"));
        assert!(!layer.contains_key("private_address"));
    }

    #[test]
    fn test_ansible_options_rewrite_config_keys() {
        let layer = merged_layer(&snapshot(), &MergeOptions::ansible());

        assert_eq!(layer["private_address"], Value::from("10.10.10.10"));
        assert!(!layer.contains_key("private-address"));
    }

    #[test]
    fn test_identity_fields_present() {
        let layer = merged_layer(&snapshot(), &MergeOptions::default());

        assert_eq!(layer[LOCAL_UNIT_KEY], Value::from("svc/1"));
        assert_eq!(layer[SERVICE_NAME_KEY], Value::from("svc"));
        assert_eq!(layer[CHARM_DIR_KEY], Value::from(""));
        assert_eq!(layer[PRIVATE_ADDRESS_KEY], Value::from("10.0.3.2"));
        assert_eq!(layer[PUBLIC_ADDRESS_KEY], Value::from("123.123.123.123"));
    }

    #[test]
    fn test_identity_wins_over_config() {
        let mut snapshot = snapshot();
        snapshot
            .config
            .insert(LOCAL_UNIT_KEY.to_string(), Value::from("bogus/9"));

        let layer = merged_layer(&snapshot, &MergeOptions::default());

        assert_eq!(layer[LOCAL_UNIT_KEY], Value::from("svc/1"));
    }

    #[test]
    fn test_merge_into_keeps_unrelated_keys() {
        let mut existing = Mapping::new();
        existing.insert("old_key".to_string(), Value::from("kept"));
        existing.insert(LOCAL_UNIT_KEY.to_string(), Value::from("svc/0"));

        let layer = merged_layer(&snapshot(), &MergeOptions::default());
        merge_into(&mut existing, layer);

        assert_eq!(existing["old_key"], Value::from("kept"));
        assert_eq!(existing[LOCAL_UNIT_KEY], Value::from("svc/1"));
    }

    #[test]
    fn test_current_relation_reset_outside_relation_hook() {
        let mut existing = Mapping::new();
        let mut stale = Mapping::new();
        stale.insert("k".to_string(), Value::from("v"));
        existing.insert(CURRENT_RELATION_KEY.to_string(), Value::Mapping(stale));

        merge_into(&mut existing, merged_layer(&snapshot(), &MergeOptions::default()));

        assert_eq!(existing[CURRENT_RELATION_KEY], Value::Mapping(Mapping::new()));
    }
}
