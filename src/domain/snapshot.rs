//! Everything the merger needs to know about the current hook invocation.
//!
//! The snapshot is captured once from the host environment and then passed
//! around by reference, so nothing downstream reads process state.

use serde::{Deserialize, Serialize};

use super::relation::RelationTree;
use super::value::Mapping;

/// Identity of the local unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Charm directory (`CHARM_DIR`), empty when unknown
    pub charm_dir: String,

    /// Local unit name, e.g. `svc/1`
    pub local_unit: String,

    /// Service (application) name, e.g. `svc`
    pub service_name: String,

    /// Private network address of the unit
    pub private_address: String,

    /// Public network address of the unit
    pub public_address: String,
}

impl Identity {
    /// Identity for a unit name, deriving the service name from it
    pub fn for_unit(local_unit: impl Into<String>) -> Self {
        let local_unit = local_unit.into();
        let service_name = service_from_unit(&local_unit).to_string();
        Self {
            local_unit,
            service_name,
            ..Default::default()
        }
    }

    pub fn with_addresses(
        mut self,
        private_address: impl Into<String>,
        public_address: impl Into<String>,
    ) -> Self {
        self.private_address = private_address.into();
        self.public_address = public_address.into();
        self
    }

    pub fn with_charm_dir(mut self, charm_dir: impl Into<String>) -> Self {
        self.charm_dir = charm_dir.into();
        self
    }
}

/// `svc/1` -> `svc`
pub fn service_from_unit(unit: &str) -> &str {
    unit.split('/').next().unwrap_or(unit)
}

/// State of the host framework for one hook invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookSnapshot {
    /// Current charm configuration
    pub config: Mapping,

    /// Local unit identity
    pub identity: Identity,

    /// Relation name when running inside a relation hook
    pub relation_type: Option<String>,

    /// Data published by the remote unit of the active relation
    pub relation_data: Mapping,

    /// Every relation the charm declares, with all instances
    pub relations: RelationTree,
}

impl HookSnapshot {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }

    /// Whether the snapshot was taken inside a relation hook
    pub fn in_relation_hook(&self) -> bool {
        self.relation_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_derives_service_name() {
        let identity = Identity::for_unit("wordpress/3").with_addresses("10.0.3.2", "1.2.3.4");

        assert_eq!(identity.service_name, "wordpress");
        assert_eq!(identity.local_unit, "wordpress/3");
        assert_eq!(identity.private_address, "10.0.3.2");
        assert_eq!(identity.public_address, "1.2.3.4");
        assert_eq!(identity.charm_dir, "");
    }

    #[test]
    fn test_service_from_unit_without_slash() {
        assert_eq!(service_from_unit("standalone"), "standalone");
    }
}
