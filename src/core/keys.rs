//! Key normalization.
//!
//! Ansible variable names may not contain hyphens, while Juju config and
//! relation keys routinely do (`private-address`). Keys are rewritten with
//! the hyphen replaced by an underscore; values are left alone.

use crate::domain::Mapping;

/// Character Ansible rejects in variable names
pub const RESERVED: char = '-';

/// Replacement for [`RESERVED`]
pub const SUBSTITUTE: char = '_';

/// Rewrite a single key
pub fn normalize_key(key: &str) -> String {
    key.replace(RESERVED, &SUBSTITUTE.to_string())
}

/// Copy a mapping with every top-level key normalized
///
/// Nested mappings are not touched. When two keys normalize to the same
/// name (`a-b` and `a_b`), the one that sorts last wins.
pub fn without_hyphens(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .map(|(key, value)| (normalize_key(key), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("private-address"), "private_address");
        assert_eq!(normalize_key("wsgi-file:relation-key2"), "wsgi_file:relation_key2");
        assert_eq!(normalize_key("already_safe"), "already_safe");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_without_hyphens_leaves_input_and_values() {
        let mut nested = Mapping::new();
        nested.insert("inner-key".to_string(), Value::from("x"));

        let mut input = Mapping::new();
        input.insert("a-b".to_string(), Value::from("has-hyphen"));
        input.insert("nested-map".to_string(), Value::Mapping(nested.clone()));

        let output = without_hyphens(&input);

        assert!(input.contains_key("a-b"));
        assert!(!output.contains_key("a-b"));
        assert_eq!(output["a_b"], Value::from("has-hyphen"));
        // only the top level is rewritten
        assert_eq!(output["nested_map"], Value::Mapping(nested));
    }
}
