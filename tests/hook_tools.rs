//! Hook Tool Integration Tests
//!
//! Drives `JujuHookEnv` against shell stand-ins for the Juju hook tools.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ansible_charm::adapters::{AddressKind, HookEnvironment, JujuHookEnv};
use ansible_charm::core::merge::RELATIONS_KEY;
use ansible_charm::domain::{RELID_MARKER, UNIT_MARKER};
use ansible_charm::{HookSnapshot, MergeOptions, Value, VarsFile};
use tempfile::TempDir;

const METADATA: &str = r#"
name: svc
provides:
  website:
    interface: http
requires:
  db:
    interface: mysql
"#;

fn write_tool(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Charm dir + tool dir for a unit in a db relation hook
fn fake_hook_context(temp: &TempDir) -> JujuHookEnv {
    let charm_dir = temp.path().join("charm");
    let tool_dir = temp.path().join("bin");
    fs::create_dir_all(&charm_dir).unwrap();
    fs::create_dir_all(&tool_dir).unwrap();
    fs::write(charm_dir.join("metadata.yaml"), METADATA).unwrap();

    write_tool(
        &tool_dir,
        "config-get",
        r#"echo '{"private-address": "10.10.10.10", "port": 8080, "debug": true}'"#,
    );
    write_tool(
        &tool_dir,
        "unit-get",
        r#"case "$2" in
  private-address) echo '"10.0.3.2"' ;;
  public-address) echo '"123.123.123.123"' ;;
esac"#,
    );
    write_tool(
        &tool_dir,
        "relation-ids",
        r#"case "$2" in
  db) echo '["db:42"]' ;;
  *) echo '[]' ;;
esac"#,
    );
    write_tool(&tool_dir, "relation-list", r#"echo '["mysql/0"]'"#);
    write_tool(
        &tool_dir,
        "relation-get",
        r#"case "$*" in
  "--format=json -") echo '{"host": "mysql-0", "db-name": "app"}' ;;
  *"- svc/1") echo '{"private-address": "10.0.3.2"}' ;;
  *"- mysql/0") echo '{"private-address": "10.0.3.9", "db-name": "app"}' ;;
  *) echo 'null' ;;
esac"#,
    );

    JujuHookEnv {
        unit_name: Some("svc/1".to_string()),
        charm_dir: Some(charm_dir),
        relation: Some("db".to_string()),
        tool_dir: Some(tool_dir),
    }
}

#[test]
fn test_queries_through_hook_tools() {
    let temp = TempDir::new().unwrap();
    let env = fake_hook_context(&temp);

    assert_eq!(env.local_unit().unwrap(), "svc/1");
    assert_eq!(env.service_name().unwrap(), "svc");
    assert_eq!(env.unit_address(AddressKind::Private).unwrap(), "10.0.3.2");
    assert_eq!(env.unit_address(AddressKind::Public).unwrap(), "123.123.123.123");

    let config = env.config().unwrap();
    assert_eq!(config["port"], Value::Integer(8080));
    assert_eq!(config["debug"], Value::Bool(true));

    let relations = env.relations().unwrap();
    assert!(relations["website"].is_empty());
    let db = &relations["db"]["db:42"];
    assert_eq!(db.len(), 2);
    assert_eq!(db["mysql/0"]["db-name"], Value::from("app"));
    assert_eq!(db["svc/1"]["private-address"], Value::from("10.0.3.2"));
}

#[test]
fn test_snapshot_to_vars_file() {
    let temp = TempDir::new().unwrap();
    let env = fake_hook_context(&temp);
    let vars_path: PathBuf = temp.path().join("etc/ansible/host_vars/localhost");

    let snapshot = HookSnapshot::capture(&env).unwrap();
    let vars = VarsFile::new(&vars_path)
        .with_options(MergeOptions::ansible())
        .materialize(&snapshot)
        .unwrap();

    assert_eq!(vars["private_address"], Value::from("10.10.10.10"));
    assert_eq!(vars["db__host"], Value::from("mysql-0"));
    assert_eq!(vars["db__db_name"], Value::from("app"));
    assert_eq!(vars["charm_dir"], Value::from(temp.path().join("charm").display().to_string()));

    let db_records = vars[RELATIONS_KEY].as_mapping().unwrap()["db"]
        .as_sequence()
        .unwrap();
    assert_eq!(db_records.len(), 1);
    let record = db_records[0].as_mapping().unwrap();
    assert_eq!(record[RELID_MARKER], Value::from("db:42"));
    assert_eq!(record[UNIT_MARKER], Value::from("mysql/0"));
    assert_eq!(record["db_name"], Value::from("app"));
}

#[test]
fn test_failing_tool_aborts_capture() {
    let temp = TempDir::new().unwrap();
    let env = fake_hook_context(&temp);
    let tool_dir = env.tool_dir.clone().unwrap();
    write_tool(&tool_dir, "config-get", "echo 'no config' >&2; exit 2");

    let err = HookSnapshot::capture(&env).unwrap_err();

    assert!(err.to_string().contains("config-get"));
}

#[test]
fn test_missing_active_relation_data_is_empty() {
    let temp = TempDir::new().unwrap();
    let env = fake_hook_context(&temp);
    let tool_dir = env.tool_dir.clone().unwrap();
    write_tool(&tool_dir, "relation-get", "exit 1");

    assert!(env.relation_get().unwrap().is_empty());
}
