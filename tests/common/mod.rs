use assert_cmd::{Command, cargo::cargo_bin_cmd};
use serde_json::Value;
use std::path::Path;

#[allow(dead_code)]
pub const DB_FILENAME: &str = "smart_checksums_db.json";

pub fn smart_checksum_cmd(target: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("smart-checksum");
    cmd.arg(target);
    cmd
}

/// Runs a baseline calculation and asserts it succeeds.
#[allow(dead_code)]
pub fn calculate(target: &Path) {
    smart_checksum_cmd(target).assert().success();
}

// Not every integration test crate inspects the database.
#[allow(dead_code)]
pub fn read_db(target: &Path) -> Value {
    let content = std::fs::read_to_string(target.join(DB_FILENAME)).expect("database missing");
    serde_json::from_str(&content).expect("database is not valid JSON")
}
