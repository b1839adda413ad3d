use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tgi_codec::{encode_container, infer_metadata};
use tgi_model::ResourceKey;

const TUNING: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<I c=\"Buff\" i=\"buff\" m=\"buffs.buff\" n=\"creator:buff_Cli\" s=\"77\">\n</I>";

#[allow(deprecated)]
fn tgi(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tgi").expect("binary");
    cmd.current_dir(workdir).env_remove("TGI_CONFIG");
    cmd
}

#[test]
fn hash_prints_the_instance_id() {
    let dir = tempdir().expect("tempdir");

    tgi(dir.path())
        .args(["hash", "a"])
        .assert()
        .success()
        .stdout("0xAF63BD4C8601B7BE\n");

    tgi(dir.path())
        .args(["hash", "creator:career_Example", "--class", "Career"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0x00000000"));
}

#[test]
fn config_narrows_class_widths() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("tgi.config.json"),
        r#"{ "bitWidths": { "Buff": 8 } }"#,
    )
    .expect("config");

    tgi(dir.path())
        .args(["hash", "buff_Anything", "--class", "Buff"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0x00000000000000"));

    fs::write(dir.path().join("broken.json"), "{").expect("config");
    tgi(dir.path())
        .args(["--config", "broken.json", "hash", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn summarize_flags_corrupt_string_tables() {
    let dir = tempdir().expect("tempdir");
    let package = encode_container(
        &[(
            ResourceKey::new(0x2205_57DA, 0, 0x0000_0000_0000_0001),
            b"\x01\x02\x03 broken".to_vec(),
        )],
        true,
    )
    .expect("package");
    fs::write(dir.path().join("Broken.package"), package).expect("write");

    let output = tgi(dir.path())
        .args(["summarize", "Broken.package", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let index: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(index["groups"][0]["category"], "String Tables");
    assert_eq!(
        index["groups"][0]["entries"][0]["warnings"][0],
        "Not a valid string table (it may be corrupt)"
    );
}

#[test]
fn convert_asks_before_using_a_non_empty_destination() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("source");
    let dest = dir.path().join("project");
    fs::create_dir_all(&source).expect("source");
    fs::create_dir_all(&dest).expect("dest");
    fs::write(dest.join("existing.txt"), "keep").expect("existing");
    fs::write(
        source.join("6017E896-00000000-000000000000004D.xml"),
        TUNING,
    )
    .expect("tuning");

    // No terminal to answer the prompt, so the run is cancelled.
    tgi(dir.path())
        .args(["convert", "source", "project"])
        .assert()
        .failure();
    assert!(!dest.join("Loose Files").exists());

    let output = tgi(dir.path())
        .args(["convert", "source", "project", "--yes", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["sources"][0]["written"].as_array().map(Vec::len), Some(1));
    assert!(dest.join("Loose Files").join("Buff").join("buff_Cli.xml").is_file());
}

#[test]
fn rename_with_name_flag_runs_without_prompts() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("buff_Cli.xml"), TUNING).expect("write");

    let output = tgi(dir.path())
        .args(["rename", "buff_Cli.xml", "--name", "creator:buff_Renamed", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let outcome: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(outcome["mode"], "rename");
    assert_eq!(outcome["previous_name"], "creator:buff_Cli");
    assert_eq!(outcome["companion"]["status"], "none");
    assert!(!dir.path().join("buff_Cli.xml").exists());
    assert!(dir.path().join("buff_Renamed.xml").is_file());

    tgi(dir.path())
        .args(["clone", "buff_Renamed.xml", "--name", "creator:buff_Renamed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use current filename"));
}

#[test]
fn override_pins_a_key_field() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("buff_Cli.xml");
    fs::write(&path, TUNING).expect("write");

    tgi(dir.path())
        .args(["override", "buff_Cli.xml", "group", "0x80000000"])
        .assert()
        .success();

    let metadata = infer_metadata(&fs::read_to_string(&path).expect("read"));
    assert_eq!(metadata.explicit_group, Some(0x8000_0000));

    tgi(dir.path())
        .args(["override", "buff_Cli.xml", "type", "not-hex"])
        .assert()
        .failure();
}
