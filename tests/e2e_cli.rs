//! CLI end-to-end tests
//!
//! Tests for the fluxforge command-line interface.

use assert_cmd::prelude::*;
use fluxforge_container::{ContainerWriter, EntryRecord, MetaRecord, Row, StreamFlags};
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the fluxforge binary
#[allow(deprecated)]
fn fluxforge_cmd() -> Command {
    Command::cargo_bin("fluxforge").unwrap()
}

fn write_fixture(path: &Path) {
    let mut writer = ContainerWriter::create(path, StreamFlags::default()).unwrap();
    for (key, pdg, energy, wgt) in [
        (1u32, 14, 2.0, 1.0),
        (1, -14, 5.0, 0.5),
        (2, 12, 3.0, 2.0),
    ] {
        writer
            .append_row(&Row {
                entry: EntryRecord {
                    wgt,
                    px: 0.6 * energy,
                    pz: 0.8 * energy,
                    energy,
                    pdg,
                    metakey: key,
                    ..Default::default()
                },
                aux: None,
                beam: None,
            })
            .unwrap();
    }
    for key in [1u32, 2] {
        writer
            .append_meta(&MetaRecord {
                metakey: key,
                pots: 1.0e16,
                input_files: vec!["beamsim.orig".to_string()],
                ..Default::default()
            })
            .unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = fluxforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = fluxforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fluxforge"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = fluxforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fluxforge"));
}

#[test]
fn test_cli_warp_help() {
    let mut cmd = fluxforge_cmd();
    cmd.args(["warp", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rewrite a flux container"));
}

#[test]
fn test_cli_warp_nonexistent_input() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("out.sflx");

    let mut cmd = fluxforge_cmd();
    cmd.arg("warp")
        .arg(&output)
        .arg("/nonexistent/path/flux.sflx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_warp_rejects_bad_energy_range() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("in.sflx");
    let output = temp.path().join("out.sflx");
    write_fixture(&input);

    let mut cmd = fluxforge_cmd();
    cmd.arg("warp")
        .arg(&output)
        .arg(&input)
        .args(["--e-min", "0", "--e-max", "20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("energy range"));
}

#[test]
fn test_cli_warp_then_dump_and_meta() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("in.sflx");
    let output = temp.path().join("out.sflx");
    write_fixture(&input);

    let mut cmd = fluxforge_cmd();
    cmd.arg("warp")
        .arg(&output)
        .arg(&input)
        .arg("--no-warp")
        .assert()
        .success()
        .stdout(predicate::str::contains("NO ACTUAL WARP APPLIED"))
        .stdout(predicate::str::contains("Rewrote 3 entries in 2 segments"));

    let mut cmd = fluxforge_cmd();
    cmd.arg("dump")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("nu_mu"))
        .stdout(predicate::str::contains("Dumped 3 of 3 entries"));

    let mut cmd = fluxforge_cmd();
    cmd.arg("meta")
        .arg(&output)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("NO ACTUAL WARP APPLIED"));
}

#[test]
fn test_cli_dump_limit() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("in.sflx");
    write_fixture(&input);

    let mut cmd = fluxforge_cmd();
    cmd.arg("dump")
        .arg(&input)
        .args(["-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dumped 1 of 3 entries"));
}

#[test]
fn test_cli_meta_nonexistent_file() {
    let mut cmd = fluxforge_cmd();
    cmd.args(["meta", "/nonexistent/path/flux.sflx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist"));
}
