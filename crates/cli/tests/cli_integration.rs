// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};

const BIOS_LEN: usize = 16 * 1024;

fn get_tdmi_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tdmi"))
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tdmi-cli-{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_bios(dir: &std::path::Path, words: &[u32]) -> PathBuf {
    let mut data = vec![0u8; BIOS_LEN];
    for (i, w) in words.iter().enumerate() {
        data[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }
    let path = dir.join("bios.bin");
    std::fs::write(&path, data).unwrap();
    path
}

fn read_snapshot(path: &std::path::Path, output: &Output) -> Value {
    let content = std::fs::read_to_string(path).unwrap_or_else(|_| {
        panic!(
            "No snapshot written. Exit: {:?}\nStdout: {}\nStderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    });
    serde_json::from_str(&content).expect("Snapshot should be valid JSON")
}

#[test]
fn test_missing_bios_is_config_error() {
    let output = Command::new(get_tdmi_bin())
        .arg("--max-steps")
        .arg("10")
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_short_bios_is_config_error() {
    let dir = temp_dir("short-bios");
    let bios = dir.join("bios.bin");
    std::fs::write(&bios, [0u8; 64]).unwrap();

    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg(&bios)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_writes_snapshot() {
    let dir = temp_dir("snapshot");
    let bios = write_bios(
        &dir,
        &[
            0xE3A0_0001, // MOV r0, #1
            0xEAFF_FFFE, // B .
        ],
    );
    let snapshot = dir.join("out").join("snapshot.json");

    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg(&bios)
        .arg("--max-steps")
        .arg("10")
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(0));

    let val = read_snapshot(&snapshot, &output);
    assert_eq!(val["snapshot_schema_version"], "1.0");
    assert_eq!(val["status"], "ok");
    assert_eq!(val["stop_reason"], "max_steps");
    assert_eq!(val["steps_executed"], 10);
    assert_eq!(val["config"]["max_steps"], 10);
    assert_eq!(val["bios_hash"].as_str().unwrap().len(), 64);
    assert!(val.get("rom_hash").is_none());
    assert_eq!(val["machine"]["cpu"]["type"], "arm7_tdmi");
    assert_eq!(val["machine"]["cpu"]["registers"][0], 1);
}

#[test]
fn test_unimplemented_instruction_exit_code() {
    let dir = temp_dir("unimplemented");
    let bios = write_bios(&dir, &[0xE8BD_000F]); // LDMIA sp!, {r0-r3}
    let snapshot = dir.join("snapshot.json");

    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg(&bios)
        .arg("--max-steps")
        .arg("10")
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(3));

    let val = read_snapshot(&snapshot, &output);
    assert_eq!(val["status"], "error");
    assert_eq!(val["stop_reason"], "unimplemented");
    assert!(val["message"].as_str().unwrap().contains("0xe8bd000f"));

    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg(&bios)
        .arg("--max-steps")
        .arg("10")
        .arg("--skip-unimplemented")
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_breakpoint_stops_run() {
    let dir = temp_dir("breakpoint");
    let bios = write_bios(
        &dir,
        &[
            0xE3A0_0001, // MOV r0, #1
            0xE3A0_1002, // MOV r1, #2
            0xE3A0_2003, // MOV r2, #3
            0xEAFF_FFFE, // B .
        ],
    );
    let snapshot = dir.join("snapshot.json");

    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg(&bios)
        .arg("--breakpoint")
        .arg("0x8")
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(0));

    let val = read_snapshot(&snapshot, &output);
    assert_eq!(val["stop_reason"], "breakpoint");
    assert_eq!(val["steps_executed"], 2);
    assert_eq!(val["machine"]["cpu"]["registers"][15], 8);
}

#[test]
fn test_invalid_breakpoint_address_rejected() {
    let output = Command::new(get_tdmi_bin())
        .arg("--bios")
        .arg("bios.bin")
        .arg("--breakpoint")
        .arg("0xZZ")
        .output()
        .expect("Failed to run tdmi");
    assert!(!output.status.success());
}

#[test]
fn test_manifest_supplies_bios_and_limits() {
    let dir = temp_dir("manifest");
    write_bios(
        &dir,
        &[
            0xE3A0_0001, // MOV r0, #1
            0xE280_0001, // ADD r0, r0, #1
            0xE280_0001, // ADD r0, r0, #1
            0xEAFF_FFFE, // B .
        ],
    );
    let manifest = dir.join("machine.yaml");
    std::fs::write(
        &manifest,
        "schema_version: \"1.0\"\nname: \"test-gba\"\nbios: \"bios.bin\"\nlimits:\n  max_steps: 3\n",
    )
    .unwrap();
    let snapshot = dir.join("snapshot.json");

    let output = Command::new(get_tdmi_bin())
        .arg("--system")
        .arg(&manifest)
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(0));

    let val = read_snapshot(&snapshot, &output);
    assert_eq!(val["steps_executed"], 3);
    assert_eq!(val["config"]["max_steps"], 3);
    // Two instructions have left the pipeline after three steps
    assert_eq!(val["machine"]["cpu"]["registers"][0], 2);
}

#[test]
fn test_invalid_manifest_is_config_error() {
    let dir = temp_dir("bad-manifest");
    let manifest = dir.join("machine.yaml");
    std::fs::write(&manifest, "schema_version: \"2.0\"\nname: \"future\"\n").unwrap();

    let output = Command::new(get_tdmi_bin())
        .arg("--system")
        .arg(&manifest)
        .output()
        .expect("Failed to run tdmi");
    assert_eq!(output.status.code(), Some(2));
}
