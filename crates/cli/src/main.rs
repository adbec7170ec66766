// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use tdmi_config::{MachineManifest, SeedPolicies};
use tdmi_core::cpu::Arm7Tdmi;
use tdmi_core::metrics::PerformanceMetrics;
use tdmi_core::snapshot::MachineSnapshot;
use tdmi_core::{DebugControl, Machine, SimulationError, UnimplementedPolicy};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const DEFAULT_MAX_STEPS: u64 = 20_000;
const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "ARM7TDMI / GBA core runner", long_about = None)]
struct Cli {
    /// Path to the BIOS image (seeds the system ROM)
    #[arg(short, long)]
    bios: Option<PathBuf>,

    /// Path to a cartridge ROM image
    #[arg(short, long)]
    rom: Option<PathBuf>,

    /// Path to the machine manifest (YAML)
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Maximum number of steps to execute (default: manifest limit, else 20000)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Breakpoint fetch address (repeatable)
    #[arg(long, value_parser = parse_u32_addr)]
    breakpoint: Vec<u32>,

    /// Write a machine snapshot (JSON) when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Retire unimplemented instructions as no-ops instead of faulting
    #[arg(long)]
    skip_unimplemented: bool,

    /// Enable instruction-level execution tracing
    #[arg(short, long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RunStop {
    MaxSteps,
    Breakpoint,
    MemoryViolation,
    Unimplemented,
    UndefinedInstruction,
    Fault,
}

impl From<&SimulationError> for RunStop {
    fn from(e: &SimulationError) -> Self {
        match e {
            SimulationError::MemoryViolation { .. } => RunStop::MemoryViolation,
            SimulationError::Unimplemented { .. } => RunStop::Unimplemented,
            SimulationError::UndefinedInstruction { .. } => RunStop::UndefinedInstruction,
            _ => RunStop::Fault,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RunConfig {
    bios: PathBuf,
    rom: Option<PathBuf>,
    system: Option<PathBuf>,
    max_steps: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunSnapshot {
    snapshot_schema_version: String,
    status: String,
    steps_executed: u64,
    instructions: u64,
    stop_reason: RunStop,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    bios_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rom_hash: Option<String>,
    machine: MachineSnapshot,
    config: RunConfig,
}

/// Resolved inputs of one run.
struct RunPlan {
    manifest: Option<MachineManifest>,
    bios: PathBuf,
    rom: Option<PathBuf>,
    max_steps: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    info!("Starting Tdmi");

    let plan = match plan_run(&cli) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let metrics = Arc::new(PerformanceMetrics::new());
    let mut machine = match build_machine(&cli, &plan, metrics.clone()) {
        Ok(machine) => machine,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    for addr in &cli.breakpoint {
        machine.add_breakpoint(*addr);
    }

    info!("Running for {} steps...", plan.max_steps);
    let (stop_reason, message, code) = match machine.run(Some(plan.max_steps)) {
        Ok(tdmi_core::StopReason::Breakpoint(pc)) => {
            info!(
                "Breakpoint hit at PC={:#x} (step={})",
                pc,
                machine.get_step_count()
            );
            (RunStop::Breakpoint, None, EXIT_PASS)
        }
        Ok(_) => (RunStop::MaxSteps, None, EXIT_PASS),
        Err(e) => {
            error!(
                "Simulation fault at step {}: {}",
                machine.get_step_count(),
                e
            );
            (RunStop::from(&e), Some(e.to_string()), EXIT_RUNTIME_ERROR)
        }
    };

    report_metrics(&machine, &metrics);

    if let Some(path) = &cli.snapshot {
        let snapshot = RunSnapshot {
            snapshot_schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            status: if code == EXIT_PASS { "ok" } else { "error" }.to_string(),
            steps_executed: machine.get_step_count(),
            instructions: metrics.get_instructions(),
            stop_reason,
            message,
            bios_hash: file_hash(&plan.bios),
            rom_hash: plan.rom.as_deref().map(file_hash),
            machine: machine.snapshot(),
            config: RunConfig {
                bios: plan.bios.clone(),
                rom: plan.rom.clone(),
                system: cli.system.clone(),
                max_steps: plan.max_steps,
            },
        };
        if let Err(e) = write_snapshot(path, &snapshot) {
            error!("{:#}", e);
        }
    }

    ExitCode::from(code)
}

/// Merges command-line arguments over the manifest. The command line wins.
fn plan_run(cli: &Cli) -> anyhow::Result<RunPlan> {
    let manifest = cli
        .system
        .as_deref()
        .map(MachineManifest::from_file)
        .transpose()?;

    let from_manifest = |rel: Option<&String>| -> Option<PathBuf> {
        let (manifest, path) = (manifest.as_ref()?, cli.system.as_deref()?);
        rel.map(|rel| manifest.resolve(path, rel))
    };

    let bios = cli
        .bios
        .clone()
        .or_else(|| from_manifest(manifest.as_ref().and_then(|m| m.bios.as_ref())))
        .context("Missing required --bios argument")?;
    let rom = cli
        .rom
        .clone()
        .or_else(|| from_manifest(manifest.as_ref().and_then(|m| m.cartridge.as_ref())));

    let max_steps = cli
        .max_steps
        .or_else(|| manifest.as_ref().and_then(|m| m.limits.max_steps))
        .unwrap_or(DEFAULT_MAX_STEPS);

    Ok(RunPlan {
        manifest,
        bios,
        rom,
        max_steps,
    })
}

fn build_machine(
    cli: &Cli,
    plan: &RunPlan,
    metrics: Arc<PerformanceMetrics>,
) -> anyhow::Result<Machine<Arm7Tdmi>> {
    let mut machine = tdmi_core::system::build_machine(plan.manifest.as_ref())?;
    if cli.skip_unimplemented {
        machine.config.unimplemented = UnimplementedPolicy::Skip;
    }
    machine.observers.push(metrics);

    let seed = plan
        .manifest
        .as_ref()
        .map(|m| m.seed.clone())
        .unwrap_or_else(SeedPolicies::default);

    info!("Loading BIOS: {:?}", plan.bios);
    let image = tdmi_loader::load_images(&plan.bios, plan.rom.as_deref(), &seed)?;
    machine
        .load_image(&image)
        .context("Failed to seed images into memory")?;

    info!("Images loaded, entry point {:#x}", image.entry_point);
    Ok(machine)
}

fn report_metrics(machine: &Machine<Arm7Tdmi>, metrics: &PerformanceMetrics) {
    info!("Simulation loop finished.");
    info!(
        "Final PC: {:#x}, mode {}, {} state",
        machine.get_pc(),
        machine.cpu.mode(),
        if machine.cpu.thumb() { "THUMB" } else { "ARM" }
    );
    info!("Total Steps: {}", machine.get_step_count());
    info!(
        "Instructions: {} executed, {} condition-failed, {} flushes",
        metrics.get_instructions(),
        metrics.get_condition_failed(),
        metrics.get_flushes()
    );
    info!("Average IPS: {:.2}", metrics.get_ips());
}

fn file_hash(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            format!("{:x}", hasher.finalize())
        }
        Err(e) => {
            error!("Failed to read {:?} for snapshot hash: {}", path, e);
            String::new()
        }
    }
}

fn write_snapshot(path: &Path, snapshot: &RunSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot parent dir {:?}", parent))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {:?}", path))?;
    serde_json::to_writer_pretty(file, snapshot)
        .with_context(|| format!("Failed to write snapshot {:?}", path))?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}
