// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod decoder;
pub mod memory;
pub mod metrics;
pub mod snapshot;
pub mod system;
pub mod video;

use std::collections::HashSet;
use std::sync::Arc;

pub use config::{SimulationConfig, UnimplementedPolicy};

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {addr:#x} ({len} bytes)")]
    MemoryViolation { addr: u32, len: usize },
    #[error("Unimplemented {class} instruction {opcode:#010x} at {pc:#x}")]
    Unimplemented {
        pc: u32,
        opcode: u32,
        class: &'static str,
    },
    #[error("Undefined instruction {opcode:#010x} at {pc:#x}")]
    UndefinedInstruction { pc: u32, opcode: u32 },
    #[error("Mode {mode} has no saved status register")]
    NoSavedStatus { mode: cpu::Mode },
    #[error("Invalid processor mode bits {value:#04x}")]
    InvalidMode { value: u32 },
    #[error("Seed image for {region} is {actual} bytes, region holds {expected}")]
    SeedLengthMismatch {
        region: String,
        expected: usize,
        actual: usize,
    },
    #[error("Region {name} overlaps region {other}")]
    RegionOverlap { name: String, other: String },
    #[error("No region starts at {0:#x}")]
    UnknownRegion(u32),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    /// A word was fetched from `pc`.
    fn on_step_start(&self, _pc: u32, _opcode: u32) {}
    /// The instruction at `pc` left the pipeline; `executed` is false when its condition failed.
    fn on_instruction(&self, _pc: u32, _opcode: u32, _executed: bool) {}
    /// The in-flight word was discarded because control flow moved to `target`.
    fn on_pipeline_flush(&self, _target: u32) {}
}

/// Trait representing a CPU architecture
pub trait Cpu: Send {
    fn reset(&mut self, bus: &mut dyn Bus) -> SimResult<()>;
    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
        config: &SimulationConfig,
    ) -> SimResult<()>;
    fn set_pc(&mut self, val: u32);
    fn get_pc(&self) -> u32;

    // Debug Access
    fn get_register(&self, id: u8) -> u32;
    fn set_register(&mut self, id: u8, val: u32);
    fn snapshot(&self) -> snapshot::CpuSnapshot;
    fn apply_snapshot(&mut self, snapshot: &snapshot::CpuSnapshot);
    fn get_register_names(&self) -> Vec<String>;
}

/// Trait representing the system bus
pub trait Bus {
    /// Little-endian read of `len` bytes starting at `addr`.
    fn lookup(&self, addr: u32, len: usize) -> SimResult<u32>;
    /// Stores the low `len * 8` bits of `value` at `addr`, least-significant byte first.
    fn write_bytes(&mut self, addr: u32, value: u32, len: usize) -> SimResult<()>;

    fn read_u8(&self, addr: u32) -> SimResult<u8> {
        Ok(self.lookup(addr, 1)? as u8)
    }

    fn read_u16(&self, addr: u32) -> SimResult<u16> {
        Ok(self.lookup(addr, 2)? as u16)
    }

    fn read_u32(&self, addr: u32) -> SimResult<u32> {
        self.lookup(addr, 4)
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> SimResult<()> {
        self.write_bytes(addr, value as u32, 1)
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> SimResult<()> {
        self.write_bytes(addr, value as u32, 2)
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> SimResult<()> {
        self.write_bytes(addr, value, 4)
    }
}

/// Trait for controlling the machine in debug mode
pub trait DebugControl {
    fn add_breakpoint(&mut self, addr: u32);
    fn remove_breakpoint(&mut self, addr: u32);
    fn clear_breakpoints(&mut self);

    /// Run until breakpoint or steps limit
    fn run(&mut self, max_steps: Option<u64>) -> SimResult<StopReason>;

    /// Advance the pipeline by one step
    fn step_single(&mut self) -> SimResult<StopReason>;

    fn read_core_reg(&self, id: u8) -> u32;
    /// Writes r0-r15 (`id` 0-15) or CPSR (`id` 16). A CPSR value with an
    /// undefined mode field is dropped with a warning and the status word is
    /// left unchanged; unknown ids are ignored.
    fn write_core_reg(&mut self, id: u8, val: u32);

    fn read_memory(&self, addr: u32, len: usize) -> SimResult<Vec<u8>>;
    fn write_memory(&mut self, addr: u32, data: &[u8]) -> SimResult<()>;

    fn get_pc(&self) -> u32;
    fn set_pc(&mut self, addr: u32);
    fn get_register_names(&self) -> Vec<String>;
    fn get_step_count(&self) -> u64;
    fn reset(&mut self) -> SimResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint(u32),
    StepDone,
    MaxStepsReached,
}

pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    pub config: SimulationConfig,

    // Debug state
    pub breakpoints: HashSet<u32>,
    pub total_steps: u64,
}

impl<C: Cpu> Machine<C> {
    pub fn new(cpu: C, bus: bus::SystemBus) -> Self {
        Self {
            cpu,
            bus,
            observers: Vec::new(),
            config: SimulationConfig::default(),
            breakpoints: HashSet::new(),
            total_steps: 0,
        }
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds every segment into the region starting at its address, then resets.
    pub fn load_image(&mut self, image: &memory::ProgramImage) -> SimResult<()> {
        for segment in &image.segments {
            self.bus
                .seed(segment.start_addr, &segment.data, segment.policy)?;
        }

        for observer in &self.observers {
            observer.on_simulation_start();
        }
        self.reset()?;

        if image.entry_point != 0 {
            self.cpu.set_pc(image.entry_point);
        }

        Ok(())
    }

    pub fn reset(&mut self) -> SimResult<()> {
        self.total_steps = 0;
        self.cpu.reset(&mut self.bus)
    }

    pub fn step(&mut self) -> SimResult<()> {
        self.total_steps += 1;
        self.cpu.step(&mut self.bus, &self.observers, &self.config)
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        snapshot::MachineSnapshot {
            cpu: self.cpu.snapshot(),
            steps: self.total_steps,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &snapshot::MachineSnapshot) {
        self.cpu.apply_snapshot(&snapshot.cpu);
        self.total_steps = snapshot.steps;
    }
}

impl<C: Cpu> DebugControl for Machine<C> {
    fn add_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove(&addr);
    }

    fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    fn run(&mut self, max_steps: Option<u64>) -> SimResult<StopReason> {
        let mut steps = 0;
        let result = loop {
            if let Some(max) = max_steps {
                if steps >= max {
                    break Ok(StopReason::MaxStepsReached);
                }
            }

            // Breakpoints match the fetch address, before the word enters the pipeline.
            // The address the run starts from is stepped over.
            let pc = self.cpu.get_pc();
            if steps > 0 && self.breakpoints.contains(&pc) {
                break Ok(StopReason::Breakpoint(pc));
            }

            if let Err(e) = self.step() {
                break Err(e);
            }
            steps += 1;
        };

        for observer in &self.observers {
            observer.on_simulation_stop();
        }
        result
    }

    fn step_single(&mut self) -> SimResult<StopReason> {
        self.step()?;
        Ok(StopReason::StepDone)
    }

    fn read_core_reg(&self, id: u8) -> u32 {
        self.cpu.get_register(id)
    }

    fn write_core_reg(&mut self, id: u8, val: u32) {
        self.cpu.set_register(id, val);
    }

    fn read_memory(&self, addr: u32, len: usize) -> SimResult<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        for i in 0..len {
            let byte = self.bus.read_u8(addr.wrapping_add(i as u32))?;
            data.push(byte);
        }
        Ok(data)
    }

    fn write_memory(&mut self, addr: u32, data: &[u8]) -> SimResult<()> {
        for (i, byte) in data.iter().enumerate() {
            self.bus.write_u8(addr.wrapping_add(i as u32), *byte)?;
        }
        Ok(())
    }

    fn get_pc(&self) -> u32 {
        self.cpu.get_pc()
    }

    fn set_pc(&mut self, addr: u32) {
        self.cpu.set_pc(addr);
    }

    fn get_register_names(&self) -> Vec<String> {
        self.cpu.get_register_names()
    }

    fn get_step_count(&self) -> u64 {
        self.total_steps
    }

    fn reset(&mut self) -> SimResult<()> {
        Machine::reset(self)
    }
}
