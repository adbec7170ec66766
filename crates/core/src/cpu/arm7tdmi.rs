// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::alu::check_condition;
use super::psr::{current_status_write_mask, saved_status_write_mask, Flag, Mode, Psr, Sctlr};
use super::{LR, PC, SP};
use crate::decoder::decode;
use crate::snapshot::{Arm7TdmiSnapshot, CpuSnapshot};
use crate::{Bus, Cpu, SimResult, SimulationConfig, SimulationError, SimulationObserver};

/// Reset status: supervisor mode, IRQ and FIQ masked, ARM state.
pub const RESET_CPSR: u32 = 0xD3;

/// ARM7TDMI core with a two-stage fetch/execute pipeline.
///
/// `regs[15]` always holds the next fetch address, so an executing
/// instruction reads r15 as its own address plus two words.
#[derive(Debug, Clone)]
pub struct Arm7Tdmi {
    pub(super) regs: [u32; 16],
    pub(super) cpsr: Psr,
    pub(super) spsr: [u32; 7],
    pub sctlr: Sctlr,
    /// Word fetched by the previous step, executed by the next one.
    pipeline: Option<u32>,
    /// Set by every write that redirects control flow during execute.
    pub(super) pc_written: bool,
}

impl Default for Arm7Tdmi {
    fn default() -> Self {
        Self::new()
    }
}

impl Arm7Tdmi {
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            cpsr: Psr::from_bits_retain(RESET_CPSR),
            spsr: [0; 7],
            sctlr: Sctlr::default(),
            pipeline: None,
            pc_written: false,
        }
    }

    pub fn reg(&self, n: u8) -> u32 {
        self.regs[(n & 0xF) as usize]
    }

    /// Raw register write. PC writes are aligned to the current word size.
    pub fn set_reg(&mut self, n: u8, value: u32) {
        if n & 0xF == PC {
            self.regs[15] = value & self.pc_mask();
        } else {
            self.regs[(n & 0xF) as usize] = value;
        }
    }

    pub fn pc(&self) -> u32 {
        self.regs[PC as usize]
    }

    pub fn lr(&self) -> u32 {
        self.regs[LR as usize]
    }

    pub fn sp(&self) -> u32 {
        self.regs[SP as usize]
    }

    pub fn set_lr(&mut self, value: u32) {
        self.regs[LR as usize] = value;
    }

    pub fn set_sp(&mut self, value: u32) {
        self.regs[SP as usize] = value;
    }

    pub fn cpsr(&self) -> u32 {
        self.cpsr.bits()
    }

    /// Full status write, as a debugger would do it. The mode field must be valid.
    pub fn set_cpsr(&mut self, value: u32) -> SimResult<()> {
        Mode::try_from(value)?;
        let thumb = self.thumb();
        self.cpsr = Psr::from_bits_retain(value);
        if self.thumb() != thumb {
            self.pipeline = None;
        }
        Ok(())
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.cpsr.contains(flag.bit())
    }

    /// Sets a named status bit. Writing T switches the instruction set and empties the pipeline.
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let changed = self.flag(flag) != value;
        self.cpsr.set(flag.bit(), value);
        if flag == Flag::T && changed {
            self.pipeline = None;
            self.regs[15] &= self.pc_mask();
        }
    }

    /// Mode bits are validated on every status write.
    pub fn mode(&self) -> Mode {
        Mode::try_from(self.cpsr.bits()).unwrap_or(Mode::Usr)
    }

    pub fn thumb(&self) -> bool {
        self.cpsr.contains(Psr::T)
    }

    pub fn word_size(&self) -> u32 {
        if self.thumb() {
            2
        } else {
            4
        }
    }

    pub(super) fn pc_mask(&self) -> u32 {
        if self.thumb() {
            !1
        } else {
            !3
        }
    }

    /// Saved status of the current mode.
    pub fn spsr(&self) -> SimResult<u32> {
        let mode = self.mode();
        mode.spsr_index()
            .map(|i| self.spsr[i])
            .ok_or(SimulationError::NoSavedStatus { mode })
    }

    pub fn spsr_of(&self, mode: Mode) -> Option<u32> {
        mode.spsr_index().map(|i| self.spsr[i])
    }

    /// Privilege-gated partial write of the live status word (MSR, exception return).
    pub fn write_current_status(&mut self, value: u32, mask: u8, is_return: bool) -> SimResult<()> {
        let copy = current_status_write_mask(
            value,
            mask,
            is_return,
            self.mode().is_privileged(),
            self.sctlr.contains(Sctlr::NMFI),
        );
        let next = (self.cpsr.bits() & !copy) | (value & copy);
        Mode::try_from(next)?;
        self.cpsr = Psr::from_bits_retain(next);
        Ok(())
    }

    /// Lane-masked write of the current mode's saved status.
    pub fn write_saved_status(&mut self, value: u32, mask: u8) -> SimResult<()> {
        let mode = self.mode();
        let slot = mode
            .spsr_index()
            .ok_or(SimulationError::NoSavedStatus { mode })?;
        let copy = saved_status_write_mask(mask);
        self.spsr[slot] = (self.spsr[slot] & !copy) | (value & copy);
        Ok(())
    }

    /// IT execution state, packed as IT[7:2] = CPSR[15:10], IT[1:0] = CPSR[26:25].
    pub fn it_state(&self) -> u8 {
        let bits = self.cpsr.bits();
        ((((bits >> 10) & 0x3F) << 2) | ((bits >> 25) & 0x3)) as u8
    }

    pub fn set_it_state(&mut self, it: u8) {
        let it = it as u32;
        let bits = (self.cpsr.bits() & !0x0600_FC00) | ((it >> 2) << 10) | ((it & 0x3) << 25);
        self.cpsr = Psr::from_bits_retain(bits);
    }

    pub fn in_it_block(&self) -> bool {
        self.it_state() & 0xF != 0
    }

    pub fn it_advance(&mut self) {
        let it = self.it_state();
        if it & 0x7 == 0 {
            self.set_it_state(0);
        } else {
            self.set_it_state((it & 0xE0) | ((it << 1) & 0x1F));
        }
    }

    /// Word waiting in the pipeline, if any.
    pub fn pending(&self) -> Option<u32> {
        self.pipeline
    }

    pub fn flush_pipeline(&mut self) {
        self.pipeline = None;
    }

    fn fetch(&self, bus: &dyn Bus, addr: u32) -> SimResult<u32> {
        if self.thumb() {
            bus.read_u16(addr).map(u32::from)
        } else {
            bus.read_u32(addr)
        }
    }

    /// Decodes, condition-checks and executes one word. Returns whether it executed.
    fn execute_word(
        &mut self,
        word: u32,
        addr: u32,
        bus: &mut dyn Bus,
        config: &SimulationConfig,
    ) -> SimResult<bool> {
        let thumb = self.thumb();
        let decoded = decode(word, thumb);
        let in_it = thumb && self.in_it_block();
        let cond = if in_it {
            self.it_state() >> 4
        } else {
            decoded.cond
        };

        let pass = check_condition(cond, self.cpsr);
        if pass {
            #[cfg(debug_assertions)]
            tracing::debug!(
                "PC={:#x}, Opcode={:#010x}, Instr={:?}",
                addr,
                word,
                decoded.instruction
            );
            self.execute(&decoded, addr, bus, config)?;
        }

        if in_it && !self.pc_written {
            self.it_advance();
        }
        Ok(pass)
    }
}

impl Cpu for Arm7Tdmi {
    fn reset(&mut self, _bus: &mut dyn Bus) -> SimResult<()> {
        *self = Self::new();
        Ok(())
    }

    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
        config: &SimulationConfig,
    ) -> SimResult<()> {
        let ws = self.word_size();
        let fetch_addr = self.regs[15];
        let fetched = self.fetch(bus, fetch_addr);
        self.regs[15] = fetch_addr.wrapping_add(ws);

        if let Ok(word) = fetched {
            for observer in observers {
                observer.on_step_start(fetch_addr, word);
            }
        }

        if let Some(word) = self.pipeline.take() {
            let addr = fetch_addr.wrapping_sub(ws);
            let thumb = self.thumb();
            self.pc_written = false;

            let executed = self.execute_word(word, addr, bus, config)?;
            for observer in observers {
                observer.on_instruction(addr, word, executed);
            }

            if self.pc_written || self.thumb() != thumb {
                // The word fetched this step belongs to the old stream; a fault fetching it is moot.
                tracing::trace!("Pipeline flush, next fetch at {:#x}", self.regs[15]);
                for observer in observers {
                    observer.on_pipeline_flush(self.regs[15]);
                }
                return Ok(());
            }
        }

        self.pipeline = Some(fetched?);
        Ok(())
    }

    fn set_pc(&mut self, val: u32) {
        self.regs[15] = val & self.pc_mask();
        self.pipeline = None;
    }

    fn get_pc(&self) -> u32 {
        self.regs[15]
    }

    fn get_register(&self, id: u8) -> u32 {
        match id {
            0..=15 => self.regs[id as usize],
            16 => self.cpsr.bits(),
            _ => 0,
        }
    }

    fn set_register(&mut self, id: u8, val: u32) {
        match id {
            PC => Cpu::set_pc(self, val),
            0..=14 => self.regs[id as usize] = val,
            16 => {
                if let Err(e) = self.set_cpsr(val) {
                    tracing::warn!("Ignoring CPSR write: {}", e);
                }
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot::Arm7Tdmi(Arm7TdmiSnapshot {
            registers: self.regs.to_vec(),
            cpsr: self.cpsr.bits(),
            spsr: Mode::BANKED
                .iter()
                .zip(self.spsr.iter())
                .map(|(mode, value)| (*mode, *value))
                .collect::<BTreeMap<_, _>>(),
            sctlr: self.sctlr.bits(),
            pipeline: self.pipeline,
        })
    }

    fn apply_snapshot(&mut self, snapshot: &CpuSnapshot) {
        let CpuSnapshot::Arm7Tdmi(s) = snapshot;
        for (slot, value) in self.regs.iter_mut().zip(s.registers.iter()) {
            *slot = *value;
        }
        if Mode::try_from(s.cpsr).is_ok() {
            self.cpsr = Psr::from_bits_retain(s.cpsr);
        } else {
            tracing::warn!("Snapshot CPSR {:#x} has an invalid mode, keeping current", s.cpsr);
        }
        for (mode, value) in &s.spsr {
            if let Some(i) = mode.spsr_index() {
                self.spsr[i] = *value;
            }
        }
        self.sctlr = Sctlr::from_bits_retain(s.sctlr);
        self.pipeline = s.pipeline;
    }

    fn get_register_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..13).map(|i| format!("r{}", i)).collect();
        names.extend(["sp", "lr", "pc", "cpsr"].iter().map(|s| s.to_string()));
        names
    }
}
