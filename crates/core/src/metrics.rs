// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    step_count: AtomicU64,
    executed_count: AtomicU64,
    skipped_count: AtomicU64,
    flush_count: AtomicU64,
    start_time: Instant,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            step_count: AtomicU64::new(0),
            executed_count: AtomicU64::new(0),
            skipped_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.step_count.store(0, Ordering::SeqCst);
        self.executed_count.store(0, Ordering::SeqCst);
        self.skipped_count.store(0, Ordering::SeqCst);
        self.flush_count.store(0, Ordering::SeqCst);
    }

    /// Fetches performed.
    pub fn get_steps(&self) -> u64 {
        self.step_count.load(Ordering::SeqCst)
    }

    /// Instructions whose condition passed.
    pub fn get_instructions(&self) -> u64 {
        self.executed_count.load(Ordering::SeqCst)
    }

    /// Instructions retired without effect because their condition failed.
    pub fn get_condition_failed(&self) -> u64 {
        self.skipped_count.load(Ordering::SeqCst)
    }

    pub fn get_flushes(&self) -> u64 {
        self.flush_count.load(Ordering::SeqCst)
    }

    pub fn get_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_instructions() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_step_start(&self, _pc: u32, _opcode: u32) {
        self.step_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_instruction(&self, _pc: u32, _opcode: u32, executed: bool) {
        if executed {
            self.executed_count.fetch_add(1, Ordering::SeqCst);
        } else {
            self.skipped_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_pipeline_flush(&self, _target: u32) {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
    }
}
