// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cpu::Mode;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MachineSnapshot {
    pub cpu: CpuSnapshot,
    /// Steps taken since the last reset.
    pub steps: u64,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CpuSnapshot {
    Arm7Tdmi(Arm7TdmiSnapshot),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Arm7TdmiSnapshot {
    /// r0..r15; r15 is the next fetch address.
    pub registers: Vec<u32>,
    /// Includes the IT execution state bits.
    pub cpsr: u32,
    pub spsr: BTreeMap<Mode, u32>,
    pub sctlr: u32,
    /// Word in flight between fetch and execute.
    pub pipeline: Option<u32>,
}
