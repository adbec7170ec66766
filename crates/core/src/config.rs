// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use tdmi_config::{SeedMode, SimulationSection, UnimplementedMode};

use crate::memory::SeedPolicy;

/// Outcome of executing an instruction class that has no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnimplementedPolicy {
    /// Stop the step with `SimulationError::Unimplemented`.
    #[default]
    Fault,
    /// Log a warning and retire the instruction without effect.
    Skip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub unimplemented: UnimplementedPolicy,
}

impl From<UnimplementedMode> for UnimplementedPolicy {
    fn from(mode: UnimplementedMode) -> Self {
        match mode {
            UnimplementedMode::Fault => UnimplementedPolicy::Fault,
            UnimplementedMode::Skip => UnimplementedPolicy::Skip,
        }
    }
}

impl From<&SimulationSection> for SimulationConfig {
    fn from(section: &SimulationSection) -> Self {
        Self {
            unimplemented: section.unimplemented.into(),
        }
    }
}

impl From<SeedMode> for SeedPolicy {
    fn from(mode: SeedMode) -> Self {
        match mode {
            SeedMode::Exact => SeedPolicy::Exact,
            SeedMode::Pad => SeedPolicy::Pad,
        }
    }
}
