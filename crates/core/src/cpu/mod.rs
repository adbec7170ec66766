// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod alu;
pub mod arm7tdmi;
mod exec;
pub mod psr;

pub use arm7tdmi::Arm7Tdmi;
pub use psr::{Flag, Mode, Psr, Sctlr};

/// Register aliases.
pub const SP: u8 = 13;
pub const LR: u8 = 14;
pub const PC: u8 = 15;
