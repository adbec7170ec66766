// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Program status word. Bits outside the named set are retained as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Psr: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
        const Q = 1 << 27;
        const J = 1 << 24;
        const E = 1 << 9;
        const A = 1 << 8;
        const I = 1 << 7;
        const F = 1 << 6;
        const T = 1 << 5;
        const MODE = 0x1F;
    }
}

bitflags! {
    /// System control register (CP15 c1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sctlr: u32 {
        const TE = 1 << 30;
        const AFE = 1 << 29;
        const TRE = 1 << 28;
        const NMFI = 1 << 27;
        const EE = 1 << 25;
        const VE = 1 << 24;
        const U = 1 << 22;
        const FI = 1 << 21;
        const UWXN = 1 << 20;
        const WXN = 1 << 19;
        const HA = 1 << 17;
        const RR = 1 << 14;
        const V = 1 << 13;
        const I = 1 << 12;
        const Z = 1 << 11;
        const SW = 1 << 10;
        const B = 1 << 7;
        const C15BEN = 1 << 5;
        const C = 1 << 2;
        const A = 1 << 1;
        const M = 1 << 0;
    }
}

impl Sctlr {
    /// Reset value: TE, NMFI, EE, U, V and CP15BEN set, plus the RAO bits 23, 18, 16, 6, 4 and 3.
    pub const RESET: u32 = 0x4AC5_2078;
}

impl Default for Sctlr {
    fn default() -> Self {
        Sctlr::from_bits_retain(Self::RESET)
    }
}

/// Condition-flag and state bits addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    N,
    Z,
    C,
    V,
    Q,
    T,
}

impl Flag {
    pub fn bit(self) -> Psr {
        match self {
            Flag::N => Psr::N,
            Flag::Z => Psr::Z,
            Flag::C => Psr::C,
            Flag::V => Psr::V,
            Flag::Q => Psr::Q,
            Flag::T => Psr::T,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Mode {
    Usr = 0b10000,
    Fiq = 0b10001,
    Irq = 0b10010,
    Svc = 0b10011,
    Mon = 0b10110,
    Abt = 0b10111,
    Hyp = 0b11010,
    Und = 0b11011,
    Sys = 0b11111,
}

impl Mode {
    /// Modes with a banked saved-status slot, in bank order.
    pub const BANKED: [Mode; 7] = [
        Mode::Fiq,
        Mode::Irq,
        Mode::Svc,
        Mode::Mon,
        Mode::Abt,
        Mode::Hyp,
        Mode::Und,
    ];

    pub fn is_privileged(self) -> bool {
        self != Mode::Usr
    }

    pub fn spsr_index(self) -> Option<usize> {
        Self::BANKED.iter().position(|&m| m == self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Usr => "usr",
            Mode::Fiq => "fiq",
            Mode::Irq => "irq",
            Mode::Svc => "svc",
            Mode::Mon => "mon",
            Mode::Abt => "abt",
            Mode::Hyp => "hyp",
            Mode::Und => "und",
            Mode::Sys => "sys",
        }
    }
}

impl TryFrom<u32> for Mode {
    type Error = SimulationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value & 0x1F {
            0b10000 => Ok(Mode::Usr),
            0b10001 => Ok(Mode::Fiq),
            0b10010 => Ok(Mode::Irq),
            0b10011 => Ok(Mode::Svc),
            0b10110 => Ok(Mode::Mon),
            0b10111 => Ok(Mode::Abt),
            0b11010 => Ok(Mode::Hyp),
            0b11011 => Ok(Mode::Und),
            0b11111 => Ok(Mode::Sys),
            bits => Err(SimulationError::InvalidMode { value: bits }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bits of the live status word an MSR-style write may replace.
///
/// `mask` selects byte lanes (bit 3 = flags, 2 = status, 1 = extension, 0 = control).
/// Exception returns may also restore the IT/J bits and the T bit.
pub fn current_status_write_mask(
    value: u32,
    mask: u8,
    is_return: bool,
    privileged: bool,
    nmfi: bool,
) -> u32 {
    let mut copy = 0;
    if mask & 0b1000 != 0 {
        copy |= 0xF800_0000;
        if is_return {
            copy |= 0x0700_0000;
        }
    }
    if mask & 0b0100 != 0 {
        copy |= 0x000F_0000;
    }
    if mask & 0b0010 != 0 {
        if is_return {
            copy |= 0x0000_FC00;
        }
        copy |= Psr::E.bits();
        if privileged {
            copy |= Psr::A.bits();
        }
    }
    if mask & 0b0001 != 0 {
        if privileged {
            copy |= Psr::I.bits() | Psr::MODE.bits();
            // With NMFI set, F may be cleared but never set.
            if !nmfi || value & Psr::F.bits() == 0 {
                copy |= Psr::F.bits();
            }
        }
        if is_return {
            copy |= Psr::T.bits();
        }
    }
    copy
}

/// Bits of a saved-status slot an MSR write replaces. Every selected lane is written whole.
pub fn saved_status_write_mask(mask: u8) -> u32 {
    [0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000]
        .iter()
        .enumerate()
        .filter(|(lane, _)| mask & (1 << lane) != 0)
        .fold(0, |acc, (_, bits)| acc | bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes() {
        for mode in Mode::BANKED.iter().chain([Mode::Usr, Mode::Sys].iter()) {
            assert_eq!(Mode::try_from(*mode as u32).unwrap(), *mode);
        }
        assert!(matches!(
            Mode::try_from(0b10100),
            Err(SimulationError::InvalidMode { value: 0b10100 })
        ));
        assert_eq!(Mode::Usr.spsr_index(), None);
        assert_eq!(Mode::Sys.spsr_index(), None);
        assert_eq!(Mode::Fiq.spsr_index(), Some(0));
        assert_eq!(Mode::Und.spsr_index(), Some(6));
        assert!(!Mode::Usr.is_privileged());
        assert!(Mode::Sys.is_privileged());
    }

    #[test]
    fn test_psr_named_bits_round_trip() {
        let named = [
            (Psr::N, 31),
            (Psr::Z, 30),
            (Psr::C, 29),
            (Psr::V, 28),
            (Psr::Q, 27),
            (Psr::I, 7),
            (Psr::F, 6),
            (Psr::T, 5),
        ];
        for (flag, bit) in named {
            let mut psr = Psr::empty();
            psr.insert(flag);
            assert_eq!(psr.bits(), 1 << bit);
            assert!(Psr::from_bits_retain(1 << bit).contains(flag));
            psr.remove(flag);
            assert!(psr.is_empty());
        }
    }

    #[test]
    fn test_sctlr_reset_value() {
        let sctlr = Sctlr::default();
        for flag in [
            Sctlr::TE,
            Sctlr::NMFI,
            Sctlr::EE,
            Sctlr::U,
            Sctlr::V,
            Sctlr::C15BEN,
        ] {
            assert!(sctlr.contains(flag));
        }
        for flag in [Sctlr::AFE, Sctlr::TRE, Sctlr::VE, Sctlr::I, Sctlr::M, Sctlr::A] {
            assert!(!sctlr.contains(flag));
        }
        for bit in [23, 18, 16, 6, 4, 3] {
            assert_ne!(sctlr.bits() & (1 << bit), 0);
        }
    }

    #[test]
    fn test_current_status_mask_user_mode() {
        // Unprivileged writes reach the flags and E, never the control byte.
        let copy = current_status_write_mask(0xFFFF_FFFF, 0b1111, false, false, false);
        assert_eq!(copy, 0xF80F_0200);
    }

    #[test]
    fn test_current_status_mask_privileged() {
        let copy = current_status_write_mask(0, 0b1111, false, true, false);
        assert_eq!(copy, 0xF80F_03DF);
        let copy = current_status_write_mask(0, 0b1111, true, true, false);
        assert_eq!(copy, 0xFF0F_FFFF);
    }

    #[test]
    fn test_nmfi_blocks_setting_f() {
        let set_f = current_status_write_mask(Psr::F.bits(), 0b0001, false, true, true);
        assert_eq!(set_f & Psr::F.bits(), 0);
        let clear_f = current_status_write_mask(0, 0b0001, false, true, true);
        assert_ne!(clear_f & Psr::F.bits(), 0);
    }

    #[test]
    fn test_saved_status_lanes() {
        assert_eq!(saved_status_write_mask(0b1000), 0xFF00_0000);
        assert_eq!(saved_status_write_mask(0b0101), 0x00FF_00FF);
        assert_eq!(saved_status_write_mask(0b1111), 0xFFFF_FFFF);
        assert_eq!(saved_status_write_mask(0), 0);
    }
}
