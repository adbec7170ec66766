// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Barrel shifter and adder.
//!
//! Every shifter returns the shifted value and the carry-out. A carry-out of
//! `None` means the operation leaves C alone (shift by zero); the caller
//! commits `Some` carries only for flag-writing instructions.

use super::psr::Psr;
use crate::decoder::ShiftKind;

pub type Shifted = (u32, Option<bool>);

#[inline]
fn bit(value: u32, n: u32) -> bool {
    (value >> n) & 1 == 1
}

pub fn lsl(value: u32, amount: u32) -> Shifted {
    match amount {
        0 => (value, None),
        1..=31 => (value << amount, Some(bit(value, 32 - amount))),
        32 => (0, Some(bit(value, 0))),
        _ => (0, Some(false)),
    }
}

pub fn lsr(value: u32, amount: u32) -> Shifted {
    match amount {
        0 => (value, None),
        1..=31 => (value >> amount, Some(bit(value, amount - 1))),
        32 => (0, Some(bit(value, 31))),
        _ => (0, Some(false)),
    }
}

pub fn asr(value: u32, amount: u32) -> Shifted {
    match amount {
        0 => (value, None),
        1..=31 => (
            ((value as i32) >> amount) as u32,
            Some(bit(value, amount - 1)),
        ),
        _ => (((value as i32) >> 31) as u32, Some(bit(value, 31))),
    }
}

pub fn ror(value: u32, amount: u32) -> Shifted {
    if amount == 0 {
        return (value, None);
    }
    let result = value.rotate_right(amount % 32);
    (result, Some(bit(result, 31)))
}

/// Rotate right by one through carry.
pub fn rrx(value: u32, carry_in: bool) -> Shifted {
    (
        ((carry_in as u32) << 31) | (value >> 1),
        Some(bit(value, 0)),
    )
}

/// Immediate-count shift (5-bit field). LSR/ASR #0 encode #32, ROR #0 encodes RRX.
pub fn shift_by_immediate(kind: ShiftKind, value: u32, imm5: u32, carry_in: bool) -> Shifted {
    match (kind, imm5) {
        (ShiftKind::Lsl, n) => lsl(value, n),
        (ShiftKind::Lsr, 0) => lsr(value, 32),
        (ShiftKind::Lsr, n) => lsr(value, n),
        (ShiftKind::Asr, 0) => asr(value, 32),
        (ShiftKind::Asr, n) => asr(value, n),
        (ShiftKind::Ror, 0) => rrx(value, carry_in),
        (ShiftKind::Ror, n) => ror(value, n),
    }
}

/// Register-count shift; only the bottom byte of the count register is used.
pub fn shift_by_register(kind: ShiftKind, value: u32, count: u32) -> Shifted {
    let amount = count & 0xFF;
    match kind {
        ShiftKind::Lsl => lsl(value, amount),
        ShiftKind::Lsr => lsr(value, amount),
        ShiftKind::Asr => asr(value, amount),
        ShiftKind::Ror => ror(value, amount),
    }
}

/// Data-processing immediate: `imm8` rotated right by twice the 4-bit rotate field.
pub fn expand_immediate(imm8: u8, rotate: u8) -> Shifted {
    ror(imm8 as u32, (rotate as u32 & 0xF) * 2)
}

/// Returns `(result, carry, overflow)` of `x + y + carry_in`.
pub fn add_with_carry(x: u32, y: u32, carry_in: bool) -> (u32, bool, bool) {
    let unsigned_sum = x as u64 + y as u64 + carry_in as u64;
    let signed_sum = x as i32 as i64 + y as i32 as i64 + carry_in as i64;
    let result = unsigned_sum as u32;
    let carry = result as u64 != unsigned_sum;
    let overflow = result as i32 as i64 != signed_sum;
    (result, carry, overflow)
}

#[inline(always)]
pub fn check_condition(cond: u8, psr: Psr) -> bool {
    let n = psr.contains(Psr::N);
    let z = psr.contains(Psr::Z);
    let c = psr.contains(Psr::C);
    let v = psr.contains(Psr::V);

    match cond & 0xF {
        0x0 => z,              // EQ
        0x1 => !z,             // NE
        0x2 => c,              // CS/HS
        0x3 => !c,             // CC/LO
        0x4 => n,              // MI
        0x5 => !n,             // PL
        0x6 => v,              // VS
        0x7 => !v,             // VC
        0x8 => c && !z,        // HI
        0x9 => !c || z,        // LS
        0xA => n == v,         // GE
        0xB => n != v,         // LT
        0xC => !z && (n == v), // GT
        0xD => z || (n != v),  // LE
        0xE => true,           // AL
        _ => false,            // NV
    }
}
