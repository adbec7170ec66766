// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod arm;
pub mod thumb;

pub use arm::decode_arm;
pub use thumb::decode_thumb;

/// Condition code that always passes.
pub const COND_AL: u8 = 0xE;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => ShiftKind::Lsl,
            1 => ShiftKind::Lsr,
            2 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }
}

/// ARM data-processing opcodes, bits 24-21.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl AluOp {
    pub fn from_bits(bits: u32) -> Self {
        use AluOp::*;
        const TABLE: [AluOp; 16] = [
            And, Eor, Sub, Rsb, Add, Adc, Sbc, Rsc, Tst, Teq, Cmp, Cmn, Orr, Mov, Bic, Mvn,
        ];
        TABLE[(bits & 0xF) as usize]
    }

    /// TST/TEQ/CMP/CMN: flags only, no destination.
    pub fn is_test(self) -> bool {
        matches!(self, AluOp::Tst | AluOp::Teq | AluOp::Cmp | AluOp::Cmn)
    }

    /// Ops whose carry comes from the shifter rather than the adder.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            AluOp::And
                | AluOp::Eor
                | AluOp::Tst
                | AluOp::Teq
                | AluOp::Orr
                | AluOp::Mov
                | AluOp::Bic
                | AluOp::Mvn
        )
    }

    /// Ops that read Rn.
    pub fn uses_rn(self) -> bool {
        !matches!(self, AluOp::Mov | AluOp::Mvn)
    }
}

/// Shifter operand of a data-processing instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operand2 {
    Immediate { imm8: u8, rotate: u8 },
    ShiftImm { rm: u8, shift: ShiftKind, amount: u8 },
    ShiftReg { rm: u8, shift: ShiftKind, rs: u8 },
}

/// Offset of a word/byte transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Offset {
    Immediate(u32),
    Register { rm: u8, shift: ShiftKind, amount: u8 },
}

/// Offset of a halfword/signed transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HalfOffset {
    Immediate(u32),
    Register(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HalfwordKind {
    /// LDRH / STRH
    Unsigned,
    /// LDRSB
    SignedByte,
    /// LDRSH
    SignedHalf,
}

/// Pre/post indexing and writeback shared by the transfer forms.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Addressing {
    pub pre: bool,
    pub up: bool,
    pub writeback: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MsrSource {
    Immediate { imm8: u8, rotate: u8 },
    Register(u8),
}

/// THUMB format 4 opcodes, bits 9-6.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThumbAluOp {
    And,
    Eor,
    Lsl,
    Lsr,
    Asr,
    Adc,
    Sbc,
    Ror,
    Tst,
    Neg,
    Cmp,
    Cmn,
    Orr,
    Mul,
    Bic,
    Mvn,
}

impl ThumbAluOp {
    pub fn from_bits(bits: u16) -> Self {
        use ThumbAluOp::*;
        const TABLE: [ThumbAluOp; 16] = [
            And, Eor, Lsl, Lsr, Asr, Adc, Sbc, Ror, Tst, Neg, Cmp, Cmn, Orr, Mul, Bic, Mvn,
        ];
        TABLE[(bits & 0xF) as usize]
    }
}

/// THUMB format 3 opcodes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThumbImmOp {
    Mov,
    Cmp,
    Add,
    Sub,
}

/// THUMB format 5 opcodes (BX is decoded separately).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HiRegOp {
    Add,
    Cmp,
    Mov,
}

/// Second operand of THUMB ADD/SUB (format 2).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThumbOperand {
    Register(u8),
    Immediate(u8),
}

/// Instruction classes that decode but have no handler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Unsupported {
    BlockTransfer,
    Coprocessor,
    SoftwareInterrupt,
    ThumbLoadStore,
    ThumbLoadAddress,
    ThumbStack,
    ThumbMultiple,
}

impl Unsupported {
    pub fn name(self) -> &'static str {
        match self {
            Unsupported::BlockTransfer => "block data transfer",
            Unsupported::Coprocessor => "coprocessor",
            Unsupported::SoftwareInterrupt => "software interrupt",
            Unsupported::ThumbLoadStore => "THUMB load/store",
            Unsupported::ThumbLoadAddress => "THUMB load address",
            Unsupported::ThumbStack => "THUMB stack",
            Unsupported::ThumbMultiple => "THUMB multiple load/store",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    // ARM
    DataProcessing {
        op: AluOp,
        s: bool,
        rn: u8,
        rd: u8,
        operand: Operand2,
    },
    Mrs {
        rd: u8,
        spsr: bool,
    },
    Msr {
        spsr: bool,
        mask: u8,
        source: MsrSource,
    },
    Bx {
        rm: u8,
    },
    Branch {
        link: bool,
        offset: i32,
    },
    Multiply {
        accumulate: bool,
        s: bool,
        rd: u8,
        rn: u8,
        rs: u8,
        rm: u8,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        s: bool,
        rd_hi: u8,
        rd_lo: u8,
        rs: u8,
        rm: u8,
    },
    Swap {
        byte: bool,
        rn: u8,
        rd: u8,
        rm: u8,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        addressing: Addressing,
        rn: u8,
        rd: u8,
        offset: Offset,
    },
    HalfwordTransfer {
        load: bool,
        kind: HalfwordKind,
        addressing: Addressing,
        rn: u8,
        rd: u8,
        offset: HalfOffset,
    },

    // THUMB
    ThumbShift {
        shift: ShiftKind,
        rd: u8,
        rm: u8,
        imm5: u8,
    },
    ThumbAddSub {
        sub: bool,
        rd: u8,
        rn: u8,
        operand: ThumbOperand,
    },
    ThumbImm {
        op: ThumbImmOp,
        rd: u8,
        imm8: u8,
    },
    ThumbAlu {
        op: ThumbAluOp,
        rd: u8,
        rm: u8,
    },
    ThumbHiReg {
        op: HiRegOp,
        rd: u8,
        rm: u8,
    },
    ThumbBx {
        rm: u8,
    },
    /// Conditional (format 16) and unconditional (format 18) branches.
    ThumbBranch {
        offset: i32,
    },
    /// First half of BL: LR = PC + (offset << 12).
    ThumbBlHigh {
        offset: i32,
    },
    /// Second half of BL: PC = LR + (offset << 1).
    ThumbBlLow {
        offset: u32,
    },

    Unimplemented(Unsupported),
    Undefined,
}

/// One fetched word, decoded. Consumed by exactly one execute.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Decoded {
    pub instruction: Instruction,
    pub raw: u32,
    pub cond: u8,
}

/// Decodes `word` in the given execution state. Never touches processor state.
pub fn decode(word: u32, thumb: bool) -> Decoded {
    if thumb {
        decode_thumb(word as u16)
    } else {
        decode_arm(word)
    }
}

/// Sign-extends the low `bits` bits of `value`.
#[inline]
pub(crate) fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
