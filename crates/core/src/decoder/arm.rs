// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{
    sign_extend, Addressing, AluOp, Decoded, HalfOffset, HalfwordKind, Instruction, MsrSource,
    Offset, Operand2, ShiftKind, Unsupported,
};

#[inline]
fn reg(word: u32, lsb: u32) -> u8 {
    ((word >> lsb) & 0xF) as u8
}

#[inline]
fn flag(word: u32, bit: u32) -> bool {
    (word >> bit) & 1 != 0
}

fn addressing(word: u32) -> Addressing {
    Addressing {
        pre: flag(word, 24),
        up: flag(word, 23),
        writeback: flag(word, 21),
    }
}

/// Decodes a 32-bit ARM word. Groups are separated by bits 27-25 first; test
/// order inside group 000 matters because multiply, swap, BX and the extra
/// load/store forms all live inside the data-processing encoding space.
pub fn decode_arm(word: u32) -> Decoded {
    let cond = (word >> 28) as u8;
    let instruction = match (word >> 25) & 0x7 {
        0b000 => decode_group_000(word),
        0b001 => decode_data_processing_imm(word),
        0b010 => Instruction::SingleTransfer {
            load: flag(word, 20),
            byte: flag(word, 22),
            addressing: addressing(word),
            rn: reg(word, 16),
            rd: reg(word, 12),
            offset: Offset::Immediate(word & 0xFFF),
        },
        0b011 => {
            // Bit 4 set here is the architecturally undefined space.
            if flag(word, 4) {
                Instruction::Undefined
            } else {
                Instruction::SingleTransfer {
                    load: flag(word, 20),
                    byte: flag(word, 22),
                    addressing: addressing(word),
                    rn: reg(word, 16),
                    rd: reg(word, 12),
                    offset: Offset::Register {
                        rm: reg(word, 0),
                        shift: ShiftKind::from_bits(word >> 5),
                        amount: ((word >> 7) & 0x1F) as u8,
                    },
                }
            }
        }
        0b100 => Instruction::Unimplemented(Unsupported::BlockTransfer),
        0b101 => Instruction::Branch {
            link: flag(word, 24),
            offset: sign_extend(word & 0x00FF_FFFF, 24) << 2,
        },
        0b110 => Instruction::Unimplemented(Unsupported::Coprocessor),
        _ => {
            if flag(word, 24) {
                Instruction::Unimplemented(Unsupported::SoftwareInterrupt)
            } else {
                Instruction::Unimplemented(Unsupported::Coprocessor)
            }
        }
    };

    Decoded {
        instruction,
        raw: word,
        cond,
    }
}

fn decode_group_000(word: u32) -> Instruction {
    // BX Rm: cccc 0001 0010 1111 1111 1111 0001 mmmm
    if (word & 0x0FFF_FFF0) == 0x012F_FF10 {
        return Instruction::Bx { rm: reg(word, 0) };
    }

    // MUL/MLA: cccc 0000 00AS dddd nnnn ssss 1001 mmmm
    if (word & 0x0FC0_00F0) == 0x0000_0090 {
        return Instruction::Multiply {
            accumulate: flag(word, 21),
            s: flag(word, 20),
            rd: reg(word, 16),
            rn: reg(word, 12),
            rs: reg(word, 8),
            rm: reg(word, 0),
        };
    }

    // UMULL/UMLAL/SMULL/SMLAL: cccc 0000 1UAS hhhh llll ssss 1001 mmmm
    if (word & 0x0F80_00F0) == 0x0080_0090 {
        return Instruction::MultiplyLong {
            signed: flag(word, 22),
            accumulate: flag(word, 21),
            s: flag(word, 20),
            rd_hi: reg(word, 16),
            rd_lo: reg(word, 12),
            rs: reg(word, 8),
            rm: reg(word, 0),
        };
    }

    // SWP/SWPB: cccc 0001 0B00 nnnn dddd 0000 1001 mmmm
    if (word & 0x0FB0_0FF0) == 0x0100_0090 {
        return Instruction::Swap {
            byte: flag(word, 22),
            rn: reg(word, 16),
            rd: reg(word, 12),
            rm: reg(word, 0),
        };
    }

    // Extra load/store: bits 7 and 4 set, SH in bits 6-5.
    if (word & 0x90) == 0x90 {
        return decode_extra_load_store(word);
    }

    let op = AluOp::from_bits(word >> 21);
    let s = flag(word, 20);
    if op.is_test() && !s {
        return decode_status_transfer(word);
    }

    let rm = reg(word, 0);
    let shift = ShiftKind::from_bits(word >> 5);
    let operand = if flag(word, 4) {
        Operand2::ShiftReg {
            rm,
            shift,
            rs: reg(word, 8),
        }
    } else {
        Operand2::ShiftImm {
            rm,
            shift,
            amount: ((word >> 7) & 0x1F) as u8,
        }
    };

    Instruction::DataProcessing {
        op,
        s,
        rn: reg(word, 16),
        rd: reg(word, 12),
        operand,
    }
}

fn decode_data_processing_imm(word: u32) -> Instruction {
    let op = AluOp::from_bits(word >> 21);
    let s = flag(word, 20);
    let imm8 = (word & 0xFF) as u8;
    let rotate = ((word >> 8) & 0xF) as u8;

    if op.is_test() && !s {
        // MSR immediate: cccc 0011 0R10 ffff 1111 rrrr iiii iiii
        if (word & 0x0FB0_F000) == 0x0320_F000 {
            return Instruction::Msr {
                spsr: flag(word, 22),
                mask: ((word >> 16) & 0xF) as u8,
                source: MsrSource::Immediate { imm8, rotate },
            };
        }
        return Instruction::Undefined;
    }

    Instruction::DataProcessing {
        op,
        s,
        rn: reg(word, 16),
        rd: reg(word, 12),
        operand: Operand2::Immediate { imm8, rotate },
    }
}

/// MRS / MSR register form, carved out of the TST/TEQ/CMP/CMN slots with S clear.
fn decode_status_transfer(word: u32) -> Instruction {
    // MRS: cccc 0001 0R00 1111 dddd 0000 0000 0000
    if (word & 0x0FBF_0FFF) == 0x010F_0000 {
        return Instruction::Mrs {
            rd: reg(word, 12),
            spsr: flag(word, 22),
        };
    }
    // MSR register: cccc 0001 0R10 ffff 1111 0000 0000 mmmm
    if (word & 0x0FB0_FFF0) == 0x0120_F000 {
        return Instruction::Msr {
            spsr: flag(word, 22),
            mask: ((word >> 16) & 0xF) as u8,
            source: MsrSource::Register(reg(word, 0)),
        };
    }
    Instruction::Undefined
}

fn decode_extra_load_store(word: u32) -> Instruction {
    let load = flag(word, 20);
    let kind = match ((word >> 5) & 0x3, load) {
        (0b01, _) => HalfwordKind::Unsigned,
        (0b10, true) => HalfwordKind::SignedByte,
        (0b11, true) => HalfwordKind::SignedHalf,
        // SH = 00 is the multiply/swap space, and there are no signed stores.
        _ => return Instruction::Undefined,
    };

    let offset = if flag(word, 22) {
        HalfOffset::Immediate(((word >> 4) & 0xF0) | (word & 0xF))
    } else {
        HalfOffset::Register(reg(word, 0))
    };

    Instruction::HalfwordTransfer {
        load,
        kind,
        addressing: addressing(word),
        rn: reg(word, 16),
        rd: reg(word, 12),
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mov_immediate() {
        // MOV r0, #0xFF000000  (imm8=0xFF, rotate=4)
        let d = decode_arm(0xE3A0_04FF);
        assert_eq!(d.cond, 0xE);
        assert_eq!(
            d.instruction,
            Instruction::DataProcessing {
                op: AluOp::Mov,
                s: false,
                rn: 0,
                rd: 0,
                operand: Operand2::Immediate {
                    imm8: 0xFF,
                    rotate: 4
                },
            }
        );
    }

    #[test]
    fn test_decode_register_operands() {
        // ADDS r1, r2, r3, LSL #4
        assert_eq!(
            decode_arm(0xE092_1203).instruction,
            Instruction::DataProcessing {
                op: AluOp::Add,
                s: true,
                rn: 2,
                rd: 1,
                operand: Operand2::ShiftImm {
                    rm: 3,
                    shift: ShiftKind::Lsl,
                    amount: 4
                },
            }
        );
        // SUB r0, r1, r2, ROR r3
        assert_eq!(
            decode_arm(0xE041_0372).instruction,
            Instruction::DataProcessing {
                op: AluOp::Sub,
                s: false,
                rn: 1,
                rd: 0,
                operand: Operand2::ShiftReg {
                    rm: 2,
                    shift: ShiftKind::Ror,
                    rs: 3
                },
            }
        );
    }

    #[test]
    fn test_decode_compare_sets_s() {
        // CMP r0, #0x7F000000
        let d = decode_arm(0xE350_047F);
        assert!(matches!(
            d.instruction,
            Instruction::DataProcessing {
                op: AluOp::Cmp,
                s: true,
                rn: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_branch() {
        // BL with offset -2 words
        let d = decode_arm(0xEBFF_FFFE);
        assert_eq!(
            d.instruction,
            Instruction::Branch {
                link: true,
                offset: -8
            }
        );
        // BEQ +0x10
        let d = decode_arm(0x0A00_0004);
        assert_eq!(d.cond, 0x0);
        assert_eq!(
            d.instruction,
            Instruction::Branch {
                link: false,
                offset: 0x10
            }
        );
    }

    #[test]
    fn test_decode_bx_before_status_transfer() {
        assert_eq!(
            decode_arm(0xE12F_FF11).instruction,
            Instruction::Bx { rm: 1 }
        );
    }

    #[test]
    fn test_decode_status_transfers() {
        // MRS r2, CPSR / MRS r2, SPSR
        assert_eq!(
            decode_arm(0xE10F_2000).instruction,
            Instruction::Mrs { rd: 2, spsr: false }
        );
        assert_eq!(
            decode_arm(0xE14F_2000).instruction,
            Instruction::Mrs { rd: 2, spsr: true }
        );
        // MSR CPSR_fc, r3
        assert_eq!(
            decode_arm(0xE129_F003).instruction,
            Instruction::Msr {
                spsr: false,
                mask: 0b1001,
                source: MsrSource::Register(3)
            }
        );
        // MSR SPSR_f, #0xF0000000
        assert_eq!(
            decode_arm(0xE368_F20F).instruction,
            Instruction::Msr {
                spsr: true,
                mask: 0b1000,
                source: MsrSource::Immediate {
                    imm8: 0x0F,
                    rotate: 2
                }
            }
        );
        // TST with S clear but no MRS/MSR shape
        assert_eq!(decode_arm(0xE100_0001).instruction, Instruction::Undefined);
    }

    #[test]
    fn test_decode_multiply_family() {
        // MLAS r1, r2, r3, r4
        assert_eq!(
            decode_arm(0xE031_4392).instruction,
            Instruction::Multiply {
                accumulate: true,
                s: true,
                rd: 1,
                rn: 4,
                rs: 3,
                rm: 2
            }
        );
        // SMLAL r0, r1, r2, r3
        assert_eq!(
            decode_arm(0xE0E1_0392).instruction,
            Instruction::MultiplyLong {
                signed: true,
                accumulate: true,
                s: false,
                rd_hi: 1,
                rd_lo: 0,
                rs: 3,
                rm: 2
            }
        );
        // SWPB r0, r1, [r2]
        assert_eq!(
            decode_arm(0xE142_0091).instruction,
            Instruction::Swap {
                byte: true,
                rn: 2,
                rd: 0,
                rm: 1
            }
        );
    }

    #[test]
    fn test_decode_single_transfer() {
        // STR r0, [r1, #4]!
        assert_eq!(
            decode_arm(0xE5A1_0004).instruction,
            Instruction::SingleTransfer {
                load: false,
                byte: false,
                addressing: Addressing {
                    pre: true,
                    up: true,
                    writeback: true
                },
                rn: 1,
                rd: 0,
                offset: Offset::Immediate(4),
            }
        );
        // LDRB r2, [r3], -r4, LSR #2
        assert_eq!(
            decode_arm(0xE653_2124).instruction,
            Instruction::SingleTransfer {
                load: true,
                byte: true,
                addressing: Addressing {
                    pre: false,
                    up: false,
                    writeback: false
                },
                rn: 3,
                rd: 2,
                offset: Offset::Register {
                    rm: 4,
                    shift: ShiftKind::Lsr,
                    amount: 2
                },
            }
        );
        assert_eq!(decode_arm(0xE7F0_00F0).instruction, Instruction::Undefined);
    }

    #[test]
    fn test_decode_extra_load_store() {
        // LDRH r0, [r1, #0x24]
        assert_eq!(
            decode_arm(0xE1D1_02B4).instruction,
            Instruction::HalfwordTransfer {
                load: true,
                kind: HalfwordKind::Unsigned,
                addressing: Addressing {
                    pre: true,
                    up: true,
                    writeback: false
                },
                rn: 1,
                rd: 0,
                offset: HalfOffset::Immediate(0x24),
            }
        );
        // LDRSB r0, [r1, r2]
        assert!(matches!(
            decode_arm(0xE191_00D2).instruction,
            Instruction::HalfwordTransfer {
                kind: HalfwordKind::SignedByte,
                offset: HalfOffset::Register(2),
                ..
            }
        ));
        // LDRSH r0, [r1, #-2]
        assert!(matches!(
            decode_arm(0xE151_00F2).instruction,
            Instruction::HalfwordTransfer {
                kind: HalfwordKind::SignedHalf,
                addressing: Addressing { up: false, .. },
                ..
            }
        ));
        // Signed store shape
        assert_eq!(decode_arm(0xE1C1_00D0).instruction, Instruction::Undefined);
    }

    #[test]
    fn test_decode_unimplemented_groups() {
        assert_eq!(
            decode_arm(0xE8BD_000F).instruction,
            Instruction::Unimplemented(Unsupported::BlockTransfer)
        );
        assert_eq!(
            decode_arm(0xEF00_0000).instruction,
            Instruction::Unimplemented(Unsupported::SoftwareInterrupt)
        );
        assert_eq!(
            decode_arm(0xEE01_0F10).instruction,
            Instruction::Unimplemented(Unsupported::Coprocessor)
        );
    }
}
