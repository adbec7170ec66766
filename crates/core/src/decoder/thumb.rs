// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{
    sign_extend, Decoded, HiRegOp, Instruction, ShiftKind, ThumbAluOp, ThumbImmOp, ThumbOperand,
    Unsupported, COND_AL,
};

#[inline]
fn low_reg(opcode: u16, lsb: u16) -> u8 {
    ((opcode >> lsb) & 0x7) as u8
}

/// Decodes a 16-bit THUMB halfword. Only conditional branches carry a condition;
/// everything else is `AL` (IT blocks override this at execute time).
pub fn decode_thumb(opcode: u16) -> Decoded {
    let mut cond = COND_AL;
    let instruction = match opcode >> 13 {
        // Shift by immediate, add/subtract: 000x xxxx
        0b000 => {
            let rd = low_reg(opcode, 0);
            let rs = low_reg(opcode, 3);
            match (opcode >> 11) & 0x3 {
                0b11 => {
                    let field = low_reg(opcode, 6);
                    let operand = if opcode & 0x0400 != 0 {
                        ThumbOperand::Immediate(field)
                    } else {
                        ThumbOperand::Register(field)
                    };
                    Instruction::ThumbAddSub {
                        sub: opcode & 0x0200 != 0,
                        rd,
                        rn: rs,
                        operand,
                    }
                }
                op => Instruction::ThumbShift {
                    shift: ShiftKind::from_bits(op as u32),
                    rd,
                    rm: rs,
                    imm5: ((opcode >> 6) & 0x1F) as u8,
                },
            }
        }
        // Move/compare/add/subtract immediate: 001o orrr iiii iiii
        0b001 => {
            let op = match (opcode >> 11) & 0x3 {
                0 => ThumbImmOp::Mov,
                1 => ThumbImmOp::Cmp,
                2 => ThumbImmOp::Add,
                _ => ThumbImmOp::Sub,
            };
            Instruction::ThumbImm {
                op,
                rd: low_reg(opcode, 8),
                imm8: (opcode & 0xFF) as u8,
            }
        }
        0b010 => decode_group_010(opcode),
        0b011 => Instruction::Unimplemented(Unsupported::ThumbLoadStore),
        0b100 => Instruction::Unimplemented(Unsupported::ThumbLoadStore),
        0b101 => {
            if opcode & 0x1000 == 0 {
                Instruction::Unimplemented(Unsupported::ThumbLoadAddress)
            } else if opcode & 0x0F00 == 0x0000 || opcode & 0x0600 == 0x0400 {
                // ADD SP, #imm / PUSH / POP
                Instruction::Unimplemented(Unsupported::ThumbStack)
            } else {
                Instruction::Undefined
            }
        }
        0b110 => {
            if opcode & 0x1000 == 0 {
                Instruction::Unimplemented(Unsupported::ThumbMultiple)
            } else {
                match ((opcode >> 8) & 0xF) as u8 {
                    0xF => Instruction::Unimplemented(Unsupported::SoftwareInterrupt),
                    0xE => Instruction::Undefined,
                    c => {
                        cond = c;
                        Instruction::ThumbBranch {
                            offset: sign_extend((opcode & 0xFF) as u32, 8) << 1,
                        }
                    }
                }
            }
        }
        _ => {
            let offset11 = (opcode & 0x07FF) as u32;
            match (opcode >> 11) & 0x3 {
                0b00 => Instruction::ThumbBranch {
                    offset: sign_extend(offset11, 11) << 1,
                },
                0b10 => Instruction::ThumbBlHigh {
                    offset: sign_extend(offset11, 11),
                },
                0b11 => Instruction::ThumbBlLow { offset: offset11 },
                _ => Instruction::Undefined,
            }
        }
    };

    Decoded {
        instruction,
        raw: opcode as u32,
        cond,
    }
}

fn decode_group_010(opcode: u16) -> Instruction {
    // ALU operations: 0100 00oo oosss ddd
    if opcode & 0xFC00 == 0x4000 {
        return Instruction::ThumbAlu {
            op: ThumbAluOp::from_bits(opcode >> 6),
            rd: low_reg(opcode, 0),
            rm: low_reg(opcode, 3),
        };
    }

    // Hi register operations / BX: 0100 01oo h1 h2 sss ddd
    if opcode & 0xFC00 == 0x4400 {
        let h1 = (opcode >> 7) & 1;
        let rd = ((h1 << 3) as u8) | low_reg(opcode, 0);
        let rm = ((opcode >> 3) & 0xF) as u8;
        return match (opcode >> 8) & 0x3 {
            0 => Instruction::ThumbHiReg {
                op: HiRegOp::Add,
                rd,
                rm,
            },
            1 => Instruction::ThumbHiReg {
                op: HiRegOp::Cmp,
                rd,
                rm,
            },
            2 => Instruction::ThumbHiReg {
                op: HiRegOp::Mov,
                rd,
                rm,
            },
            _ if h1 == 0 => Instruction::ThumbBx { rm },
            _ => Instruction::Undefined,
        };
    }

    // PC-relative load (01001) and register-offset load/store (0101).
    Instruction::Unimplemented(Unsupported::ThumbLoadStore)
}
