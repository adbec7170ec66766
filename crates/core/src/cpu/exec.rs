// Tdmi - ARM7TDMI Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::alu::{
    add_with_carry, expand_immediate, shift_by_immediate, shift_by_register, Shifted,
};
use super::arm7tdmi::Arm7Tdmi;
use super::psr::Psr;
use super::{LR, PC};
use crate::decoder::{
    Addressing, AluOp, Decoded, HalfOffset, HalfwordKind, HiRegOp, Instruction, MsrSource, Offset,
    Operand2, ShiftKind, ThumbAluOp, ThumbImmOp, ThumbOperand,
};
use crate::{Bus, SimResult, SimulationConfig, SimulationError, UnimplementedPolicy};

impl Arm7Tdmi {
    pub(super) fn execute(
        &mut self,
        decoded: &Decoded,
        addr: u32,
        bus: &mut dyn Bus,
        config: &SimulationConfig,
    ) -> SimResult<()> {
        match decoded.instruction {
            Instruction::DataProcessing {
                op,
                s,
                rn,
                rd,
                operand,
            } => self.exec_data_processing(op, s, rn, rd, operand)?,
            Instruction::Mrs { rd, spsr } => {
                let value = if spsr { self.spsr()? } else { self.cpsr() };
                self.regs[rd as usize] = value;
            }
            Instruction::Msr { spsr, mask, source } => {
                let value = match source {
                    MsrSource::Immediate { imm8, rotate } => expand_immediate(imm8, rotate).0,
                    MsrSource::Register(rm) => self.regs[rm as usize],
                };
                if spsr {
                    self.write_saved_status(value, mask)?;
                } else {
                    self.write_current_status(value, mask, false)?;
                }
            }
            Instruction::Bx { rm } => {
                let target = self.regs[rm as usize];
                if target & 1 != 0 {
                    self.cpsr.insert(Psr::T);
                    tracing::info!("BX to THUMB at {:#x}", target & !1);
                }
                self.branch_to(target);
            }
            Instruction::Branch { link, offset } => {
                if link {
                    let ws = self.word_size();
                    self.regs[LR as usize] = addr.wrapping_add(ws);
                }
                let target = self.regs[15].wrapping_add(offset as u32);
                self.branch_to(target);
            }
            Instruction::Multiply {
                accumulate,
                s,
                rd,
                rn,
                rs,
                rm,
            } => {
                let mut result = self.regs[rm as usize].wrapping_mul(self.regs[rs as usize]);
                if accumulate {
                    result = result.wrapping_add(self.regs[rn as usize]);
                }
                self.regs[rd as usize] = result;
                if s {
                    self.set_nz(result);
                }
            }
            Instruction::MultiplyLong {
                signed,
                accumulate,
                s,
                rd_hi,
                rd_lo,
                rs,
                rm,
            } => {
                let (a, b) = (self.regs[rm as usize], self.regs[rs as usize]);
                let mut result = if signed {
                    (a as i32 as i64).wrapping_mul(b as i32 as i64) as u64
                } else {
                    (a as u64) * (b as u64)
                };
                if accumulate {
                    let acc =
                        ((self.regs[rd_hi as usize] as u64) << 32) | self.regs[rd_lo as usize] as u64;
                    result = result.wrapping_add(acc);
                }
                self.regs[rd_lo as usize] = result as u32;
                self.regs[rd_hi as usize] = (result >> 32) as u32;
                if s {
                    self.cpsr.set(Psr::N, result >> 63 != 0);
                    self.cpsr.set(Psr::Z, result == 0);
                }
            }
            Instruction::Swap { byte, rn, rd, rm } => {
                let address = self.regs[rn as usize];
                let source = self.regs[rm as usize];
                let loaded = if byte {
                    let old = bus.read_u8(address)? as u32;
                    bus.write_u8(address, source as u8)?;
                    old
                } else {
                    let old = bus.read_u32(address)?;
                    bus.write_u32(address, source)?;
                    old
                };
                self.load_result(rd, loaded);
            }
            Instruction::SingleTransfer {
                load,
                byte,
                addressing,
                rn,
                rd,
                offset,
            } => {
                let offset = match offset {
                    Offset::Immediate(value) => value,
                    Offset::Register { rm, shift, amount } => {
                        let carry = self.cpsr.contains(Psr::C);
                        shift_by_immediate(shift, self.regs[rm as usize], amount as u32, carry).0
                    }
                };
                let (address, writeback) = self.transfer_address(rn, offset, addressing);
                if load {
                    let value = if byte {
                        bus.read_u8(address)? as u32
                    } else {
                        bus.read_u32(address)?
                    };
                    self.write_back(rn, writeback);
                    self.load_result(rd, value);
                } else {
                    let value = self.store_value(rd);
                    if byte {
                        bus.write_u8(address, value as u8)?;
                    } else {
                        bus.write_u32(address, value)?;
                    }
                    self.write_back(rn, writeback);
                }
            }
            Instruction::HalfwordTransfer {
                load,
                kind,
                addressing,
                rn,
                rd,
                offset,
            } => {
                let offset = match offset {
                    HalfOffset::Immediate(value) => value,
                    HalfOffset::Register(rm) => self.regs[rm as usize],
                };
                let (address, writeback) = self.transfer_address(rn, offset, addressing);
                if load {
                    let value = match kind {
                        HalfwordKind::Unsigned => bus.read_u16(address)? as u32,
                        HalfwordKind::SignedByte => bus.read_u8(address)? as i8 as i32 as u32,
                        HalfwordKind::SignedHalf => bus.read_u16(address)? as i16 as i32 as u32,
                    };
                    self.write_back(rn, writeback);
                    self.load_result(rd, value);
                } else {
                    let value = self.store_value(rd);
                    bus.write_u16(address, value as u16)?;
                    self.write_back(rn, writeback);
                }
            }

            Instruction::ThumbShift {
                shift,
                rd,
                rm,
                imm5,
            } => {
                let carry = self.cpsr.contains(Psr::C);
                let (result, carry_out) =
                    shift_by_immediate(shift, self.regs[rm as usize], imm5 as u32, carry);
                self.regs[rd as usize] = result;
                if self.thumb_sets_flags() {
                    self.set_nzc(result, carry_out);
                }
            }
            Instruction::ThumbAddSub {
                sub,
                rd,
                rn,
                operand,
            } => {
                let rhs = match operand {
                    ThumbOperand::Register(rm) => self.regs[rm as usize],
                    ThumbOperand::Immediate(imm) => imm as u32,
                };
                let lhs = self.regs[rn as usize];
                let (result, carry, overflow) = if sub {
                    add_with_carry(lhs, !rhs, true)
                } else {
                    add_with_carry(lhs, rhs, false)
                };
                self.regs[rd as usize] = result;
                if self.thumb_sets_flags() {
                    self.set_nzcv(result, carry, overflow);
                }
            }
            Instruction::ThumbImm { op, rd, imm8 } => {
                let lhs = self.regs[rd as usize];
                let imm = imm8 as u32;
                let flags = self.thumb_sets_flags();
                match op {
                    ThumbImmOp::Mov => {
                        self.regs[rd as usize] = imm;
                        if flags {
                            self.set_nz(imm);
                        }
                    }
                    ThumbImmOp::Cmp => {
                        let (result, carry, overflow) = add_with_carry(lhs, !imm, true);
                        self.set_nzcv(result, carry, overflow);
                    }
                    ThumbImmOp::Add | ThumbImmOp::Sub => {
                        let (result, carry, overflow) = if op == ThumbImmOp::Add {
                            add_with_carry(lhs, imm, false)
                        } else {
                            add_with_carry(lhs, !imm, true)
                        };
                        self.regs[rd as usize] = result;
                        if flags {
                            self.set_nzcv(result, carry, overflow);
                        }
                    }
                }
            }
            Instruction::ThumbAlu { op, rd, rm } => self.exec_thumb_alu(op, rd, rm),
            Instruction::ThumbHiReg { op, rd, rm } => {
                let rhs = self.regs[rm as usize];
                match op {
                    HiRegOp::Add => {
                        let result = self.regs[rd as usize].wrapping_add(rhs);
                        self.load_result(rd, result);
                    }
                    HiRegOp::Cmp => {
                        let (result, carry, overflow) =
                            add_with_carry(self.regs[rd as usize], !rhs, true);
                        self.set_nzcv(result, carry, overflow);
                    }
                    HiRegOp::Mov => self.load_result(rd, rhs),
                }
            }
            Instruction::ThumbBx { rm } => {
                // No state switch from THUMB through this path.
                let target = self.regs[rm as usize];
                self.branch_to(target);
            }
            Instruction::ThumbBranch { offset } => {
                let target = self.regs[15].wrapping_add(offset as u32);
                self.branch_to(target);
            }
            Instruction::ThumbBlHigh { offset } => {
                self.regs[LR as usize] = self.regs[15].wrapping_add((offset << 12) as u32);
            }
            Instruction::ThumbBlLow { offset } => {
                let next = addr.wrapping_add(2);
                let target = self.regs[LR as usize].wrapping_add(offset << 1);
                self.regs[LR as usize] = next | 1;
                self.branch_to(target);
            }

            Instruction::Unimplemented(class) => match config.unimplemented {
                UnimplementedPolicy::Fault => {
                    return Err(SimulationError::Unimplemented {
                        pc: addr,
                        opcode: decoded.raw,
                        class: class.name(),
                    });
                }
                UnimplementedPolicy::Skip => {
                    tracing::warn!(
                        "Skipping unimplemented {} instruction {:#010x} at {:#x}",
                        class.name(),
                        decoded.raw,
                        addr
                    );
                }
            },
            Instruction::Undefined => {
                return Err(SimulationError::UndefinedInstruction {
                    pc: addr,
                    opcode: decoded.raw,
                });
            }
        }
        Ok(())
    }

    fn exec_data_processing(
        &mut self,
        op: AluOp,
        s: bool,
        rn: u8,
        rd: u8,
        operand: Operand2,
    ) -> SimResult<()> {
        // C as it was before the shifter ran; ADC/SBC/RSC consume this value.
        let carry_in = self.cpsr.contains(Psr::C);
        let (op2, shifter_carry) = self.resolve_operand2(operand, carry_in);
        let op1 = if op.uses_rn() {
            self.regs[rn as usize]
        } else {
            0
        };

        let (result, carry, overflow) = if op.is_logical() {
            let r = match op {
                AluOp::And | AluOp::Tst => op1 & op2,
                AluOp::Eor | AluOp::Teq => op1 ^ op2,
                AluOp::Orr => op1 | op2,
                AluOp::Bic => op1 & !op2,
                AluOp::Mvn => !op2,
                _ => op2, // MOV
            };
            (r, shifter_carry, None)
        } else {
            let (x, y, c) = match op {
                AluOp::Sub | AluOp::Cmp => (op1, !op2, true),
                AluOp::Rsb => (op2, !op1, true),
                AluOp::Add | AluOp::Cmn => (op1, op2, false),
                AluOp::Adc => (op1, op2, carry_in),
                AluOp::Sbc => (op1, !op2, carry_in),
                _ => (op2, !op1, carry_in), // RSC
            };
            let (r, c, v) = add_with_carry(x, y, c);
            (r, Some(c), Some(v))
        };

        // Flag writes are suppressed when the destination is the PC.
        if op.is_test() || (s && rd != PC) {
            self.cpsr.set(Psr::N, result >> 31 != 0);
            self.cpsr.set(Psr::Z, result == 0);
            if let Some(c) = carry {
                self.cpsr.set(Psr::C, c);
            }
            if let Some(v) = overflow {
                self.cpsr.set(Psr::V, v);
            }
        }

        if !op.is_test() {
            self.write_result(rd, result)?;
        }
        Ok(())
    }

    fn resolve_operand2(&self, operand: Operand2, carry_in: bool) -> Shifted {
        match operand {
            Operand2::Immediate { imm8, rotate } => expand_immediate(imm8, rotate),
            Operand2::ShiftImm { rm, shift, amount } => {
                shift_by_immediate(shift, self.regs[rm as usize], amount as u32, carry_in)
            }
            Operand2::ShiftReg { rm, shift, rs } => {
                shift_by_register(shift, self.regs[rm as usize], self.regs[rs as usize])
            }
        }
    }

    fn exec_thumb_alu(&mut self, op: ThumbAluOp, rd: u8, rm: u8) {
        let a = self.regs[rd as usize];
        let b = self.regs[rm as usize];
        let carry_in = self.cpsr.contains(Psr::C);
        let flags = self.thumb_sets_flags();

        let shift = |kind: ShiftKind| shift_by_register(kind, a, b);
        let (result, carry, overflow, writes_rd): (u32, Option<bool>, Option<bool>, bool) = match op
        {
            ThumbAluOp::And => (a & b, None, None, true),
            ThumbAluOp::Eor => (a ^ b, None, None, true),
            ThumbAluOp::Orr => (a | b, None, None, true),
            ThumbAluOp::Bic => (a & !b, None, None, true),
            ThumbAluOp::Mvn => (!b, None, None, true),
            ThumbAluOp::Mul => (b.wrapping_mul(a), None, None, true),
            ThumbAluOp::Tst => (a & b, None, None, false),
            ThumbAluOp::Lsl | ThumbAluOp::Lsr | ThumbAluOp::Asr | ThumbAluOp::Ror => {
                let kind = match op {
                    ThumbAluOp::Lsl => ShiftKind::Lsl,
                    ThumbAluOp::Lsr => ShiftKind::Lsr,
                    ThumbAluOp::Asr => ShiftKind::Asr,
                    _ => ShiftKind::Ror,
                };
                let (r, c) = shift(kind);
                (r, c, None, true)
            }
            _ => {
                let (x, y, c, writes) = match op {
                    ThumbAluOp::Adc => (a, b, carry_in, true),
                    ThumbAluOp::Sbc => (a, !b, carry_in, true),
                    ThumbAluOp::Neg => (0, !b, true, true),
                    ThumbAluOp::Cmp => (a, !b, true, false),
                    _ => (a, b, false, false), // CMN
                };
                let (r, c, v) = add_with_carry(x, y, c);
                (r, Some(c), Some(v), writes)
            }
        };

        if writes_rd {
            self.regs[rd as usize] = result;
        }
        // Compare and test always write flags.
        if flags || !writes_rd {
            self.set_nzc(result, carry);
            if let Some(v) = overflow {
                self.cpsr.set(Psr::V, v);
            }
        }
    }

    /// Result write for data processing. Writing the PC is an exception return:
    /// CPSR is restored from the current mode's SPSR before the jump.
    pub(super) fn write_result(&mut self, rd: u8, value: u32) -> SimResult<()> {
        if rd != PC {
            self.regs[rd as usize] = value;
            return Ok(());
        }
        if let Ok(saved) = self.spsr() {
            self.write_current_status(saved, 0b1111, true)?;
            tracing::info!(
                "Exception return to {:#x}, mode {}",
                value & self.pc_mask(),
                self.mode()
            );
        }
        self.branch_to(value);
        Ok(())
    }

    /// Loads and THUMB high-register writes into the PC are plain jumps.
    fn load_result(&mut self, rd: u8, value: u32) {
        if rd == PC {
            self.branch_to(value);
        } else {
            self.regs[rd as usize] = value;
        }
    }

    /// A stored PC reads one word further ahead than an operand PC.
    fn store_value(&self, rd: u8) -> u32 {
        if rd == PC {
            self.regs[15].wrapping_add(self.word_size())
        } else {
            self.regs[rd as usize]
        }
    }

    /// Effective address of a transfer and the base value to write back, if any.
    /// Writeback is committed only after the access succeeds; a loaded value
    /// for Rd == Rn overrides it.
    fn transfer_address(
        &self,
        rn: u8,
        offset: u32,
        addressing: Addressing,
    ) -> (u32, Option<u32>) {
        let base = if rn == PC {
            self.regs[15] & !3
        } else {
            self.regs[rn as usize]
        };
        let indexed = if addressing.up {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        // Post-indexing always writes back; the PC base never does.
        let writeback = (rn != PC && (!addressing.pre || addressing.writeback)).then_some(indexed);
        let address = if addressing.pre { indexed } else { base };
        (address, writeback)
    }

    fn write_back(&mut self, rn: u8, writeback: Option<u32>) {
        if let Some(value) = writeback {
            self.regs[rn as usize] = value;
        }
    }

    pub(super) fn branch_to(&mut self, target: u32) {
        self.regs[15] = target & self.pc_mask();
        self.pc_written = true;
    }

    fn thumb_sets_flags(&self) -> bool {
        !self.in_it_block()
    }

    fn set_nz(&mut self, result: u32) {
        self.cpsr.set(Psr::N, result >> 31 != 0);
        self.cpsr.set(Psr::Z, result == 0);
    }

    fn set_nzc(&mut self, result: u32, carry: Option<bool>) {
        self.set_nz(result);
        if let Some(c) = carry {
            self.cpsr.set(Psr::C, c);
        }
    }

    fn set_nzcv(&mut self, result: u32, carry: bool, overflow: bool) {
        self.set_nz(result);
        self.cpsr.set(Psr::C, carry);
        self.cpsr.set(Psr::V, overflow);
    }
}
