// License below.
//! Renders decoded instructions as GNU-assembler syntax text.
//!
//! Branch targets, pool loads, and PC-relative address materializations are
//! *not* resolved to symbols here — that requires the label store, which
//! this module has no access to. The renderer special-cases those
//! instructions itself and only falls back to this `Display` impl for
//! everything else, the same split the teacher's own per-opcode `fmt_xxx`
//! helpers followed.
#![warn(missing_docs)]

use std::fmt;

use super::arm::{ArmInstruction, ArmLdrhStrhOp, ArmOpcode};
use super::thumb::{AluShift, HiRegisterOp, LdrhStrhOp, ThumbInstruction, ThumbOpcode};
use super::{Body, Instruction};

const REGISTER_NAMES: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7",
    "r8", "r9", "r10", "r11", "r12", "sp", "lr", "pc",
];

fn reg_name(i: u32) -> &'static str {
    REGISTER_NAMES.get(i as usize).copied().unwrap_or("r?")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.body {
            Body::Arm(i) => i.fmt(f),
            Body::Thumb(t) => t.fmt(f),
        }
    }
}

impl fmt::Display for ArmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cond = self.condition().assembly_name();
        match self.op {
            ArmOpcode::Unknown => write!(f, ".word {:#010X} @ undefined instruction", self.raw()),
            ArmOpcode::Swi => write!(f, "swi{}\t{:#X}", cond, self.comment()),
            ArmOpcode::Bx     => write!(f, "bx{}\t{}", cond, reg_name(self.Rm())),
            ArmOpcode::BlxReg => write!(f, "blx\t{}", reg_name(self.Rm())),
            ArmOpcode::BBl    => write!(f, "{}{}\t#{}",
                if self.is_branch_with_link() { "bl" } else { "b" }, cond, self.branch_offset()),
            ArmOpcode::BlxImm => write!(f, "blx\t#{}", self.blx_offset()),
            ArmOpcode::Mrs => write!(f, "mrs{}\t{}, {}", cond, reg_name(self.Rd()), psr_name(self)),
            ArmOpcode::MsrReg => write!(f, "msr{}\t{}, {}", cond, psr_name(self), reg_name(self.Rm())),
            ArmOpcode::MsrFlags => {
                write!(f, "msr{}\t{}_flg, ", cond, psr_name(self))?;
                if self.is_shift_field_register() { write!(f, "{}", reg_name(self.Rm())) }
                else { write!(f, "{:#010X}", self.rotated_immediate()) }
            }
            ArmOpcode::Swp => write!(f, "swp{}{}\t{}, {}, [{}]",
                if self.is_transfering_bytes() { "b" } else { "" }, cond,
                reg_name(self.Rd()), reg_name(self.Rm()), reg_name(self.Rn())),
            ArmOpcode::Cdp => write!(f, "cdp{}\tp{}, {}, cr{}, cr{}, cr{}, {}",
                cond, self.cp_id(), self.cp_opcode4(), self.Rd(), self.Rn(), self.Rm(), self.cp_info()),
            ArmOpcode::MrcMcr => write!(f, "{}{}\tp{}, {}, {}, cr{}, cr{}, {}",
                if self.is_load() { "mrc" } else { "mcr" }, cond,
                self.cp_id(), self.cp_opcode3(), reg_name(self.Rd()), self.Rn(), self.Rm(), self.cp_info()),
            ArmOpcode::LdcStc => write!(f, "{}{}{}\tp{}, cr{}, [{}{}, #{}{}{}",
                if self.is_load() { "ldc" } else { "stc" },
                if self.is_long_coprocessor_transfer() { "l" } else { "" }, cond,
                self.cp_id(), self.Rd(), reg_name(self.Rn()),
                if self.is_pre_indexed() { "" } else { "]" }, self.offset8(),
                if self.is_pre_indexed() { "]" } else { "" },
                if self.is_auto_incrementing() { "!" } else { "" }),
            ArmOpcode::LdrhStrhReg => write!(f, "{}{}{}\t{}, [{}{}, {}{}{}{}",
                if self.is_load() { "ldr" } else { "str" }, ldrh_strh_suffix(self), cond,
                reg_name(self.Rd()), reg_name(self.Rn()),
                if self.is_pre_indexed() { "" } else { "]" },
                if self.is_offset_added() { "" } else { "-" }, reg_name(self.Rm()),
                if self.is_pre_indexed() { "]" } else { "" },
                if self.is_auto_incrementing() { "!" } else { "" }),
            ArmOpcode::LdrhStrhImm => write!(f, "{}{}{}\t{}, [{}{}, #{}{}{}",
                if self.is_load() { "ldr" } else { "str" }, ldrh_strh_suffix(self), cond,
                reg_name(self.Rd()), reg_name(self.Rn()),
                if self.is_pre_indexed() { "" } else { "]" }, self.split_offset8(),
                if self.is_pre_indexed() { "]" } else { "" },
                if self.is_auto_incrementing() { "!" } else { "" }),
            ArmOpcode::LdrStr => {
                write!(f, "{}{}{}{}\t{}, ",
                    if self.is_load() { "ldr" } else { "str" },
                    if self.is_transfering_bytes() { "b" } else { "" }, cond,
                    if !self.is_pre_indexed() && self.is_auto_incrementing() { "t" } else { "" },
                    reg_name(self.Rd()))?;
                fmt_ldr_str_offset(self, f)
            }
            ArmOpcode::LdmStm => {
                write!(f, "{}{}{}{}\t{}{}, ",
                    if self.is_load() { "ldm" } else { "stm" },
                    if self.is_offset_added() { "i" } else { "d" },
                    if self.is_pre_indexed()  { "b" } else { "a" }, cond,
                    reg_name(self.Rn()), if self.is_auto_incrementing() { "!" } else { "" })?;
                fmt_register_list(self.register_map(), f)
            }
            ArmOpcode::MulMla => {
                write!(f, "{}{}{}\t{}, {}, {}",
                    if self.is_accumulating() { "mla" } else { "mul" },
                    if self.is_setting_flags() { "s" } else { "" }, cond,
                    reg_name(self.Rn()), reg_name(self.Rm()), reg_name(self.Rs()))?;
                if self.is_accumulating() { write!(f, ", {}", reg_name(self.Rd())) } else { Ok(()) }
            }
            ArmOpcode::MullMlal => write!(f, "{}{}{}{}\t{}, {}, {}, {}",
                if self.is_signed() { "s" } else { "u" },
                if self.is_accumulating() { "mlal" } else { "mull" },
                if self.is_setting_flags() { "s" } else { "" }, cond,
                reg_name(self.Rd()), reg_name(self.Rn()), reg_name(self.Rm()), reg_name(self.Rs())),
            ArmOpcode::DataProcessing => {
                let op = self.dpop();
                write!(f, "{}{}{}\t", op, cond, if self.is_setting_flags() && !op.is_test() { "s" } else { "" })?;
                if !op.is_test() { write!(f, "{}, ", reg_name(self.Rd()))?; }
                if !op.is_move() { write!(f, "{}, ", reg_name(self.Rn()))?; }
                fmt_shift_operand(self, f)
            }
        }
    }
}

fn psr_name(i: &ArmInstruction) -> &'static str { if i.is_accessing_spsr() { "spsr" } else { "cpsr" } }

fn ldrh_strh_suffix(i: &ArmInstruction) -> &'static str {
    match i.ldrh_strh_op() {
        ArmLdrhStrhOp::InvalidSWP => "?",
        ArmLdrhStrhOp::Uh => "h",
        ArmLdrhStrhOp::Sb => "sb",
        ArmLdrhStrhOp::Sh => "sh",
    }
}

fn fmt_ldr_str_offset(i: &ArmInstruction, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "[{}{}", reg_name(i.Rn()), if i.is_pre_indexed() { "" } else { "]" })?;
    if i.is_offset_field_immediate() {
        write!(f, ", #{}", i.offset12())?;
    } else {
        write!(f, ", {}{}", if i.is_offset_added() { "" } else { "-" }, shift_operand_text(i))?;
    }
    if i.is_pre_indexed() { write!(f, "]")?; }
    if i.is_auto_incrementing() { write!(f, "!")?; }
    Ok(())
}

fn fmt_shift_operand(i: &ArmInstruction, f: &mut fmt::Formatter) -> fmt::Result {
    if i.is_shift_field_register() { write!(f, "{}", shift_operand_text(i)) }
    else { write!(f, "#{}", i.rotated_immediate()) }
}

fn shift_operand_text(i: &ArmInstruction) -> String {
    let rm = reg_name(i.Rm());
    let kind = match i.shift_type() { 0 => "lsl", 1 => "lsr", 2 => "asr", _ => "ror" };
    if (i.raw() & (1 << 4)) == 0 {
        let amount = i.register_shift_immediate();
        if amount == 0 && i.shift_type() == 0 { rm.to_string() }
        else if amount == 0 && i.shift_type() == 3 { format!("{}, rrx", rm) }
        else { format!("{}, {} #{}", rm, kind, amount) }
    } else {
        format!("{}, {} {}", rm, kind, reg_name(i.Rs()))
    }
}

fn fmt_register_list(map: u16, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{{")?;
    let mut any = false;
    for i in 0..16u32 {
        if 0 != (map & (1 << i)) {
            if any { write!(f, ", ")?; }
            any = true;
            write!(f, "{}", reg_name(i))?;
        }
    }
    write!(f, "}}")
}

impl fmt::Display for ThumbInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op {
            ThumbOpcode::AddSub => {
                let rd = reg_name(self.Rd());
                let rs = reg_name(self.Rs());
                write!(f, "{}s\t{}, {}, ", self.dpop_AddSub(), rd, rs)?;
                if self.is_Rn_immediate() { write!(f, "#{}", self.Rn()) }
                else { write!(f, "{}", reg_name(self.Rn())) }
            }
            ThumbOpcode::MoveShiftedReg => {
                let rd = reg_name(self.Rd());
                let rs = reg_name(self.Rs());
                let op = match self.move_shifted_reg_kind() { 0 => "lsl", 1 => "lsr", _ => "asr" };
                write!(f, "{}s\t{}, {}, #{}", op, rd, rs, self.imm5())
            }
            ThumbOpcode::DataProcessingFlags => {
                let rd = reg_name(self.Rm());
                let op = self.dpop_data_processing_flags();
                let suffix = if op == super::ArmDpop::Cmp { "" } else { "s" };
                write!(f, "{}{}\t{}, #{}", op, suffix, rd, self.imm8())
            }
            ThumbOpcode::AluMul => write!(f, "muls\t{}, {}", reg_name(self.Rd()), reg_name(self.Rs())),
            ThumbOpcode::AluOperation => {
                let (dpop, shift) = self.dpop_shift_alu_operation();
                let rd = reg_name(self.Rd());
                let rs = reg_name(self.Rs());
                match shift {
                    AluShift::None if dpop == super::ArmDpop::Rsb => write!(f, "negs\t{}, {}", rd, rs),
                    AluShift::None => {
                        let suffix = if dpop.is_test() { "" } else { "s" };
                        write!(f, "{}{}\t{}, {}", dpop, suffix, rd, rs)
                    }
                    AluShift::Lsl => write!(f, "lsls\t{}, {}", rd, rs),
                    AluShift::Lsr => write!(f, "lsrs\t{}, {}", rd, rs),
                    AluShift::Asr => write!(f, "asrs\t{}, {}", rd, rs),
                    AluShift::Ror => write!(f, "rors\t{}, {}", rd, rs),
                }
            }
            ThumbOpcode::HiRegOpBx => {
                let hd = reg_name(self.Hd());
                let hs = reg_name(self.Hs());
                match self.op_hi_reg_op_bx() {
                    HiRegisterOp::AddNoFlags => write!(f, "add\t{}, {}", hd, hs),
                    HiRegisterOp::CmpFlags   => write!(f, "cmp\t{}, {}", hd, hs),
                    HiRegisterOp::MovNoFlags => write!(f, "mov\t{}, {}", hd, hs),
                    HiRegisterOp::BxRsHs     => write!(f, "bx\t{}", hs),
                }
            }
            ThumbOpcode::LdrPcImm => write!(f, "ldr\t{}, [pc, #{}]", reg_name(self.Rm()), self.imm10()),
            ThumbOpcode::LdrStrReg => write!(f, "{}{}\t{}, [{}, {}]",
                if self.is_load() { "ldr" } else { "str" },
                if self.is_transfering_bytes() { "b" } else { "" },
                reg_name(self.Rd()), reg_name(self.Rs()), reg_name(self.Rn())),
            ThumbOpcode::LdrhStrhReg => {
                let op = match self.op_ldrh_strh_reg() {
                    LdrhStrhOp::Strh => "strh", LdrhStrhOp::Ldrh => "ldrh",
                    LdrhStrhOp::Ldsb => "ldsb", LdrhStrhOp::Ldsh => "ldsh",
                };
                write!(f, "{}\t{}, [{}, {}]", op, reg_name(self.Rd()), reg_name(self.Rs()), reg_name(self.Rn()))
            }
            ThumbOpcode::LdrStrImm => write!(f, "{}{}\t{}, [{}, #{}]",
                if self.is_load() { "ldr" } else { "str" },
                if self.is_transfering_bytes_imm() { "b" } else { "" },
                reg_name(self.Rd()), reg_name(self.Rs()),
                if self.is_transfering_bytes_imm() { self.imm5() } else { self.imm7() }),
            ThumbOpcode::LdrhStrhImm => write!(f, "{}\t{}, [{}, #{}]",
                if self.is_load() { "ldrh" } else { "strh" },
                reg_name(self.Rd()), reg_name(self.Rs()), self.imm6()),
            ThumbOpcode::LdrStrSpImm => write!(f, "{}\t{}, [sp, #{}]",
                if self.is_load() { "ldr" } else { "str" }, reg_name(self.Rm()), self.imm10()),
            ThumbOpcode::CalcAddrImm => write!(f, "add\t{}, {}, #{}",
                reg_name(self.Rm()), if self.is_base_SP() { "sp" } else { "pc" }, self.imm10()),
            ThumbOpcode::AddSpOffs => write!(f, "add\tsp, #{}", self.offs9()),
            ThumbOpcode::PushPopRegs => {
                write!(f, "{}\t", if self.is_load() { "pop" } else { "push" })?;
                let with_reg = if self.is_storing_lr_loading_pc() {
                    Some(if self.is_load() { 15u32 } else { 14u32 })
                } else { None };
                fmt_thumb_register_list(self.register_list(), with_reg, f)
            }
            ThumbOpcode::LdmStmRegs => {
                write!(f, "{}\t{}!, ", if self.is_load() { "ldmia" } else { "stmia" }, reg_name(self.Rm()))?;
                fmt_thumb_register_list(self.register_list(), None, f)
            }
            ThumbOpcode::SoftwareInterrupt => write!(f, "swi\t{:#X}", self.comment()),
            ThumbOpcode::BranchConditionOffs => write!(f, "b{}\t#{}", self.condition().assembly_name(), self.offs9()),
            ThumbOpcode::BranchOffs => write!(f, "b\t#{}", self.offs12()),
            ThumbOpcode::BranchLongOffs => {
                let offs = self.long_offs_part();
                if self.is_low_offset_and_branch() { write!(f, "bl\t#{:#06X} @ low half", offs << 1) }
                else { write!(f, "bl\t#{:#06X} @ high half", (offs << 21) >> 10) }
            }
        }
    }
}

fn fmt_thumb_register_list(regs: u8, with_reg: Option<u32>, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{{")?;
    let mut any = false;
    for i in 0..8u32 {
        if 0 != (regs & (1 << i)) {
            if any { write!(f, ", ")?; }
            any = true;
            write!(f, "{}", reg_name(i))?;
        }
    }
    if let Some(r) = with_reg {
        if any { write!(f, ", ")?; }
        write!(f, "{}", reg_name(r))?;
    }
    write!(f, "}}")
}

/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/
