// License below.
//! Decodes ARM and THUMB state instructions and exposes the semantic
//! queries the analyzer and jump-table recognizers are built on.
//!
//! The opcode tables in [`arm`] and [`thumb`] are a direct generalization of
//! an ARM7TDMI emulator's decoder: same bitmask dispatch, same bitfield
//! accessors, with ALU/register-file evaluation removed since a
//! disassembler never executes an instruction, only names it.
#![warn(missing_docs)]

pub mod condition;
pub mod dpop;
pub mod arm;
pub mod thumb;
mod display;

pub use condition::ArmCondition;
pub use dpop::ArmDpop;
pub use arm::{ArmInstruction, ArmOpcode, ArmLdrhStrhOp};
pub use thumb::{AluShift, HiRegisterOp, LdrhStrhOp, ThumbInstruction, ThumbOpcode};

use crate::error::DisasmError;

/// `R15`, the program counter.
pub const PC: u32 = 15;
/// `R14`, the link register.
pub const LR: u32 = 14;
/// `R13`, the stack pointer.
pub const SP: u32 = 13;

/// The instruction-set mode a code label is decoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 32-bit ARM state.
    Arm,
    /// 16-bit THUMB state.
    Thumb,
}

/// The decoded body of an instruction, tagged by the mode it was read in.
#[derive(Debug, Clone, Copy)]
pub enum Body {
    /// A 32-bit ARM instruction.
    Arm(ArmInstruction),
    /// A 16-bit THUMB instruction.
    Thumb(ThumbInstruction),
}

/// A branch's kind, used by the analyzer to decide how to treat its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Unconditional or conditional branch without link.
    B,
    /// Branch with link (function call), same instruction mode.
    Bl,
    /// Branch with link and exchange, immediate target, switches mode.
    BlxImm,
}

/// An instruction decoded at a particular address.
///
/// Combines the raw [`Body`] with the address it was read from, since most
/// semantic queries (branch targets, pool addresses) are PC-relative.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    address: u32,
    body: Body,
}

impl Instruction {
    /// Decodes a 32-bit ARM instruction at `address`.
    pub fn decode_arm(address: u32, raw: u32) -> Result<Instruction, DisasmError> {
        Ok(Instruction { address, body: Body::Arm(ArmInstruction::decode(raw)?) })
    }

    /// Decodes a 16-bit THUMB instruction at `address`.
    pub fn decode_thumb(address: u32, raw: u16) -> Result<Instruction, DisasmError> {
        Ok(Instruction { address, body: Body::Thumb(ThumbInstruction::decode(raw)?) })
    }

    /// The address this instruction was decoded at.
    pub fn address(&self) -> u32 { self.address }

    /// The instruction's encoded size in bytes (2 or 4).
    pub fn size(&self) -> u32 {
        match self.body { Body::Arm(_) => 4, Body::Thumb(_) => 2 }
    }

    /// The mode this instruction was decoded in.
    pub fn mode(&self) -> Mode {
        match self.body { Body::Arm(_) => Mode::Arm, Body::Thumb(_) => Mode::Thumb }
    }

    /// The decoded body, for rendering.
    pub fn body(&self) -> &Body { &self.body }

    /// Downcasts to the ARM body, if this instruction was decoded as ARM.
    pub fn as_arm(&self) -> Option<&ArmInstruction> {
        match &self.body { Body::Arm(i) => Some(i), _ => None }
    }

    /// Downcasts to the THUMB body, if this instruction was decoded as THUMB.
    pub fn as_thumb(&self) -> Option<&ThumbInstruction> {
        match &self.body { Body::Thumb(t) => Some(t), _ => None }
    }

    /// The condition field, or `AL` for THUMB encodings that carry none.
    pub fn condition(&self) -> ArmCondition {
        match &self.body {
            Body::Arm(i) => i.condition(),
            Body::Thumb(t) => match t.opcode() {
                ThumbOpcode::BranchConditionOffs => t.condition(),
                _ => ArmCondition::AL,
            },
        }
    }

    /// Whether this instruction is some form of branch (`B`, `BL`, `BX`, `BLX`).
    pub fn is_branch(&self) -> bool {
        match &self.body {
            Body::Arm(i) => matches!(i.opcode(),
                ArmOpcode::Bx | ArmOpcode::BlxReg | ArmOpcode::BBl | ArmOpcode::BlxImm),
            Body::Thumb(t) => match t.opcode() {
                ThumbOpcode::BranchConditionOffs | ThumbOpcode::BranchOffs | ThumbOpcode::BranchLongOffs => true,
                ThumbOpcode::HiRegOpBx => t.op_hi_reg_op_bx() == HiRegisterOp::BxRsHs,
                _ => false,
            },
        }
    }

    /// Whether this instruction unconditionally hands control back to the caller:
    /// `BX` (any register) under `AL`, `MOV PC, Rx` under `AL`, an ARM
    /// `LDM`/`POP` whose register list includes `PC` under `AL`, or a THUMB
    /// `POP` that restores `PC` / `MOV PC, Rx`.
    pub fn is_func_return(&self) -> bool {
        match &self.body {
            Body::Arm(i) => match i.opcode() {
                ArmOpcode::Bx => i.condition().is_always(),
                ArmOpcode::DataProcessing =>
                    i.condition().is_always() && i.dpop() == ArmDpop::Mov && i.Rd() == PC,
                ArmOpcode::LdmStm =>
                    i.condition().is_always() && i.is_load() && (i.register_map() & (1 << PC)) != 0,
                _ => false,
            },
            Body::Thumb(t) => match t.opcode() {
                ThumbOpcode::HiRegOpBx => match t.op_hi_reg_op_bx() {
                    HiRegisterOp::BxRsHs => true,
                    HiRegisterOp::MovNoFlags => t.Hd() == PC,
                    _ => false,
                },
                ThumbOpcode::PushPopRegs => t.is_load() && t.is_storing_lr_loading_pc(),
                _ => false,
            },
        }
    }

    /// `BX Rx` with a non-`AL` condition: control may or may not return, so
    /// the analyzer must keep decoding the fallthrough path as well.
    pub fn is_conditional_bx(&self) -> Option<u32> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::Bx && !i.condition().is_always() => Some(i.Rm()),
            _ => None,
        }
    }

    /// Classifies an immediate or register branch, for instructions where
    /// [`Self::is_branch`] holds.
    pub fn branch_kind(&self) -> Option<BranchKind> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::BBl =>
                Some(if i.is_branch_with_link() { BranchKind::Bl } else { BranchKind::B }),
            Body::Arm(i) if i.opcode() == ArmOpcode::BlxImm => Some(BranchKind::BlxImm),
            Body::Thumb(t) => match t.opcode() {
                ThumbOpcode::BranchConditionOffs | ThumbOpcode::BranchOffs => Some(BranchKind::B),
                ThumbOpcode::BranchLongOffs => Some(BranchKind::Bl),
                _ => None,
            },
            _ => None,
        }
    }

    /// The absolute target of an immediate branch, `ADR`, or pool-relative
    /// address computation. `None` for register-indirect forms (`BX Rm`,
    /// `BLX Rm`) and for the low half of a THUMB `BL` pair (which the
    /// analyzer resolves by combining two half-words itself).
    pub fn branch_target(&self) -> Option<u32> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::BBl =>
                Some((self.address as i64 + 8 + i.branch_offset() as i64) as u32),
            Body::Arm(i) if i.opcode() == ArmOpcode::BlxImm =>
                Some((self.address as i64 + 8 + i.blx_offset() as i64) as u32),
            Body::Thumb(t) => match t.opcode() {
                ThumbOpcode::BranchConditionOffs =>
                    Some((self.address as i64 + 4 + t.offs9() as i64) as u32),
                ThumbOpcode::BranchOffs =>
                    Some((self.address as i64 + 4 + t.offs12() as i64) as u32),
                _ => None,
            },
            _ => None,
        }
    }

    /// `BX Rm` / `BLX Rm`, returning the indirection register. Both forms
    /// are register-indirect and carry no statically known target; the
    /// analyzer treats them like any other unresolved branch.
    pub fn bx_reg(&self) -> Option<u32> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::Bx || i.opcode() == ArmOpcode::BlxReg => Some(i.Rm()),
            Body::Thumb(t) if t.opcode() == ThumbOpcode::HiRegOpBx
                && t.op_hi_reg_op_bx() == HiRegisterOp::BxRsHs => Some(t.Hs()),
            _ => None,
        }
    }

    /// `MOV PC, Rm`, returning the source register.
    pub fn mov_pc_reg(&self) -> Option<u32> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::DataProcessing
                && i.dpop() == ArmDpop::Mov && i.Rd() == PC => Some(i.Rm()),
            Body::Thumb(t) if t.opcode() == ThumbOpcode::HiRegOpBx
                && t.op_hi_reg_op_bx() == HiRegisterOp::MovNoFlags && t.Hd() == PC => Some(t.Hs()),
            _ => None,
        }
    }

    /// `LDR Rd, [PC, #disp]`: a literal pool load. Returns `(dest, target)`.
    pub fn pool_load(&self) -> Option<(u32, u32)> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::LdrStr
                && i.Rn() == PC && i.is_load() && !i.is_transfering_bytes()
                && i.is_offset_field_immediate() =>
            {
                let base = (self.address & !0b11).wrapping_add(8);
                Some((i.Rd(), (base as i64 + i.offset12() as i64) as u32))
            }
            Body::Thumb(t) if t.opcode() == ThumbOpcode::LdrPcImm => {
                let base = (self.address & !0b11).wrapping_add(4);
                Some((t.Rm(), (base as i64 + t.imm10() as i64) as u32))
            }
            _ => None,
        }
    }

    /// `ADR Rd, #imm` / ARM `ADD Rd, PC, #imm`: a PC-relative address
    /// materialization that does not dereference memory. Returns `(dest, value)`.
    pub fn adr(&self) -> Option<(u32, u32)> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::DataProcessing
                && i.dpop() == ArmDpop::Add && i.Rn() == PC
                && !i.is_shift_field_register() && !i.is_setting_flags() =>
            {
                Some((i.Rd(), (self.address.wrapping_add(8)).wrapping_add(i.rotated_immediate())))
            }
            Body::Thumb(t) if t.opcode() == ThumbOpcode::CalcAddrImm && !t.is_base_SP() => {
                let base = (self.address & !0b11).wrapping_add(4);
                Some((t.Rm(), (base as i64 + t.imm10() as i64) as u32))
            }
            _ => None,
        }
    }

    /// ARM jump-table dispatch idiom `ADD PC, Rn, Rm, LSL #2`. Returns `(Rn, Rm)`.
    pub fn arm_jump_dispatch(&self) -> Option<(u32, u32)> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::DataProcessing
                && i.dpop() == ArmDpop::Add && i.Rd() == PC
                && i.is_shift_field_register()
                && (i.raw() & (1 << 4)) == 0
                && i.shift_type() == 0
                && i.register_shift_immediate() == 2 =>
            {
                Some((i.Rn(), i.Rm()))
            }
            _ => None,
        }
    }

    /// ARM jump-table entry: an unconditional `B` instruction, returning its target.
    pub fn arm_table_entry_target(&self) -> Option<u32> {
        match &self.body {
            Body::Arm(i) if i.opcode() == ArmOpcode::BBl && !i.is_branch_with_link() =>
                Some((self.address as i64 + 8 + i.branch_offset() as i64) as u32),
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 1: `ADD Rx, Rx, Rx`. Returns `Rx`.
    pub fn thumb_jt_double(&self) -> Option<u32> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::AddSub
                && t.dpop_AddSub() == ArmDpop::Add && !t.is_Rn_immediate()
                && t.Rd() == t.Rs() && t.Rs() == t.Rn() => Some(t.Rd()),
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 2: `ADD Rx, PC`. Returns `Rx`.
    pub fn thumb_jt_add_pc(&self) -> Option<u32> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::HiRegOpBx
                && t.op_hi_reg_op_bx() == HiRegisterOp::AddNoFlags && t.Hs() == PC =>
                Some(t.Hd()),
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 3: `LDRH Rx, [Rx, #disp]`. Returns `(Rx, table_start)`.
    pub fn thumb_jt_ldrh(&self) -> Option<(u32, u32)> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::LdrhStrhImm
                && t.is_load() && t.Rd() == t.Rs() =>
            {
                let start = (self.address as i64 + 2 + t.imm6() as i64) as u32;
                Some((t.Rd(), start))
            }
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 4: `LSL Rx, Rx, #16`. Returns `Rx`.
    pub fn thumb_jt_lsl16(&self) -> Option<u32> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::MoveShiftedReg
                && t.move_shifted_reg_kind() == 0 && t.imm5() == 16 && t.Rd() == t.Rs() =>
                Some(t.Rd()),
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 5: `ASR Rx, Rx, #16`. Returns `Rx`.
    pub fn thumb_jt_asr16(&self) -> Option<u32> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::MoveShiftedReg
                && t.move_shifted_reg_kind() == 2 && t.imm5() == 16 && t.Rd() == t.Rs() =>
                Some(t.Rd()),
            _ => None,
        }
    }

    /// THUMB jump-table idiom step 6: `ADD PC, Rx`. Returns `Rx`.
    pub fn thumb_jt_add_pc_reg(&self) -> Option<u32> {
        match &self.body {
            Body::Thumb(t) if t.opcode() == ThumbOpcode::HiRegOpBx
                && t.op_hi_reg_op_bx() == HiRegisterOp::AddNoFlags && t.Hd() == PC =>
                Some(t.Hs()),
            _ => None,
        }
    }
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
