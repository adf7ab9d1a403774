// License below.
//! The two jump-table dispatch idioms a compiler emits for a `switch`: an
//! ARM dialect (`ADD PC, Rx, Ry, LSL #2` followed by a run of `B` entries)
//! and a THUMB dialect (a six-instruction dance ending in `ADD PC, Rx`).
//!
//! Each recognizer is an explicit tagged state machine fed one decoded
//! instruction at a time by the analyzer, mirroring the bitmask-dispatch
//! opcode tables in [`crate::decode`] in spirit: a closed set of states
//! checked in order, no backtracking over already-consumed instructions.
#![warn(missing_docs)]

use crate::decode::{BranchKind, Instruction};

/// Drives the ARM jump-table idiom: `ADD PC, Rn, Rm, LSL #2` followed, on
/// the very next decoded instruction, by an unconditional `B` (which doubles
/// as the table's first entry) or a function-return.
///
/// No grace period on this side — the two steps are adjacent in every
/// compiler output this idiom has been observed in, so a single mismatch
/// is treated as "this was never a dispatch" rather than noise to absorb.
#[derive(Debug, Clone, Copy)]
pub struct ArmJumpTableRecognizer {
    awaiting_confirm: bool,
}

impl ArmJumpTableRecognizer {
    /// A recognizer with no dispatch pending.
    pub fn new() -> ArmJumpTableRecognizer {
        ArmJumpTableRecognizer { awaiting_confirm: false }
    }

    /// Clears any in-progress match. Called at the start of every label's
    /// decode, since a dispatch idiom never spans two labels.
    pub fn reset(&mut self) {
        self.awaiting_confirm = false;
    }

    /// Feeds the next decoded instruction. Returns the table's start
    /// address the instant the idiom is confirmed: one instruction past the
    /// confirming `b default` itself, since that branch doubles as the
    /// dispatch's fallthrough rather than the table's first entry.
    pub fn observe(&mut self, instr: &Instruction) -> Option<u32> {
        if self.awaiting_confirm {
            self.awaiting_confirm = false;
            let confirmed = instr.is_func_return()
                || (instr.branch_kind() == Some(BranchKind::B) && instr.condition().is_always());
            if confirmed {
                return Some(instr.address() + 4);
            }
            // Not actually a dispatch; fall through and let this same
            // instruction start a fresh match below.
        }

        if instr.arm_jump_dispatch().is_some() {
            self.awaiting_confirm = true;
        }
        None
    }
}

impl Default for ArmJumpTableRecognizer {
    fn default() -> ArmJumpTableRecognizer { ArmJumpTableRecognizer::new() }
}

/// Drives the THUMB jump-table idiom, a fixed six-step sequence on a single
/// register `Rx`:
///
/// 1. `ADD Rx, Rx, Rx` (double, turning a byte case index into a half-word one)
/// 2. `ADD Rx, PC`
/// 3. `LDRH Rx, [Rx, #disp]` (the displacement names the table's start)
/// 4. `LSL Rx, Rx, #16`
/// 5. `ASR Rx, Rx, #16` (sign-extends the loaded displacement)
/// 6. `ADD PC, Rx`
///
/// An arbitrary instruction may intrude once between two expected steps
/// (compilers sometimes interleave an unrelated load or register shuffle);
/// a second consecutive mismatch resets the machine. The intruding
/// instruction is itself re-checked as a possible step 1 of a new idiom, so
/// back-to-back switches are not missed.
#[derive(Debug, Clone, Copy)]
pub struct ThumbJumpTableRecognizer {
    step: u8,
    reg: u32,
    table_start: u32,
    grace_used: bool,
}

impl ThumbJumpTableRecognizer {
    /// A recognizer waiting for step 1.
    pub fn new() -> ThumbJumpTableRecognizer {
        ThumbJumpTableRecognizer { step: 0, reg: 0, table_start: 0, grace_used: false }
    }

    /// Resets to waiting-for-step-1, as at the start of every label's decode.
    pub fn reset(&mut self) {
        *self = ThumbJumpTableRecognizer::new();
    }

    /// Feeds the next decoded instruction. Returns the table's start
    /// address the instant step 6 is confirmed.
    pub fn observe(&mut self, instr: &Instruction) -> Option<u32> {
        let matched = match self.step {
            0 => instr.thumb_jt_double().map(|rx| { self.reg = rx; }).is_some(),
            1 => instr.thumb_jt_add_pc() == Some(self.reg),
            2 => instr.thumb_jt_ldrh().filter(|&(rx, _)| rx == self.reg)
                .map(|(_, start)| { self.table_start = start; }).is_some(),
            3 => instr.thumb_jt_lsl16() == Some(self.reg),
            4 => instr.thumb_jt_asr16() == Some(self.reg),
            5 => instr.thumb_jt_add_pc_reg() == Some(self.reg),
            _ => false,
        };

        if matched {
            self.grace_used = false;
            if self.step == 5 {
                let start = self.table_start;
                self.reset();
                return Some(start);
            }
            self.step += 1;
            return None;
        }

        if self.step != 0 {
            if !self.grace_used {
                self.grace_used = true;
                return None;
            }
            self.reset();
            return self.observe(instr);
        }

        None
    }
}

impl Default for ThumbJumpTableRecognizer {
    fn default() -> ThumbJumpTableRecognizer { ThumbJumpTableRecognizer::new() }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Instruction;

    fn arm(address: u32, raw: u32) -> Instruction {
        Instruction::decode_arm(address, raw).expect("valid encoding")
    }

    #[test]
    fn arm_dispatch_confirms_on_following_unconditional_b() {
        let mut rec = ArmJumpTableRecognizer::new();
        // ADD PC, R0, R1, LSL #2 (cond=AL, Rd=PC, Rn=R0, Rm=R1, shift=LSL#2 imm)
        let dispatch = arm(0x1000, 0xE080F101);
        assert_eq!(rec.observe(&dispatch), None);
        // B #0 (unconditional, cond=AL): confirms immediately after, with
        // the table starting one instruction past this confirming branch.
        let confirm = arm(0x1004, 0xEA000000);
        assert_eq!(rec.observe(&confirm), Some(0x1008));
    }

    #[test]
    fn arm_dispatch_does_not_confirm_on_unrelated_instruction() {
        let mut rec = ArmJumpTableRecognizer::new();
        let dispatch = arm(0x1000, 0xE080F101);
        assert_eq!(rec.observe(&dispatch), None);
        // MOV R0, R0 (a no-op, not a branch or return): breaks the match.
        let other = arm(0x1004, 0xE1A00000);
        assert_eq!(rec.observe(&other), None);
    }

    #[test]
    fn thumb_dispatch_confirms_after_all_six_steps() {
        let mut rec = ThumbJumpTableRecognizer::new();
        // ADD R0, R0, R0 (double).
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2000, 0x1800).unwrap()), None);
        // ADD R0, PC (hi-reg add, Hd=R0, Hs=PC): encoding 0x4478.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2002, 0x4478).unwrap()), None);
        // LDRH R0, [R0, #0].
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2004, 0x8800).unwrap()), None);
        // LSL R0, R0, #16.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2006, 0x0400).unwrap()), None);
        // ASR R0, R0, #16.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2008, 0x1400).unwrap()), None);
        // ADD PC, R0 (Hd=PC, Hs=R0): encoding 0x4487.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x200A, 0x4487).unwrap()), Some(0x2006));
    }

    #[test]
    fn thumb_dispatch_tolerates_a_single_intruding_instruction() {
        let mut rec = ThumbJumpTableRecognizer::new();
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2000, 0x1800).unwrap()), None);
        // An unrelated NOP-ish MOV intrudes once.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2002, 0x1C00).unwrap()), None);
        // Step 2 still matches afterwards.
        assert_eq!(rec.observe(&Instruction::decode_thumb(0x2004, 0x4478).unwrap()), None);
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
