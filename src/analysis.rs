// License below.
//! The worklist-driven code-discovery engine: drains unprocessed code
//! labels, decodes each one instruction by instruction, and classifies
//! whatever it finds using the predicates in [`crate::decode`] and the
//! jump-table recognizers in [`crate::jumptable`].
#![warn(missing_docs)]

use crate::decode::{ArmInstruction, ArmOpcode, BranchKind, Instruction, Mode, ThumbInstruction, ThumbOpcode};
use crate::image::Image;
use crate::jumptable::{ArmJumpTableRecognizer, ThumbJumpTableRecognizer};
use crate::label::{BranchClass, LabelHandle, LabelKind, LabelStore};

/// Owns everything a disassembly run needs: the image being read, the
/// labels discovered so far, and the RAM floor below which discoveries are
/// discarded as decode noise.
///
/// A single owned struct rather than free functions threading several
/// mutable borrows around, for the same reason [`crate::label::LabelStore`]
/// replaced raw references with handles: the teacher's `Gba` struct
/// (`src/hardware/mod.rs`) wires a CPU to a bus it borrows from; there is no
/// bus here, just one image and one growing set of labels, so they live
/// together on one context instead.
pub struct AnalysisContext {
    image: Image,
    labels: LabelStore,
    ram_floor: u32,
}

impl AnalysisContext {
    /// Creates an analysis context over `image`. Any address discovered
    /// below `ram_floor` is silently dropped rather than recorded.
    pub fn new(image: Image, ram_floor: u32) -> AnalysisContext {
        AnalysisContext { image, labels: LabelStore::new(), ram_floor }
    }

    /// The image being disassembled.
    pub fn image(&self) -> &Image { &self.image }

    /// The labels discovered so far.
    pub fn labels(&self) -> &LabelStore { &self.labels }

    /// Consumes the context, handing its image and label store to the renderer.
    pub fn into_parts(self) -> (Image, LabelStore) { (self.image, self.labels) }

    /// Seeds an initial label — the command-line entry point, or a line
    /// from a `--seeds` file. Seeded code is always treated as a real
    /// function (`BC = BL`), since nothing external branches to a seed
    /// except by calling it.
    pub fn seed(&mut self, address: u32, kind: LabelKind, name: Option<String>) {
        if address < self.ram_floor { return; }
        let bc = if kind.is_code() { BranchClass::Bl } else { BranchClass::Unknown };
        let handle = self.labels.add_or_update(address, kind, bc);
        if let Some(n) = name { self.labels.set_name(handle, n); }
        self.seal_if_external(handle, address);
    }

    /// Labels outside the image are created `processed` from the start:
    /// the worklist will never reach them, so there is nothing to decode.
    fn seal_if_external(&mut self, handle: LabelHandle, address: u32) {
        if !self.image.contains(address) {
            self.labels.mark_processed(handle);
        }
    }

    fn add_branch_target(&mut self, address: u32, kind: LabelKind, bc: BranchClass) -> Option<LabelHandle> {
        if address < self.ram_floor { return None; }
        let handle = self.labels.add_or_update(address, kind, bc);
        self.seal_if_external(handle, address);
        Some(handle)
    }

    fn add_function_target(&mut self, address: u32, kind: LabelKind) -> Option<LabelHandle> {
        if address < self.ram_floor { return None; }
        let handle = self.labels.add_function(address, kind);
        self.seal_if_external(handle, address);
        Some(handle)
    }

    fn add_pool_target(&mut self, address: u32) -> Option<LabelHandle> {
        if address < self.ram_floor { return None; }
        let handle = self.labels.add_pool(address);
        self.seal_if_external(handle, address);
        Some(handle)
    }

    fn add_jump_table_target(&mut self, address: u32, kind: LabelKind) -> Option<LabelHandle> {
        if address < self.ram_floor { return None; }
        let handle = self.labels.add_jump_table(address, kind);
        self.seal_if_external(handle, address);
        Some(handle)
    }

    /// Drains the worklist: repeatedly picks the lowest-address unprocessed
    /// code label and decodes forward from it until none remain. This is
    /// the analyzer's only termination condition — there is no instruction
    /// budget or visited-address cap, since a label is only ever enqueued
    /// once per classification and reopened deliberately (see
    /// [`crate::label::LabelStore::add_function`]) rather than repeatedly.
    pub fn run(&mut self) {
        while let Some(handle) = self.labels.next_unprocessed() {
            let address = self.labels.get(handle).address();
            let mode = self.labels.get(handle).kind().mode()
                .expect("next_unprocessed only yields labels whose kind is code");
            let end = self.decode_label(mode, address);
            self.labels.set_size(handle, end.saturating_sub(address));
            self.labels.mark_processed(handle);
        }
    }

    /// Decodes forward from `start` in `mode` until a terminating
    /// instruction is found or the image runs out. Returns the address one
    /// past the last byte read, the label's decoded size.
    fn decode_label(&mut self, mode: Mode, start: u32) -> u32 {
        let mut arm_jt = ArmJumpTableRecognizer::new();
        let mut thumb_jt = ThumbJumpTableRecognizer::new();
        let mut last_conditional_target: Option<u32> = None;
        let mut cursor = start;

        loop {
            let instr = match self.decode_at(mode, cursor) {
                Some(i) => i,
                None => {
                    if !self.image.contains(cursor) { return cursor; }
                    // Invalid encoding: recover by retrying at the next
                    // addressable unit for this mode, adding no label.
                    cursor += if mode == Mode::Arm { 4 } else { 2 };
                    continue;
                }
            };

            if let Some(table_start) = arm_jt.observe(&instr) {
                self.read_arm_jump_table(table_start, last_conditional_target);
            }
            if let Some(table_start) = thumb_jt.observe(&instr) {
                self.read_thumb_jump_table(table_start);
            }

            if instr.is_branch() && !instr.condition().is_always()
                && instr.branch_kind() == Some(BranchKind::B)
            {
                last_conditional_target = instr.branch_target();
            }

            // THUMB `BL` spans two half-words; neither carries a usable
            // target alone ([`Instruction::branch_target`] returns `None`
            // for both), so the high half is combined with its low half
            // here, before the generic branch handling below ever sees it.
            if mode == Mode::Thumb {
                if let Some(t) = instr.as_thumb() {
                    if t.opcode() == ThumbOpcode::BranchLongOffs {
                        if !t.is_low_offset_and_branch() {
                            if let Some(target) = self.combine_thumb_bl(cursor, t) {
                                let next = cursor + 4;
                                if self.handle_call(LabelKind::ThumbCode, target, next) {
                                    return next;
                                }
                                cursor = next;
                                continue;
                            }
                        }
                        // A high half with no matching low half, or a lone
                        // low half reached directly: not a decodable pair.
                        cursor += 2;
                        continue;
                    }
                }
            }

            let next = cursor + instr.size();

            if instr.is_func_return() {
                self.handle_mode_exchange(mode, next);
                return next;
            }

            if instr.is_branch() {
                if instr.is_conditional_bx().is_some() {
                    // Control may or may not return; the fallthrough must
                    // still be decoded.
                    cursor = next;
                    continue;
                }

                match instr.branch_kind() {
                    Some(BranchKind::Bl) => {
                        let same_kind = code_kind(mode);
                        let far_jump = instr.branch_target()
                            .map(|target| self.handle_call(same_kind, target, next))
                            .unwrap_or(false);
                        if far_jump { return next; }
                        cursor = next;
                        continue;
                    }
                    Some(BranchKind::BlxImm) => {
                        let flipped_kind = code_kind(flip_mode(mode));
                        let far_jump = instr.branch_target()
                            .map(|target| self.handle_call(flipped_kind, target, next))
                            .unwrap_or(false);
                        if far_jump { return next; }
                        cursor = next;
                        continue;
                    }
                    Some(BranchKind::B) => {
                        let same_kind = code_kind(mode);
                        if let Some(target) = instr.branch_target() {
                            self.add_branch_target(target, same_kind, BranchClass::B);
                        }
                        if instr.condition().is_always() { return next; }
                        cursor = next;
                        continue;
                    }
                    None => {
                        // Register-indirect branch (`BX`/`BLX Rm` already
                        // handled by the func-return and conditional-BX
                        // checks above) with no statically known target.
                        if instr.condition().is_always() { return next; }
                        cursor = next;
                        continue;
                    }
                }
            }

            // Not a branch: look for a literal pool load or an `ADR`-style
            // address materialization, and check whether the following
            // instruction turns it into an indirect call.
            if let Some((dest, pool_addr)) = instr.pool_load() {
                self.add_pool_target(pool_addr);
                // `pool_addr` only names where the pointer is stored; the
                // candidate call target is the word stored there.
                if let Some(value) = self.image.word_at(pool_addr) {
                    self.check_indirect_call(mode, dest, value, true, next);
                }
            } else if let Some((dest, value)) = instr.adr() {
                self.check_indirect_call(mode, dest, value, false, next);
            }

            cursor = next;
        }
    }

    fn decode_at(&self, mode: Mode, address: u32) -> Option<Instruction> {
        match mode {
            Mode::Arm => self.image.word_at(address).and_then(|w| Instruction::decode_arm(address, w).ok()),
            Mode::Thumb => self.image.halfword_at(address).and_then(|h| Instruction::decode_thumb(address, h).ok()),
        }
    }

    /// Combines a THUMB `BL` high half at `high_addr` with the low half
    /// immediately following it, per the standard two-instruction encoding:
    /// an 11-bit high part shifted left 12 plus an 11-bit low part shifted
    /// left 1, relative to the high half's own address plus 4.
    fn combine_thumb_bl(&self, high_addr: u32, high: &ThumbInstruction) -> Option<u32> {
        let low_raw = self.image.halfword_at(high_addr + 2)?;
        let low = ThumbInstruction::decode(low_raw).ok()?;
        if low.opcode() != ThumbOpcode::BranchLongOffs || !low.is_low_offset_and_branch() {
            return None;
        }
        let high_signed = (high.long_offs_part() << 21) >> 21;
        let offset = (high_signed << 12) + (low.long_offs_part() << 1);
        Some((high_addr as i64 + 4 + offset as i64) as u32)
    }

    /// Records a same- or flipped-mode function call, applying the
    /// far-jump heuristic before the label is created so that a
    /// misclassified far jump never has the chance to lock in `isFunc`.
    /// Returns whether the call was reclassified as a far jump, which the
    /// caller uses to decide whether the current label's decode terminates.
    fn handle_call(&mut self, kind: LabelKind, target: u32, after_call: u32) -> bool {
        let far_jump = self.bl_is_far_jump(kind, after_call);
        let bc = if far_jump { BranchClass::B } else { BranchClass::Bl };
        self.add_branch_target(target, kind, bc);
        far_jump
    }

    /// A `BL`/`BLX` is reclassified as a far jump, not a call, when the
    /// instruction immediately following it is already known to be a
    /// literal pool, or — for THUMB — is zero padding sitting at a
    /// non-word-aligned address (both patterns a compiler never places
    /// right after a real call, only after a tail-call-shaped jump).
    fn bl_is_far_jump(&self, kind: LabelKind, after_call: u32) -> bool {
        if let Some(h) = self.labels.lookup(after_call) {
            if self.labels.get(h).kind() == LabelKind::Pool { return true; }
        }
        if kind == LabelKind::ThumbCode && after_call % 4 != 0 {
            if self.image.halfword_at(after_call) == Some(0) { return true; }
        }
        false
    }

    /// Handles the mode-exchange idiom: an ARM function ending in `BX`/`MOV
    /// PC,Rx` whose fallthrough address is already a THUMB label reached
    /// only by `B` (or the mirror image). Promotes that label to a real
    /// function, since control genuinely lands there from the outside.
    fn handle_mode_exchange(&mut self, mode: Mode, after_return: u32) {
        let other_kind = code_kind(flip_mode(mode));
        if let Some(h) = self.labels.lookup(after_return) {
            let label = self.labels.get(h);
            if label.kind() == other_kind && !label.is_func() {
                self.labels.add_function(after_return, other_kind);
            }
        }
    }

    /// After a pool load or `ADR`, checks whether the very next instruction
    /// is `BX Ry`/`MOV PC,Ry` with `Ry` equal to the register just loaded,
    /// which means the materialized value was a code pointer all along.
    fn check_indirect_call(&mut self, mode: Mode, dest_reg: u32, value: u32, is_pool: bool, after: u32) {
        let next = match self.decode_at(mode, after) {
            Some(i) => i,
            None => return,
        };
        if next.bx_reg() != Some(dest_reg) && next.mov_pc_reg() != Some(dest_reg) {
            return;
        }

        let (kind, target) = if is_pool {
            let k = if value & 1 != 0 { LabelKind::ThumbCode } else { LabelKind::ArmCode };
            (k, value & !1)
        } else {
            (code_kind(mode), value)
        };
        self.add_function_target(target, kind);
    }

    /// Walks the ARM jump-table dialect: consecutive 32-bit words starting
    /// at `table_start`, each read directly from the image rather than
    /// through the normal decode cursor (which already terminated at the
    /// dispatch's confirming `B`/return). Stops at the first non-`B` word,
    /// the first target outside the image, or once the scanned address
    /// reaches the smallest target seen so far.
    fn read_arm_jump_table(&mut self, table_start: u32, bound: Option<u32>) {
        self.add_jump_table_target(table_start, LabelKind::JumpTableArm);
        let mut cursor = table_start;
        let mut smallest = bound.unwrap_or(u32::max_value());
        loop {
            if cursor >= smallest { break; }
            let word = match self.image.word_at(cursor) { Some(w) => w, None => break };
            let entry = match ArmInstruction::decode(word) { Ok(i) => i, Err(_) => break };
            if entry.opcode() != ArmOpcode::BBl || entry.is_branch_with_link()
                || !entry.condition().is_always() { break; }
            let target = (cursor as i64 + 8 + entry.branch_offset() as i64) as u32;
            if !self.image.contains(target) { break; }
            self.add_branch_target(target, LabelKind::ArmCode, BranchClass::B);
            smallest = smallest.min(target);
            cursor += 4;
        }
        if let Some(h) = self.labels.lookup(table_start) {
            self.labels.set_size(h, cursor - table_start);
        }
    }

    /// Walks the THUMB jump-table dialect: consecutive signed 16-bit
    /// displacements starting at `table_start`, each naming a target
    /// relative to `table_start + 2`. Bails at the first entry that leaves
    /// the image, is not half-word aligned, or would place a target before
    /// the table itself; the table's length is the smallest such in-range
    /// target seen.
    fn read_thumb_jump_table(&mut self, table_start: u32) {
        self.add_jump_table_target(table_start, LabelKind::JumpTableThumb);
        let mut cursor = table_start;
        let mut smallest: Option<u32> = None;
        loop {
            if let Some(s) = smallest { if cursor >= s { break; } }
            let raw = match self.image.halfword_at(cursor) { Some(h) => h, None => break };
            let target = (table_start as i64 + 2 + (raw as i16 as i32) as i64) as u32;
            if !self.image.contains(target) || target % 2 != 0 || target < table_start.wrapping_add(2) {
                break;
            }
            self.add_branch_target(target, LabelKind::ThumbCode, BranchClass::B);
            smallest = Some(smallest.map_or(target, |s| s.min(target)));
            cursor += 2;
        }
        if let Some(h) = self.labels.lookup(table_start) {
            self.labels.set_size(h, cursor - table_start);
        }
    }
}

fn flip_mode(mode: Mode) -> Mode {
    match mode { Mode::Arm => Mode::Thumb, Mode::Thumb => Mode::Arm }
}

fn code_kind(mode: Mode) -> LabelKind {
    match mode { Mode::Arm => LabelKind::ArmCode, Mode::Thumb => LabelKind::ThumbCode }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(base: u32, bytes: Vec<u8>) -> AnalysisContext {
        AnalysisContext::new(Image::new(base, bytes).unwrap(), base)
    }

    #[test]
    fn bl_call_then_return_discovers_external_function_and_terminates() {
        // 0x1000: BL 0x2000
        // 0x1004: BX LR
        let mut c = ctx(0x1000, vec![
            0xFE, 0x03, 0x00, 0xEB, // 0xEB0003FE
            0x1E, 0xFF, 0x2F, 0xE1, // 0xE12FFF1E
        ]);
        c.seed(0x1000, LabelKind::ArmCode, None);
        c.run();

        let entry = c.labels.get(c.labels.lookup(0x1000).unwrap());
        assert_eq!(entry.size(), Some(8));
        assert!(entry.processed());

        let callee = c.labels.get(c.labels.lookup(0x2000).unwrap());
        assert_eq!(callee.kind(), LabelKind::ArmCode);
        assert!(callee.is_func());
        assert!(callee.processed(), "external target must never be queued for decode");
    }

    #[test]
    fn pool_load_followed_by_bx_is_an_indirect_call() {
        // 0x3000: LDR R0, [PC, #0]   (pool word at 0x3008, holding 0x5001)
        // 0x3004: BX R0
        // 0x3008: .4byte 0x5001     (THUMB function pointer, low bit set)
        let mut c = ctx(0x3000, vec![
            0x00, 0x00, 0x9F, 0xE5, // 0xE59F0000
            0x10, 0xFF, 0x2F, 0xE1, // 0xE12FFF10
            0x01, 0x50, 0x00, 0x00, // 0x00005001
        ]);
        c.seed(0x3000, LabelKind::ArmCode, None);
        c.run();

        let pool = c.labels.get(c.labels.lookup(0x3008).unwrap());
        assert_eq!(pool.kind(), LabelKind::Pool, "the pool slot itself still holds a plain data word");

        let callee = c.labels.get(c.labels.lookup(0x5000).unwrap());
        assert_eq!(callee.kind(), LabelKind::ThumbCode, "the pointer's low bit selects THUMB state");
        assert!(callee.is_func(), "indirect call through a pool-loaded register must mark a function");
    }

    #[test]
    fn bl_followed_by_a_pool_label_is_demoted_to_a_far_jump() {
        // 0x8000: LDR R2, [PC, #0]   (pool word at 0x8008)
        // 0x8004: BL 0x9000
        let mut c = ctx(0x8000, vec![
            0x00, 0x20, 0x9F, 0xE5, // 0xE59F2000
            0xFD, 0x03, 0x00, 0xEB, // 0xEB0003FD
        ]);
        c.seed(0x8000, LabelKind::ArmCode, None);
        c.run();

        let far_target = c.labels.get(c.labels.lookup(0x9000).unwrap());
        assert_eq!(far_target.branch_class(), BranchClass::B);
        assert!(!far_target.is_func(), "a call landing on a pool is a tail jump, not a function");

        let entry = c.labels.get(c.labels.lookup(0x8000).unwrap());
        assert_eq!(entry.size(), Some(8), "a far-jump BL must terminate the caller's decode");
    }

    #[test]
    fn ram_floor_drops_out_of_range_seeds() {
        let mut c = ctx(0x2000000, vec![0; 4]);
        c.seed(0x100, LabelKind::ArmCode, None);
        assert!(c.labels.lookup(0x100).is_none());
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
