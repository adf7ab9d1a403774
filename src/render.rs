// License below.
//! Turns a drained [`crate::analysis::AnalysisContext`] into a GNU-assembler
//! source listing: one post-processing pass over the sorted label list
//! (mode-exchange promotion, size inference) followed by a single linear
//! emission pass.
//!
//! Branch/pool/address-materialization operands are resolved to symbols
//! here, the split [`crate::decode::display`] documents on itself: that
//! module's `Display` impl has no label store to consult, so this module
//! only falls back to it for instructions that name no address at all.
#![warn(missing_docs)]

use std::io::Write;

use crate::decode::{ArmInstruction, ArmOpcode, Body, Instruction, Mode, ThumbInstruction, ThumbOpcode};
use crate::error::DisasmError;
use crate::image::Image;
use crate::label::{Label, LabelHandle, LabelKind, LabelStore};

/// The number of `.byte` literals the gap filler emits per line.
pub const DEFAULT_DATA_COLUMN_WIDTH: usize = 16;

/// Renders every label in `labels` as GNU-assembler source, writing to `out`.
///
/// Mutates `labels` first: promotes mode-exchange boundaries to functions
/// and fills in any label whose size is still `UNKNOWN` or overruns its
/// successor. Both passes run before anything is written, so emission never
/// observes a half-updated label.
pub fn render<W: Write>(
    image: &Image,
    labels: &mut LabelStore,
    column_width: usize,
    out: &mut W,
) -> Result<(), DisasmError> {
    let addrs = sorted_addresses(labels);
    debug_assert!(addrs.windows(2).all(|w| w[0] < w[1]), "labels must be sorted and unique");
    for &a in &addrs {
        let l = labels.get(labels.lookup(a).expect("address came from this store"));
        debug_assert!(!l.kind().is_code() || l.processed(), "every code label must be processed before rendering");
    }

    promote_mode_exchanges(labels, &addrs);
    infer_sizes(labels, &addrs, image.end());

    let renderer = Renderer { image, labels, column_width };
    renderer.emit(&addrs, out)
}

fn sorted_addresses(labels: &LabelStore) -> Vec<u32> {
    labels.sorted().iter().map(|l| l.address()).collect()
}

fn promote_mode_exchanges(labels: &mut LabelStore, addrs: &[u32]) {
    for pair in addrs.windows(2) {
        let (h0, h1) = (labels.lookup(pair[0]).unwrap(), labels.lookup(pair[1]).unwrap());
        let (k0, k1) = (labels.get(h0).kind(), labels.get(h1).kind());
        let crosses = (k0 == LabelKind::ArmCode && k1 == LabelKind::ThumbCode)
            || (k0 == LabelKind::ThumbCode && k1 == LabelKind::ArmCode);
        if crosses {
            labels.promote_to_function(h1);
        }
    }
}

fn infer_sizes(labels: &mut LabelStore, addrs: &[u32], image_end: u32) {
    for (i, &a) in addrs.iter().enumerate() {
        let next = addrs.get(i + 1).copied().unwrap_or(image_end);
        let handle = labels.lookup(a).unwrap();
        let overruns = labels.get(handle).size().map_or(true, |s| a.saturating_add(s) > next);
        if overruns {
            labels.set_size(handle, next.saturating_sub(a));
        }
    }
}

struct Renderer<'a> {
    image: &'a Image,
    labels: &'a LabelStore,
    column_width: usize,
}

impl<'a> Renderer<'a> {
    fn emit<W: Write>(&self, addrs: &[u32], out: &mut W) -> Result<(), DisasmError> {
        let mut cursor = self.image.base();
        for (i, &addr) in addrs.iter().enumerate() {
            if cursor < addr {
                self.render_gap(cursor, addr, out)?;
            }
            let handle = self.labels.lookup(addr).unwrap();
            cursor = self.render_label(handle, out)?;

            if let Some(&next_addr) = addrs.get(i + 1) {
                cursor = self.absorb_pool_alignment_gap(handle, cursor, next_addr, out)?;
            }
        }
        if cursor < self.image.end() {
            self.render_gap(cursor, self.image.end(), out)?;
        }
        Ok(())
    }

    /// A code label directly followed by a short run of zero padding before
    /// a `POOL` label is the compiler re-establishing word alignment for the
    /// literal that follows; render it as `.align 2, 0` instead of letting
    /// the generic gap filler spell out the zero bytes one by one.
    fn absorb_pool_alignment_gap<W: Write>(
        &self,
        handle: LabelHandle,
        cursor: u32,
        next_addr: u32,
        out: &mut W,
    ) -> Result<u32, DisasmError> {
        if !self.labels.get(handle).kind().is_code() { return Ok(cursor); }
        let next_handle = match self.labels.lookup(next_addr) { Some(h) => h, None => return Ok(cursor) };
        if self.labels.get(next_handle).kind() != LabelKind::Pool { return Ok(cursor); }

        let gap = next_addr.saturating_sub(cursor);
        if gap == 0 || gap > 3 { return Ok(cursor); }
        let all_zero = (cursor..next_addr).all(|a| self.image.byte_at(a) == Some(0));
        if !all_zero { return Ok(cursor); }

        writeln!(out, "\t.align 2, 0")?;
        Ok(next_addr)
    }

    fn render_label<W: Write>(&self, handle: LabelHandle, out: &mut W) -> Result<u32, DisasmError> {
        let label = self.labels.get(handle);
        match label.kind() {
            LabelKind::ArmCode | LabelKind::ThumbCode => self.render_code(label, handle, out),
            LabelKind::Pool => self.render_pool(label, out),
            LabelKind::JumpTableThumb => self.render_jump_table_thumb(label, out),
            LabelKind::JumpTableArm => self.render_jump_table_arm(label, out),
            LabelKind::Data => self.render_data(label, out),
        }
    }

    fn render_code<W: Write>(&self, label: &Label, handle: LabelHandle, out: &mut W) -> Result<u32, DisasmError> {
        let addr = label.address();
        let mode = label.kind().mode().expect("code label");
        let size = label.size().unwrap_or(0);

        if label.is_func() {
            let directive = match mode {
                Mode::Arm => {
                    if addr % 4 != 0 { return Err(DisasmError::UnalignedFunction(addr)); }
                    "arm_func_start"
                }
                Mode::Thumb => match addr % 4 {
                    0 => "thumb_func_start",
                    2 => "non_word_aligned_thumb_func_start",
                    _ => return Err(DisasmError::UnalignedFunction(addr)),
                },
            };
            let sym = label_symbol(self.labels, handle);
            writeln!(out)?;
            writeln!(out, "\t{} {}", directive, sym)?;
            writeln!(out, "{}: @ {:#010X}", sym, addr)?;
        } else {
            writeln!(out, "{}:", label_symbol(self.labels, handle))?;
        }

        self.render_code_body(mode, addr, addr + size, out)
    }

    fn render_code_body<W: Write>(&self, mode: Mode, start: u32, end: u32, out: &mut W) -> Result<u32, DisasmError> {
        let mut cursor = start;
        while cursor < end {
            match mode {
                Mode::Thumb => {
                    if let Some(raw) = self.image.halfword_at(cursor) {
                        if let Ok(t) = ThumbInstruction::decode(raw) {
                            if t.opcode() == ThumbOpcode::BranchLongOffs && !t.is_low_offset_and_branch()
                                && cursor + 4 <= end
                            {
                                if let Some(line) = self.combined_thumb_bl_line(cursor, &t) {
                                    writeln!(out, "\t{}", line)?;
                                    cursor += 4;
                                    continue;
                                }
                            }
                            let instr = Instruction::decode_thumb(cursor, raw).expect("just decoded");
                            writeln!(out, "\t{}", self.format_instruction(cursor, &instr))?;
                            cursor += 2;
                            continue;
                        }
                    }
                    let raw = self.image.halfword_at(cursor).unwrap_or(0);
                    writeln!(out, "\t.hword {:#06X}", raw)?;
                    cursor += 2;
                }
                Mode::Arm => {
                    if let Some(raw) = self.image.word_at(cursor) {
                        if let Ok(_) = ArmInstruction::decode(raw) {
                            let instr = Instruction::decode_arm(cursor, raw).expect("just decoded");
                            writeln!(out, "\t{}", self.format_instruction(cursor, &instr))?;
                            cursor += 4;
                            continue;
                        }
                    }
                    let raw = self.image.word_at(cursor).unwrap_or(0);
                    writeln!(out, "\t.word {:#010X}", raw)?;
                    cursor += 4;
                }
            }
        }
        Ok(cursor)
    }

    /// Reconstructs the combined-target `bl` line for a THUMB `BL` pair,
    /// mirroring [`crate::analysis::AnalysisContext::combine_thumb_bl`]'s
    /// formula; returns `None` if the low half isn't actually there.
    fn combined_thumb_bl_line(&self, high_addr: u32, high: &ThumbInstruction) -> Option<String> {
        let low_raw = self.image.halfword_at(high_addr + 2)?;
        let low = ThumbInstruction::decode(low_raw).ok()?;
        if low.opcode() != ThumbOpcode::BranchLongOffs || !low.is_low_offset_and_branch() {
            return None;
        }
        let high_signed = (high.long_offs_part() << 21) >> 21;
        let offset = (high_signed << 12) + (low.long_offs_part() << 1);
        let target = (high_addr as i64 + 4 + offset as i64) as u32;
        Some(format!("bl\t{}", symbol_for(self.labels, target)))
    }

    /// Formats one non-`BL`-pair instruction, substituting a symbolic
    /// operand for branches, pool loads, and `ADR`-style address
    /// materializations; falls back to the plain [`std::fmt::Display`]
    /// rendering (raw mnemonic and operands, no symbol) for everything else.
    fn format_instruction(&self, addr: u32, instr: &Instruction) -> String {
        if let Some(target) = instr.branch_target() {
            return format!("{}\t{}", branch_prefix(instr), symbol_for(self.labels, target));
        }
        if let Some((_, pool_addr)) = instr.pool_load() {
            let value = self.image.word_at(pool_addr);
            let annotation = value.map(|v| self.pool_value_symbol(v)).unwrap_or_else(|| "?".to_string());
            return format!("{}\t@ ={}", instr, annotation);
        }
        if let Some((_, value)) = instr.adr() {
            let _ = addr;
            return format!("{}\t@ ={}", instr, symbol_for(self.labels, value));
        }
        format!("{}", instr)
    }

    fn pool_value_symbol(&self, v: u32) -> String {
        if v & 1 != 0 {
            if let Some(h) = self.labels.lookup(v & !1) {
                if self.labels.get(h).kind() == LabelKind::ThumbCode {
                    return label_symbol(self.labels, h);
                }
            }
        }
        match self.labels.lookup(v) {
            Some(h) => label_symbol(self.labels, h),
            None => format!("{:#010X}", v),
        }
    }

    fn render_pool<W: Write>(&self, label: &Label, out: &mut W) -> Result<u32, DisasmError> {
        let addr = label.address();
        let size = label.size().unwrap_or(4);
        let sym = format!("_{:08X}", addr);
        match self.image.word_at(addr) {
            Some(v) => writeln!(out, "{}:\t.4byte {}", sym, self.pool_value_symbol(v))?,
            None => writeln!(out, "{}:\t.4byte 0x00000000 @ out of image", sym)?,
        }
        Ok(addr + size)
    }

    fn render_jump_table_thumb<W: Write>(&self, label: &Label, out: &mut W) -> Result<u32, DisasmError> {
        let start = label.address();
        let size = label.size().unwrap_or(0);
        let table_sym = format!("_{:08X}", start);
        writeln!(out, "{}: @ jump table", table_sym)?;

        let mut addr = start;
        let mut case = 0usize;
        while addr + 2 <= start + size {
            if let Some(raw) = self.image.halfword_at(addr) {
                let target = (start as i64 + 2 + (raw as i16 as i32) as i64) as u32;
                writeln!(out, "\t.2byte {} - {} - 2\t@ case {}", symbol_for(self.labels, target), table_sym, case)?;
            }
            addr += 2;
            case += 1;
        }
        Ok(start + size)
    }

    fn render_jump_table_arm<W: Write>(&self, label: &Label, out: &mut W) -> Result<u32, DisasmError> {
        let start = label.address();
        let size = label.size().unwrap_or(0);
        let table_sym = format!("_{:08X}", start);
        writeln!(out, "{}: @ jump table", table_sym)?;

        let mut addr = start;
        let mut case = 0usize;
        while addr + 4 <= start + size {
            if let Some(word) = self.image.word_at(addr) {
                if let Ok(entry) = ArmInstruction::decode(word) {
                    let target = (addr as i64 + 8 + entry.branch_offset() as i64) as u32;
                    writeln!(out, "\tb\t{}\t@ case {}", symbol_for(self.labels, target), case)?;
                }
            }
            addr += 4;
            case += 1;
        }
        Ok(start + size)
    }

    fn render_data<W: Write>(&self, label: &Label, out: &mut W) -> Result<u32, DisasmError> {
        let addr = label.address();
        let size = label.size().unwrap_or(0);
        self.render_gap(addr, addr + size, out)?;
        Ok(addr + size)
    }

    /// Fills the space between two labels (or between the image start/end
    /// and its outermost labels) with `.byte` literals, special-casing the
    /// two most common two-byte alignment fillers a compiler leaves behind.
    fn render_gap<W: Write>(&self, start: u32, end: u32, out: &mut W) -> Result<(), DisasmError> {
        if start >= end { return Ok(()); }

        let mut addr = start;
        if addr % 4 == 2 {
            match self.image.halfword_at(addr) {
                Some(0x0000) => { writeln!(out, "\t.align 2, 0")?; addr += 2; }
                Some(0x46C0) => { writeln!(out, "\tnop")?; addr += 2; }
                _ => {}
            }
        }
        if addr >= end { return Ok(()); }

        writeln!(out, "_{:08X}:", addr)?;
        while addr < end {
            let chunk_end = end.min(addr + self.column_width as u32);
            let bytes: Vec<String> = (addr..chunk_end)
                .filter_map(|a| self.image.byte_at(a))
                .map(|b| format!("{:#04X}", b))
                .collect();
            writeln!(out, "\t.byte {}", bytes.join(", "))?;
            addr = chunk_end;
        }
        Ok(())
    }
}

/// ARM `B`/`BL`/`BLX` or THUMB `B`/`Bcond` mnemonic text, for the
/// instructions [`Instruction::branch_target`] resolves a target for.
fn branch_prefix(instr: &Instruction) -> String {
    match instr.body() {
        Body::Arm(i) => match i.opcode() {
            ArmOpcode::BBl => format!("{}{}", if i.is_branch_with_link() { "bl" } else { "b" }, i.condition().assembly_name()),
            ArmOpcode::BlxImm => "blx".to_string(),
            _ => unreachable!("only called for instructions with a resolvable branch_target"),
        },
        Body::Thumb(t) => match t.opcode() {
            ThumbOpcode::BranchConditionOffs => format!("b{}", t.condition().assembly_name()),
            ThumbOpcode::BranchOffs => "b".to_string(),
            _ => unreachable!("only called for instructions with a resolvable branch_target"),
        },
    }
}

fn symbol_for(labels: &LabelStore, addr: u32) -> String {
    match labels.lookup(addr) {
        Some(h) => label_symbol(labels, h),
        None => format!("{:#010X}", addr),
    }
}

fn label_symbol(labels: &LabelStore, handle: LabelHandle) -> String {
    let l = labels.get(handle);
    if let Some(n) = l.name() { return n.to_string(); }
    if l.is_func() { format!("FUN_{:08X}", l.address()) } else { format!("_{:08X}", l.address()) }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::BranchClass;

    fn img(base: u32, bytes: Vec<u8>) -> Image { Image::new(base, bytes).unwrap() }

    #[test]
    fn entry_only_thumb_function_renders_func_start_and_bx_lr() {
        let image = img(0x0200_0000, vec![0x70, 0x47]); // bx lr
        let mut labels = LabelStore::new();
        let h = labels.add_or_update(0x0200_0000, LabelKind::ThumbCode, BranchClass::Bl);
        labels.set_size(h, 2);
        labels.mark_processed(h);

        let mut out = Vec::new();
        render(&image, &mut labels, DEFAULT_DATA_COLUMN_WIDTH, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("thumb_func_start FUN_02000000"));
        assert!(text.contains("FUN_02000000: @ 0x02000000"));
        assert!(text.contains("bx\tlr"));
    }

    #[test]
    fn pool_label_renders_hex_literal_when_unsymbolized() {
        // ldr r0,[pc,#0]; bx lr; .4byte 0x12345678
        let image = img(0x0200_0000, vec![0x00, 0x48, 0x70, 0x47, 0x78, 0x56, 0x34, 0x12]);
        let mut labels = LabelStore::new();
        let func = labels.add_or_update(0x0200_0000, LabelKind::ThumbCode, BranchClass::Bl);
        labels.set_size(func, 4);
        labels.mark_processed(func);
        let pool = labels.add_pool(0x0200_0004);
        labels.set_size(pool, 4);

        let mut out = Vec::new();
        render(&image, &mut labels, DEFAULT_DATA_COLUMN_WIDTH, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("_02000004:\t.4byte 0x12345678"));
    }

    #[test]
    fn adjacent_mode_crossing_labels_are_promoted_to_functions() {
        let image = img(0x1000, vec![0x1E, 0xFF, 0x2F, 0xE1, 0x70, 0x47]); // bx lr; bx lr (thumb)
        let mut labels = LabelStore::new();
        let arm = labels.add_or_update(0x1000, LabelKind::ArmCode, BranchClass::Bl);
        labels.set_size(arm, 4);
        labels.mark_processed(arm);
        let thumb = labels.add_or_update(0x1004, LabelKind::ThumbCode, BranchClass::B);
        labels.set_size(thumb, 2);
        labels.mark_processed(thumb);

        let mut out = Vec::new();
        render(&image, &mut labels, DEFAULT_DATA_COLUMN_WIDTH, &mut out).unwrap();

        assert!(labels.get(thumb).is_func(), "a THUMB label directly after an ARM one must become a function");
    }

    #[test]
    fn unaligned_arm_function_is_a_fatal_error() {
        let image = img(0x1002, vec![0x1E, 0xFF, 0x2F, 0xE1]);
        let mut labels = LabelStore::new();
        let h = labels.add_or_update(0x1002, LabelKind::ArmCode, BranchClass::Bl);
        labels.set_size(h, 4);
        labels.mark_processed(h);

        let mut out = Vec::new();
        let result = render(&image, &mut labels, DEFAULT_DATA_COLUMN_WIDTH, &mut out);
        assert!(matches!(result, Err(DisasmError::UnalignedFunction(0x1002))));
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
