// License below.
//! The label store: every address the analyzer has classified, plus the
//! stable handles the worklist and renderer use to refer to them.
//!
//! Modeled after the teacher's `RawBytes`-backed memory areas
//! (`src/hardware/memory.rs`) in spirit — a single owned backing buffer with
//! typed accessors — but the append-only-`Vec`-plus-index-handle shape here
//! has no direct teacher precedent; it exists to solve a problem the
//! teacher's emulator never had: a `Label` must be referred to stably while
//! new labels keep getting appended underneath it, which a raw pointer or
//! reference into a growable `Vec` cannot survive.
#![warn(missing_docs)]

use std::collections::HashMap;

use crate::decode::Mode;

/// What an address in the image has been classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Entry point of ARM state code.
    ArmCode,
    /// Entry point of THUMB state code.
    ThumbCode,
    /// A literal pool word referenced by a PC-relative load.
    Pool,
    /// The start of an ARM-dialect jump table (`B` targets).
    JumpTableArm,
    /// The start of a THUMB-dialect jump table (half-word displacements).
    JumpTableThumb,
    /// Data with no more specific classification.
    Data,
}

impl LabelKind {
    /// The instruction-set mode implied by this label kind, if it names code.
    pub fn mode(self) -> Option<Mode> {
        match self {
            LabelKind::ArmCode => Some(Mode::Arm),
            LabelKind::ThumbCode => Some(Mode::Thumb),
            _ => None,
        }
    }

    /// Whether this label kind names an address the analyzer's worklist
    /// should ever visit.
    pub fn is_code(self) -> bool {
        matches!(self, LabelKind::ArmCode | LabelKind::ThumbCode)
    }
}

/// How a code label was reached, used to decide whether it deserves its own
/// symbol in the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchClass {
    /// Not yet known to be the target of any branch (e.g. the initial seed).
    Unknown,
    /// Reached only by a plain `B`/`Bcond` (stays inside its caller's function).
    B,
    /// Reached by `BL`/`BLX` (a real function call).
    Bl,
}

/// A single classified address and everything the analyzer and renderer
/// know about it.
#[derive(Debug, Clone)]
pub struct Label {
    address: u32,
    kind: LabelKind,
    branch_class: BranchClass,
    size: Option<u32>,
    processed: bool,
    is_func: bool,
    name: Option<String>,
}

impl Label {
    /// The address this label names.
    pub fn address(&self) -> u32 { self.address }
    /// What this address has been classified as.
    pub fn kind(&self) -> LabelKind { self.kind }
    /// How this label was reached, if it names code.
    pub fn branch_class(&self) -> BranchClass { self.branch_class }
    /// The size in bytes this label covers, once known (instruction run
    /// length, pool word size, jump table extent).
    pub fn size(&self) -> Option<u32> { self.size }
    /// Whether the analyzer has already decoded starting from this label
    /// (or, for non-code labels, whether it needs no further visiting).
    pub fn processed(&self) -> bool { self.processed }
    /// Whether this label deserves a `FUN_xxxxxxxx`-style function symbol.
    /// Absorbing: once set, nothing in this module ever clears it again.
    pub fn is_func(&self) -> bool { self.is_func }
    /// An explicit user- or config-supplied name, overriding the generated one.
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
}

/// A stable reference to a [`Label`] inside a [`LabelStore`].
///
/// Stable across insertions: the store never reorders or removes entries
/// in place, it only appends, so a handle taken before a later mutating
/// call remains valid afterwards. [`LabelStore::drop_below`] is the one
/// exception — it is only ever run once, before the worklist starts, so no
/// handle survives across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelHandle(usize);

/// The append-only set of classified addresses discovered so far.
///
/// Backed by a `Vec<Label>` indexed by [`LabelHandle`] plus a `HashMap` from
/// address to handle for lookup; growing the `Vec` never invalidates a
/// handle, since a handle is just an index, unlike a pointer or reference
/// into the backing storage.
pub struct LabelStore {
    labels: Vec<Label>,
    by_address: HashMap<u32, LabelHandle>,
}

impl LabelStore {
    /// Creates an empty label store.
    pub fn new() -> LabelStore {
        LabelStore { labels: Vec::new(), by_address: HashMap::new() }
    }

    /// Looks up the label at `address`, if any has been recorded.
    pub fn lookup(&self, address: u32) -> Option<LabelHandle> {
        self.by_address.get(&address).copied()
    }

    /// Fetches a label by handle.
    pub fn get(&self, handle: LabelHandle) -> &Label {
        &self.labels[handle.0]
    }

    /// Records `address` as `kind`, reached with `branch_class` evidence.
    ///
    /// The kind is always overwritten with the newer classification — a
    /// later `ARM_CODE` discovery promotes a prior `DATA`, for instance,
    /// since every caller only ever supplies a classification it has direct
    /// evidence for. `branch_class` is reconciled rather than overwritten:
    /// `isFunc` is absorbing (never cleared once set), `Bl` evidence
    /// promotes and locks in `isFunc`, `B` evidence demotes a non-function
    /// label to `B` and clears any name it was given (a demoted label is
    /// not a user function any more), and `Unknown` evidence asserts
    /// nothing either way.
    pub fn add_or_update(&mut self, address: u32, kind: LabelKind, branch_class: BranchClass) -> LabelHandle {
        if let Some(handle) = self.lookup(address) {
            let label = &mut self.labels[handle.0];
            label.kind = kind;
            if !label.is_func {
                match branch_class {
                    BranchClass::Bl => { label.branch_class = BranchClass::Bl; label.is_func = true; }
                    BranchClass::B => { label.branch_class = BranchClass::B; label.name = None; }
                    BranchClass::Unknown => {}
                }
            }
            return handle;
        }

        let handle = LabelHandle(self.labels.len());
        self.labels.push(Label {
            address,
            kind,
            branch_class,
            size: if kind == LabelKind::Pool { Some(4) } else { None },
            processed: false,
            is_func: branch_class == BranchClass::Bl,
            name: None,
        });
        self.by_address.insert(address, handle);
        handle
    }

    /// Records a hard function commitment — the indirect-call and
    /// mode-exchange idioms that *know* `address` is a callable entry, not
    /// merely a branch target. Unlike [`Self::add_or_update`], this always
    /// sets `isFunc = true, BC = BL` and, if the label existed already but
    /// was not yet a function, clears `processed` to force the worklist to
    /// re-decode it under the corrected classification.
    pub fn add_function(&mut self, address: u32, kind: LabelKind) -> LabelHandle {
        if let Some(handle) = self.lookup(address) {
            let label = &mut self.labels[handle.0];
            let was_func = label.is_func;
            label.kind = kind;
            label.branch_class = BranchClass::Bl;
            label.is_func = true;
            if !was_func { label.processed = false; }
            return handle;
        }

        let handle = LabelHandle(self.labels.len());
        self.labels.push(Label {
            address, kind,
            branch_class: BranchClass::Bl,
            size: None,
            processed: false,
            is_func: true,
            name: None,
        });
        self.by_address.insert(address, handle);
        handle
    }

    /// Records a literal pool word at `address`. Pool labels never compete
    /// with an existing `CODE` classification, since by construction they
    /// are only ever placed at addresses the current code label has
    /// already decoded past.
    pub fn add_pool(&mut self, address: u32) -> LabelHandle {
        if let Some(handle) = self.lookup(address) {
            let label = &mut self.labels[handle.0];
            if !label.kind.is_code() {
                label.kind = LabelKind::Pool;
                label.size = Some(4);
            }
            return handle;
        }

        let handle = LabelHandle(self.labels.len());
        self.labels.push(Label {
            address,
            kind: LabelKind::Pool,
            branch_class: BranchClass::Unknown,
            size: Some(4),
            processed: true,
            is_func: false,
            name: None,
        });
        self.by_address.insert(address, handle);
        handle
    }

    /// Records the start of a jump table. Its extent is filled in once the
    /// recognizer finishes walking entries, or left to the renderer's
    /// gap-normalization pass if the table turned out to be empty.
    pub fn add_jump_table(&mut self, address: u32, kind: LabelKind) -> LabelHandle {
        if let Some(handle) = self.lookup(address) {
            let label = &mut self.labels[handle.0];
            if !label.kind.is_code() { label.kind = kind; }
            label.processed = true;
            return handle;
        }

        let handle = LabelHandle(self.labels.len());
        self.labels.push(Label {
            address, kind,
            branch_class: BranchClass::Unknown,
            size: None,
            processed: true,
            is_func: false,
            name: None,
        });
        self.by_address.insert(address, handle);
        handle
    }

    /// Promotes a label to `BC = BL, isFunc = true` without touching its
    /// `processed` flag. Used by the renderer's mode-exchange pass, which
    /// runs after the worklist has already drained — unlike
    /// [`Self::add_function`], there is no analysis left to re-trigger.
    pub fn promote_to_function(&mut self, handle: LabelHandle) {
        let label = &mut self.labels[handle.0];
        label.branch_class = BranchClass::Bl;
        label.is_func = true;
    }

    /// Attaches an explicit name to a label, e.g. from a seed-config file.
    pub fn set_name(&mut self, handle: LabelHandle, name: String) {
        self.labels[handle.0].name = Some(name);
    }

    /// Records the decoded size of a label once its instruction run has
    /// been scanned.
    pub fn set_size(&mut self, handle: LabelHandle, size: u32) {
        self.labels[handle.0].size = Some(size);
    }

    /// Marks a label as having been visited by the worklist (or as an
    /// external reference that will never be decoded).
    pub fn mark_processed(&mut self, handle: LabelHandle) {
        self.labels[handle.0].processed = true;
    }

    /// Returns the handle of an unprocessed code label, if any remain. The
    /// worklist calls this in a loop until it returns `None`, the
    /// analyzer's termination condition. Order is unspecified; picking the
    /// lowest address keeps runs deterministic for tests without being load
    /// bearing for correctness.
    pub fn next_unprocessed(&self) -> Option<LabelHandle> {
        self.labels.iter()
            .enumerate()
            .filter(|(_, l)| l.kind.is_code() && !l.processed)
            .min_by_key(|(_, l)| l.address)
            .map(|(i, _)| LabelHandle(i))
    }

    /// All labels, sorted by address, for the renderer's single linear pass.
    pub fn sorted(&self) -> Vec<&Label> {
        let mut v: Vec<&Label> = self.labels.iter().collect();
        v.sort_by_key(|l| l.address);
        v
    }

    /// The number of labels recorded so far.
    pub fn len(&self) -> usize { self.labels.len() }

    /// Whether any labels have been recorded.
    pub fn is_empty(&self) -> bool { self.labels.is_empty() }
}

impl Default for LabelStore {
    fn default() -> LabelStore { LabelStore::new() }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_promoted_by_later_code_discovery() {
        let mut store = LabelStore::new();
        store.add_or_update(0x100, LabelKind::Data, BranchClass::Unknown);
        let h = store.add_or_update(0x100, LabelKind::ArmCode, BranchClass::Bl);
        assert_eq!(store.get(h).kind(), LabelKind::ArmCode);
        assert!(store.get(h).is_func());
    }

    #[test]
    fn is_func_is_absorbing() {
        let mut store = LabelStore::new();
        let h = store.add_or_update(0x100, LabelKind::ThumbCode, BranchClass::Bl);
        assert!(store.get(h).is_func());
        store.add_or_update(0x100, LabelKind::ThumbCode, BranchClass::B);
        assert!(store.get(h).is_func(), "isFunc must never be cleared once set");
        assert_eq!(store.get(h).branch_class(), BranchClass::Bl);
    }

    #[test]
    fn b_evidence_clears_a_prior_name() {
        let mut store = LabelStore::new();
        let h = store.add_or_update(0x100, LabelKind::ThumbCode, BranchClass::Unknown);
        store.set_name(h, "SomeName".to_string());
        store.add_or_update(0x100, LabelKind::ThumbCode, BranchClass::B);
        assert_eq!(store.get(h).name(), None);
    }

    #[test]
    fn promote_to_function_leaves_processed_alone() {
        let mut store = LabelStore::new();
        let h = store.add_or_update(0x400, LabelKind::ThumbCode, BranchClass::B);
        store.mark_processed(h);
        store.promote_to_function(h);
        assert!(store.get(h).is_func());
        assert_eq!(store.get(h).branch_class(), BranchClass::Bl);
        assert!(store.get(h).processed(), "rendering must never reopen the worklist");
    }

    #[test]
    fn indirect_call_reopens_a_processed_non_function_label() {
        let mut store = LabelStore::new();
        let h = store.add_or_update(0x200, LabelKind::ArmCode, BranchClass::B);
        store.set_size(h, 4);
        store.mark_processed(h);
        assert!(store.get(h).processed());
        store.add_function(0x200, LabelKind::ArmCode);
        assert!(!store.get(h).processed(), "reclassifying to a function must force re-analysis");
        assert!(store.get(h).is_func());
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
