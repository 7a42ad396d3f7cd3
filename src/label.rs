//! Bytecode position markers and the control-flow graph built over them.
//!
//! The `Label`/`Edge`/`Frame`/`Handler` graph is naturally cyclic (a handler
//! points at its range and target, blocks point at their successors). Rather
//! than a pointer graph with back-references, this crate uses an arena keyed
//! by stable integer ids: a `MethodWriter` owns a `Vec<Label>` and refers to
//! labels by their index (`LabelId`), so `Edge`/`Handler` can hold a plain
//! `LabelId` instead of needing `Rc`/weak references to break cycles.
//!
//! Forward-reference byte patching is *not* modeled here as a per-label patch
//! list — see `writer::method_writer` for why: that module stages
//! instructions as an IR and resolves every label's final `bytecode_offset`
//! in a layout fixpoint before any bytes are written, so there is never a
//! "slot to patch later".

use bitflags::bitflags;
use crate::frame::Frame;

pub type LabelId = usize;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct LabelFlags: u16 {
        /// Only carries line-number/local-variable-table info, not an actual jump target.
        const DEBUG_ONLY = 1 << 0;
        const JUMP_TARGET = 1 << 1;
        const RESOLVED = 1 << 2;
        const REACHABLE = 1 << 3;
        const SUBROUTINE_CALLER = 1 << 4;
        const SUBROUTINE_START = 1 << 5;
        const SUBROUTINE_END = 1 << 6;
    }
}

/// A CFG edge out of the basic block owned by some `Label`.
#[derive(Clone, Debug)]
pub struct Edge {
    pub target: LabelId,
    pub info: EdgeInfo,
}

#[derive(Clone, Debug)]
pub enum EdgeInfo {
    /// Ordinary successor edge (fall-through or taken branch). Carries the
    /// relative stack size at the jump, used by the max-stack fixpoint.
    Jump(i32),
    /// Edge into an exception handler; carries the caught type's internal
    /// name, or `None` for a catch-all (`finally`).
    Exception(Option<String>),
    /// The first of the two edges a `JSR` instruction adds: the "virtual"
    /// return-site edge used only to compute which blocks a `RET` can reach.
    SubroutineReturnSite,
}

#[derive(Clone, Debug)]
pub struct Label {
    pub flags: LabelFlags,
    /// Final position once known; set by the method writer's layout pass.
    pub bytecode_offset: Option<u32>,
    /// Line numbers recorded at this position, in visit order. A label can
    /// gain more than one if multiple source lines map to the same offset.
    pub line_numbers: Vec<u16>,
    /// Next basic block in bytecode (IR) order, for traversal during
    /// frame/stack-map emission.
    pub next_basic_block: Option<LabelId>,
    pub input_stack_size: u32,
    pub output_stack_max: u32,
    /// Set only for blocks ending in `RET`.
    pub output_stack_size: Option<u32>,
    pub subroutine_id: Option<u32>,
    pub edges: Vec<Edge>,
    pub frame: Option<Frame>,
}

impl Label {
    pub fn new() -> Self {
        Label {
            flags: LabelFlags::empty(),
            bytecode_offset: None,
            line_numbers: Vec::new(),
            next_basic_block: None,
            input_stack_size: 0,
            output_stack_max: 0,
            output_stack_size: None,
            subroutine_id: None,
            edges: Vec::new(),
            frame: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.flags.contains(LabelFlags::RESOLVED)
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::new()
    }
}

/// An exception-table entry.
#[derive(Clone, Debug)]
pub struct Handler {
    pub start: LabelId,
    pub end: LabelId,
    pub handler: LabelId,
    /// Constant-pool index of the caught type's `CONSTANT_Class`; 0 = catch-all.
    pub catch_type_index: u16,
    pub catch_type_name: Option<String>,
}

/// Owns every `Label` created while writing one method, addressed by
/// `LabelId`. A fresh arena per method keeps ids small and avoids any
/// cross-method aliasing.
#[derive(Default)]
pub struct LabelTable {
    labels: Vec<Label>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable { labels: Vec::new() }
    }

    pub fn new_label(&mut self) -> LabelId {
        self.labels.push(Label::new());
        self.labels.len() - 1
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.labels[id]
    }

    pub fn get_mut(&mut self, id: LabelId) -> &mut Label {
        &mut self.labels[id]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabelId, &Label)> {
        self.labels.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_start_unresolved() {
        let mut table = LabelTable::new();
        let id = table.new_label();
        assert!(!table.get(id).is_resolved());
    }

    #[test]
    fn resolving_sets_offset_and_flag() {
        let mut table = LabelTable::new();
        let id = table.new_label();
        let label = table.get_mut(id);
        label.bytecode_offset = Some(42);
        label.flags |= LabelFlags::RESOLVED;
        assert_eq!(table.get(id).bytecode_offset, Some(42));
        assert!(table.get(id).is_resolved());
    }
}
