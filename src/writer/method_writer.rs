//! Serializes one `method_info` structure and its `Code` attribute (JVMS §4.6/§4.7.3).
//!
//! Instructions are staged as an IR while the caller visits them, then laid
//! out in two passes: sizes and label offsets run to a fixpoint (so a jump
//! that widens from a 2-byte to a 4-byte offset shifts everything after it
//! and is re-checked), then final bytes are emitted once every jump distance
//! is known.

use crate::attribute::AttributeList;
use crate::bytevector::ByteVector;
use crate::constants::{attr, opcode};
use crate::descriptor::{self, MethodDescriptor};
use crate::error::{Error, Result};
use crate::frame::{AbstractType, CommonSuperClassResolver, Frame, ObjectSuperClassResolver};
use crate::label::{Handler, LabelId, LabelTable};
use crate::symbol::SymbolTable;
use crate::version;
use crate::visitor::{AnnotationVisitor, LdcValue, MethodVisitor};
use crate::writer::annotation_writer::{AnnotationWriter, ElementValueWriter};
use crate::writer::field_writer::write_annotations_attribute;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// How much work `MethodWriter` does to fill in `max_stack`/`max_locals`/`StackMapTable`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ComputeMode {
    /// The caller has already called `visit_max` (and, if targeting a
    /// version that needs one, provided `visitFrame`-equivalent data via
    /// `visit_attribute("StackMapTable", ...)`). Nothing is computed.
    Nothing,
    /// `max_stack`/`max_locals` are computed from the instruction stream;
    /// any `StackMapTable` the caller supplied via `visit_attribute` passes
    /// through unmodified.
    MaxStackAndLocal,
    /// Everything is computed, including a full `StackMapTable`.
    AllFrames,
}

struct LocalVariableEntry {
    name_index: u16,
    descriptor_index: u16,
    signature_index: Option<u16>,
    start: LabelId,
    end: LabelId,
    index: u16,
}

/// One decoded/visited instruction, kept in visit order until `serialize`
/// lays out and emits final bytes.
enum Instruction {
    Insn(u8),
    IntInsn(u8, i32),
    VarInsn(u8, u16),
    TypeInsn(u8, String),
    FieldInsn(u8, String, String, String),
    MethodInsn(u8, String, String, String, bool),
    InvokeDynamicInsn(String, String, u16),
    JumpInsn(u8, LabelId),
    Label(LabelId),
    LdcInsn(LdcValue),
    IincInsn(u16, i32),
    TableSwitchInsn { min: i32, max: i32, default: LabelId, targets: Vec<LabelId> },
    LookupSwitchInsn { default: LabelId, pairs: Vec<(i32, LabelId)> },
    MultiANewArrayInsn(String, u8),
    LineNumber(u16, LabelId),
}

pub struct MethodWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    major_version: u16,
    compute_mode: ComputeMode,
    access_flags: u16,
    name: String,
    descriptor: String,
    name_index: u16,
    descriptor_index: u16,
    signature_index: Option<u16>,
    exception_indices: Vec<u16>,
    labels: LabelTable,
    entry_label: Option<LabelId>,
    instructions: Vec<Instruction>,
    try_catch_blocks: Vec<Handler>,
    local_variables: Vec<LocalVariableEntry>,
    parameters: Vec<(Option<u16>, u16)>,
    visible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    invisible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    annotation_default: Option<Rc<RefCell<ByteVector>>>,
    has_code: bool,
    declared_max_stack: u16,
    declared_max_locals: u16,
    attributes: AttributeList,
    owner_hint: Option<String>,
    /// A complete, already-encoded `Code` attribute body, bypassing the
    /// instruction IR entirely. Set by a caller bit-copying a method from a
    /// source sharing this writer's `SymbolTable` with no transform applied.
    raw_code: Option<Vec<u8>>,
}

impl MethodWriter {
    pub fn new(
        symbols: Rc<RefCell<SymbolTable>>,
        major_version: u16,
        compute_mode: ComputeMode,
        access_flags: u16,
        name: &str,
        method_descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> Result<Self> {
        let (name_index, descriptor_index, signature_index, exception_indices) = {
            let mut st = symbols.borrow_mut();
            let name_index = st.add_constant_utf8(name)?;
            let descriptor_index = st.add_constant_utf8(method_descriptor)?;
            let signature_index = signature.map(|s| st.add_constant_utf8(s)).transpose()?;
            let exception_indices = exceptions
                .iter()
                .map(|e| st.add_constant_class(e))
                .collect::<Result<Vec<_>>>()?;
            (name_index, descriptor_index, signature_index, exception_indices)
        };
        Ok(MethodWriter {
            symbols,
            major_version,
            compute_mode,
            access_flags,
            name: name.to_owned(),
            descriptor: method_descriptor.to_owned(),
            name_index,
            descriptor_index,
            signature_index,
            exception_indices,
            labels: LabelTable::new(),
            entry_label: None,
            instructions: Vec::new(),
            try_catch_blocks: Vec::new(),
            local_variables: Vec::new(),
            parameters: Vec::new(),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            annotation_default: None,
            has_code: false,
            declared_max_stack: 0,
            declared_max_locals: 0,
            attributes: AttributeList::new(),
            owner_hint: None,
            raw_code: None,
        })
    }

    /// Supplies a pre-encoded `Code` attribute body verbatim, skipping
    /// instruction layout and `max_stack`/`max_locals`/`StackMapTable`
    /// recomputation entirely. The caller is responsible for having already
    /// copied every constant the body references into this writer's
    /// `SymbolTable` (true by construction when it's the same table a
    /// `ClassReader` decoded the method from).
    pub fn set_raw_code_attribute(&mut self, code_attribute_body: Vec<u8>) {
        self.has_code = true;
        self.raw_code = Some(code_attribute_body);
    }

    fn is_static(&self) -> bool {
        self.access_flags & 0x0008 != 0
    }

    fn is_abstract(&self) -> bool {
        self.access_flags & 0x0400 != 0
    }

    fn needs_synthetic_attribute(&self) -> bool {
        version::requires_synthetic_attribute(self.major_version) && self.access_flags & 0x1000 != 0
    }

    fn ensure_entry_label(&mut self) -> LabelId {
        if let Some(id) = self.entry_label {
            return id;
        }
        let id = self.labels.new_label();
        self.entry_label = Some(id);
        if !matches!(self.instructions.first(), Some(Instruction::Label(_))) {
            self.instructions.insert(0, Instruction::Label(id));
        }
        id
    }

    // --- Layout: instruction sizes, label offsets, jump widening fixpoint ----------------

    fn layout(&self) -> (Vec<u32>, HashMap<LabelId, u32>, Vec<bool>) {
        let mut wide = vec![false; self.instructions.len()];
        loop {
            let mut offsets = vec![0u32; self.instructions.len()];
            let mut label_offsets = HashMap::new();
            let mut offset = 0u32;
            for (i, insn) in self.instructions.iter().enumerate() {
                offsets[i] = offset;
                offset += instruction_size(insn, offset, wide[i]);
                if let Instruction::Label(id) = insn {
                    label_offsets.insert(*id, offsets[i]);
                }
            }
            let mut changed = false;
            for (i, insn) in self.instructions.iter().enumerate() {
                if let Instruction::JumpInsn(_, target) = insn {
                    if wide[i] {
                        continue;
                    }
                    let target_offset = *label_offsets.get(target).unwrap_or(&0) as i64;
                    let delta = target_offset - offsets[i] as i64;
                    if delta < i16::MIN as i64 || delta > i16::MAX as i64 {
                        wide[i] = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                return (offsets, label_offsets, wide);
            }
        }
    }

    /// Serializes the `Code` attribute body (everything after
    /// `attribute_length`), including the exception table and the
    /// `LineNumberTable`/`LocalVariableTable`/`StackMapTable` sub-attributes.
    fn serialize_code(&mut self) -> Result<ByteVector> {
        if let Some(raw) = &self.raw_code {
            let mut out = ByteVector::new();
            out.put_byte_array(raw);
            return Ok(out);
        }
        self.ensure_entry_label();
        let (max_stack, max_locals) = match self.compute_mode {
            ComputeMode::Nothing => (self.declared_max_stack, self.declared_max_locals),
            ComputeMode::MaxStackAndLocal | ComputeMode::AllFrames => self.compute_max_stack_and_locals(),
        };
        // `compute_frames` needs each instruction's resolved bytecode offset (to mark
        // `new`-created values as `Uninitialized(offset)`), so layout must run first.
        let (offsets, label_offsets, wide) = self.layout();
        let frames = match self.compute_mode {
            ComputeMode::AllFrames => Some(self.compute_frames(&offsets)),
            _ => None,
        };
        let mut code = ByteVector::new();
        for (i, insn) in self.instructions.iter().enumerate() {
            emit_instruction(&mut self.symbols, &mut code, insn, offsets[i], &label_offsets, wide[i])?;
        }
        if code.len() > u16::MAX as usize {
            return Err(Error::MethodTooLarge {
                class: self.owner_hint.clone().unwrap_or_default(),
                method: self.name.clone(),
                descriptor: self.descriptor.clone(),
                length: code.len(),
            });
        }

        let mut out = ByteVector::new();
        out.put_short(max_stack);
        out.put_short(max_locals);
        out.put_int(code.len() as u32);
        out.put_byte_array(code.as_bytes());

        out.put_short(self.try_catch_blocks.len() as u16);
        for handler in &self.try_catch_blocks {
            out.put_short(*label_offsets.get(&handler.start).unwrap_or(&0) as u16);
            out.put_short(*label_offsets.get(&handler.end).unwrap_or(&0) as u16);
            out.put_short(*label_offsets.get(&handler.handler).unwrap_or(&0) as u16);
            out.put_short(handler.catch_type_index);
        }

        let line_numbers: Vec<(u32, u16)> = self
            .instructions
            .iter()
            .filter_map(|insn| match insn {
                Instruction::LineNumber(line, label) => {
                    Some((*label_offsets.get(label).unwrap_or(&0), *line))
                }
                _ => None,
            })
            .collect();

        let mut attribute_count = 0u16;
        if !line_numbers.is_empty() {
            attribute_count += 1;
        }
        if !self.local_variables.is_empty() {
            attribute_count += 1;
        }
        let stack_map = frames.as_ref().map(|f| self.serialize_stack_map_table(f, &label_offsets));
        if stack_map.is_some() {
            attribute_count += 1;
        }
        out.put_short(attribute_count);

        if !line_numbers.is_empty() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::LINE_NUMBER_TABLE)?;
            drop(st);
            let mut body = ByteVector::new();
            body.put_short(line_numbers.len() as u16);
            for (offset, line) in &line_numbers {
                body.put_short(*offset as u16);
                body.put_short(*line);
            }
            out.put_short(name);
            out.put_int(body.len() as u32);
            out.put_byte_array(body.as_bytes());
        }

        if !self.local_variables.is_empty() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::LOCAL_VARIABLE_TABLE)?;
            drop(st);
            let mut body = ByteVector::new();
            body.put_short(self.local_variables.len() as u16);
            for entry in &self.local_variables {
                let start = *label_offsets.get(&entry.start).unwrap_or(&0);
                let end = *label_offsets.get(&entry.end).unwrap_or(&start);
                body.put_short(start as u16);
                body.put_short((end - start) as u16);
                body.put_short(entry.name_index);
                body.put_short(entry.descriptor_index);
                body.put_short(entry.index);
            }
            out.put_short(name);
            out.put_int(body.len() as u32);
            out.put_byte_array(body.as_bytes());
        }

        if let Some(stack_map) = stack_map {
            let stack_map = stack_map?;
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::STACK_MAP_TABLE)?;
            drop(st);
            out.put_short(name);
            out.put_int(stack_map.len() as u32);
            out.put_byte_array(stack_map.as_bytes());
        }

        Ok(out)
    }

    // --- max_stack / max_locals -----------------------------------------------------------

    fn compute_max_locals(&self) -> u16 {
        let mut max_index: u32 = 0;
        if !self.is_static() {
            max_index = max_index.max(1);
        }
        if let Some(descriptor) = MethodDescriptor::parse(&self.descriptor) {
            let mut index = if self.is_static() { 0 } else { 1 };
            for param in &descriptor.parameters {
                index += param.slot_size() as u32;
            }
            max_index = max_index.max(index);
        }
        for insn in &self.instructions {
            match insn {
                Instruction::VarInsn(code, index) => {
                    max_index = max_index.max(*index as u32 + var_insn_width(*code));
                }
                Instruction::IincInsn(index, _) => {
                    max_index = max_index.max(*index as u32 + 1);
                }
                _ => {}
            }
        }
        max_index.min(u16::MAX as u32) as u16
    }

    fn compute_max_stack_and_locals(&self) -> (u16, u16) {
        if self.is_abstract() || self.instructions.is_empty() {
            return (0, 0);
        }
        let entry_label = self.entry_label.expect("ensure_entry_label must run first");
        let blocks = basic_blocks(&self.instructions);
        let deltas: Vec<i64> = self.instructions.iter().map(stack_count_delta).collect();
        let handler_edges = handler_block_edges(&blocks, &self.try_catch_blocks);

        let mut input_stack: HashMap<LabelId, i64> = HashMap::new();
        input_stack.insert(entry_label, 0);
        let mut queue = VecDeque::from([entry_label]);
        let mut global_max: i64 = 0;

        while let Some(label) = queue.pop_front() {
            let Some(&(start, end)) = blocks.get(&label) else { continue };
            let input = input_stack[&label];
            let mut running = input;
            let mut terminated = false;
            for index in start..end {
                running += deltas[index];
                global_max = global_max.max(running);
                match &self.instructions[index] {
                    Instruction::JumpInsn(op, target) => {
                        propagate(&mut input_stack, &mut queue, *target, running);
                        if *op == opcode::GOTO {
                            terminated = true;
                            break;
                        }
                    }
                    Instruction::TableSwitchInsn { default, targets, .. } => {
                        propagate(&mut input_stack, &mut queue, *default, running);
                        for t in targets {
                            propagate(&mut input_stack, &mut queue, *t, running);
                        }
                        terminated = true;
                        break;
                    }
                    Instruction::LookupSwitchInsn { default, pairs } => {
                        propagate(&mut input_stack, &mut queue, *default, running);
                        for (_, t) in pairs {
                            propagate(&mut input_stack, &mut queue, *t, running);
                        }
                        terminated = true;
                        break;
                    }
                    Instruction::Insn(code) if is_terminal_insn(*code) => {
                        terminated = true;
                        break;
                    }
                    _ => {}
                }
            }
            if !terminated {
                if let Some(&next_label) = blocks.iter().find(|(_, &(s, _))| s == end).map(|(l, _)| l) {
                    propagate(&mut input_stack, &mut queue, next_label, running);
                }
            }
            for (handler, _) in handler_edges.get(&label).into_iter().flatten() {
                propagate(&mut input_stack, &mut queue, *handler, 1);
            }
        }

        (global_max.max(0) as u16, self.compute_max_locals())
    }

    // --- StackMapTable frame computation (ComputeMode::AllFrames) -----------------------

    fn initial_frame(&self) -> Frame {
        let mut locals = Vec::new();
        if !self.is_static() {
            locals.push(if self.name == "<init>" {
                AbstractType::UninitializedThis
            } else {
                AbstractType::Reference(self.current_class_hint())
            });
        }
        if let Some(descriptor) = MethodDescriptor::parse(&self.descriptor) {
            for param in descriptor.parameters {
                locals.push(field_type_to_abstract(&param));
            }
        }
        Frame { locals, stack: Vec::new() }
    }

    /// The writer doesn't carry its own class name (only `ClassWriter`
    /// does); `<init>`/instance-method `this` typing only needs *a* stable
    /// reference name for merge purposes, so callers that need the exact
    /// owner name pass it in via `set_owner_hint` before frame computation.
    /// Defaults to `java/lang/Object` when unset.
    fn current_class_hint(&self) -> String {
        self.owner_hint.clone().unwrap_or_else(|| "java/lang/Object".to_owned())
    }

    fn compute_frames(&mut self, offsets: &[u32]) -> HashMap<LabelId, Frame> {
        let entry_label = self.entry_label.expect("ensure_entry_label must run first");
        let blocks = basic_blocks(&self.instructions);
        let handler_edges = handler_block_edges(&blocks, &self.try_catch_blocks);
        let resolver: &dyn CommonSuperClassResolver = &ObjectSuperClassResolver;

        let mut frames: HashMap<LabelId, Frame> = HashMap::new();
        frames.insert(entry_label, self.initial_frame());
        let mut queue = VecDeque::from([entry_label]);

        while let Some(label) = queue.pop_front() {
            let Some(&(start, end)) = blocks.get(&label) else { continue };
            let mut frame = frames[&label].clone();
            let mut terminated = false;
            for index in start..end {
                let insn = &self.instructions[index];
                transfer(&mut frame, insn, offsets[index], resolver);
                match insn {
                    Instruction::JumpInsn(op, target) => {
                        propagate_frame(&mut frames, &mut queue, *target, &frame, resolver);
                        if *op == opcode::GOTO {
                            terminated = true;
                            break;
                        }
                    }
                    Instruction::TableSwitchInsn { default, targets, .. } => {
                        propagate_frame(&mut frames, &mut queue, *default, &frame, resolver);
                        for t in targets {
                            propagate_frame(&mut frames, &mut queue, *t, &frame, resolver);
                        }
                        terminated = true;
                        break;
                    }
                    Instruction::LookupSwitchInsn { default, pairs } => {
                        propagate_frame(&mut frames, &mut queue, *default, &frame, resolver);
                        for (_, t) in pairs {
                            propagate_frame(&mut frames, &mut queue, *t, &frame, resolver);
                        }
                        terminated = true;
                        break;
                    }
                    Instruction::Insn(code) if is_terminal_insn(*code) => {
                        terminated = true;
                        break;
                    }
                    _ => {}
                }
            }
            if !terminated {
                if let Some(&next_label) = blocks.iter().find(|(_, &(s, _))| s == end).map(|(l, _)| l) {
                    propagate_frame(&mut frames, &mut queue, next_label, &frame, resolver);
                }
            }
            for (handler, catch_type) in handler_edges.get(&label).into_iter().flatten() {
                let catch_type = catch_type.clone().unwrap_or_else(|| "java/lang/Throwable".to_owned());
                let handler_frame = Frame {
                    locals: frame.locals.clone(),
                    stack: vec![AbstractType::Reference(catch_type)],
                };
                propagate_frame(&mut frames, &mut queue, *handler, &handler_frame, resolver);
            }
        }
        frames
    }

    fn serialize_stack_map_table(&self, frames: &HashMap<LabelId, Frame>, label_offsets: &HashMap<LabelId, u32>) -> Result<ByteVector> {
        let entry_label = self.entry_label.expect("ensure_entry_label must run first");
        let targets = jump_target_labels(&self.instructions, &self.try_catch_blocks);
        let resolver: &dyn CommonSuperClassResolver = &ObjectSuperClassResolver;

        // Every reachable block has a frame in `frames`, but only the ones a
        // branch, switch, or handler can actually land on need a table entry;
        // labels that exist purely to mark a line-number or local-variable
        // range would otherwise get a spurious frame here.
        let mut entries: Vec<(u32, &Frame)> = frames
            .iter()
            .filter(|(label, _)| **label != entry_label && targets.contains(label))
            .map(|(label, frame)| (*label_offsets.get(label).unwrap_or(&0), frame))
            .collect();
        entries.sort_by_key(|(offset, _)| *offset);

        // Two distinct labels can still resolve to the same bytecode offset
        // (an empty block between them). They describe one verifier-visible
        // position, so merge their frames into a single entry rather than
        // emitting two frames a negative-delta clamp would silently conflate.
        let mut merged: Vec<(u32, Frame)> = Vec::with_capacity(entries.len());
        for (offset, frame) in entries {
            match merged.last_mut() {
                Some((last_offset, last_frame)) if *last_offset == offset => {
                    last_frame.merge(frame, resolver);
                }
                _ => merged.push((offset, frame.clone())),
            }
        }

        let mut out = ByteVector::new();
        out.put_short(merged.len() as u16);
        let mut previous = self.initial_frame();
        let mut previous_offset: i64 = -1;
        let mut symbols = self.symbols.borrow_mut();
        for (offset, frame) in &merged {
            let delta = *offset as i64 - previous_offset - 1;
            debug_assert!(delta >= 0, "stack map frames must be in strictly increasing offset order");
            write_frame(&mut symbols, &mut out, &previous, frame, delta.max(0) as u16)?;
            previous = frame.clone();
            previous_offset = *offset as i64;
        }
        Ok(out)
    }
}

/// Labels a branch, switch, or exception handler can actually transfer
/// control to — the only positions `StackMapTable` needs a frame at.
fn jump_target_labels(instructions: &[Instruction], handlers: &[Handler]) -> HashSet<LabelId> {
    let mut targets = HashSet::new();
    for insn in instructions {
        match insn {
            Instruction::JumpInsn(_, target) => {
                targets.insert(*target);
            }
            Instruction::TableSwitchInsn { default, targets: t, .. } => {
                targets.insert(*default);
                targets.extend(t.iter().copied());
            }
            Instruction::LookupSwitchInsn { default, pairs } => {
                targets.insert(*default);
                targets.extend(pairs.iter().map(|(_, t)| *t));
            }
            _ => {}
        }
    }
    for handler in handlers {
        targets.insert(handler.handler);
    }
    targets
}

fn propagate(input_stack: &mut HashMap<LabelId, i64>, queue: &mut VecDeque<LabelId>, target: LabelId, value: i64) {
    let slot = input_stack.entry(target).or_insert(i64::MIN);
    if value > *slot {
        *slot = value;
        queue.push_back(target);
    }
}

fn propagate_frame(
    frames: &mut HashMap<LabelId, Frame>,
    queue: &mut VecDeque<LabelId>,
    target: LabelId,
    incoming: &Frame,
    resolver: &dyn CommonSuperClassResolver,
) {
    match frames.get_mut(&target) {
        None => {
            frames.insert(target, incoming.clone());
            queue.push_back(target);
        }
        Some(existing) => {
            if existing.merge(incoming, resolver) {
                queue.push_back(target);
            }
        }
    }
}

fn basic_blocks(instructions: &[Instruction]) -> HashMap<LabelId, (usize, usize)> {
    let mut blocks = HashMap::new();
    let mut current: Option<(LabelId, usize)> = None;
    for (i, insn) in instructions.iter().enumerate() {
        if let Instruction::Label(id) = insn {
            if let Some((label, start)) = current {
                blocks.insert(label, (start, i));
            }
            current = Some((*id, i));
        }
    }
    if let Some((label, start)) = current {
        blocks.insert(label, (start, instructions.len()));
    }
    blocks
}

fn label_instruction_indices(instructions: &[Instruction]) -> HashMap<LabelId, usize> {
    instructions
        .iter()
        .enumerate()
        .filter_map(|(i, insn)| match insn {
            Instruction::Label(id) => Some((*id, i)),
            _ => None,
        })
        .collect()
}

fn handler_block_edges(
    blocks: &HashMap<LabelId, (usize, usize)>,
    handlers: &[Handler],
) -> HashMap<LabelId, Vec<(LabelId, Option<String>)>> {
    let mut edges: HashMap<LabelId, Vec<(LabelId, Option<String>)>> = HashMap::new();
    let label_index: HashMap<LabelId, usize> = blocks.iter().map(|(&l, &(s, _))| (l, s)).collect();
    for handler in handlers {
        let (Some(&start_idx), Some(&end_idx)) = (label_index.get(&handler.start), label_index.get(&handler.end)) else {
            continue;
        };
        for (&label, &(block_start, _)) in blocks {
            if block_start >= start_idx && block_start < end_idx {
                edges.entry(label).or_default().push((handler.handler, handler.catch_type_name.clone()));
            }
        }
    }
    edges
}

fn is_terminal_insn(op: u8) -> bool {
    matches!(op, opcode::IRETURN..=opcode::RETURN | opcode::ATHROW)
}

fn var_insn_width(op: u8) -> u32 {
    matches!(op, opcode::LLOAD | opcode::LSTORE | opcode::DLOAD | opcode::DSTORE) as u32 + 1
}

/// `iload`/`istore` and friends have dedicated one-byte opcodes for local
/// indices 0 through 3 (`iload_0` .. `iload_3`). Picks the short form when
/// it applies, so the layout pass sizes instructions the same way the final
/// emission does.
fn short_var_opcode(code: u8, index: u16) -> Option<u8> {
    if index > 3 {
        return None;
    }
    let base = match code {
        opcode::ILOAD => opcode::ILOAD_0,
        opcode::LLOAD => opcode::LLOAD_0,
        opcode::FLOAD => opcode::FLOAD_0,
        opcode::DLOAD => opcode::DLOAD_0,
        opcode::ALOAD => opcode::ALOAD_0,
        opcode::ISTORE => opcode::ISTORE_0,
        opcode::LSTORE => opcode::LSTORE_0,
        opcode::FSTORE => opcode::FSTORE_0,
        opcode::DSTORE => opcode::DSTORE_0,
        opcode::ASTORE => opcode::ASTORE_0,
        _ => return None,
    };
    Some(base + index as u8)
}

fn field_type_to_abstract(field_type: &crate::descriptor::FieldType) -> AbstractType {
    use crate::descriptor::FieldType;
    match field_type {
        FieldType::Int | FieldType::Boolean | FieldType::Byte | FieldType::Char | FieldType::Short => AbstractType::Integer,
        FieldType::Float => AbstractType::Float,
        FieldType::Long => AbstractType::Long,
        FieldType::Double => AbstractType::Double,
        FieldType::Object(name) => AbstractType::Reference(name.clone()),
        FieldType::Array(_) => AbstractType::Reference(field_type.to_string()),
    }
}

/// Net operand-stack slot-count delta of one instruction. Precise for every
/// opcode; used both by the `MaxStackAndLocal` worklist directly and to
/// cross-check `transfer`'s type-level push/pop counts for `AllFrames`.
fn stack_count_delta(insn: &Instruction) -> i64 {
    match insn {
        Instruction::Insn(code) => fixed_insn_delta(*code),
        Instruction::IntInsn(code, _) => if *code == opcode::NEWARRAY { 0 } else { 1 },
        Instruction::VarInsn(code, _) => var_insn_delta(*code),
        Instruction::TypeInsn(code, _) => if *code == opcode::NEW { 1 } else { 0 },
        Instruction::FieldInsn(code, _, _, descriptor) => {
            let size = descriptor::field_type_slot_size(descriptor) as i64;
            match *code {
                opcode::GETSTATIC => size,
                opcode::PUTSTATIC => -size,
                opcode::GETFIELD => size - 1,
                opcode::PUTFIELD => -size - 1,
                _ => 0,
            }
        }
        Instruction::MethodInsn(code, _, _, descriptor, _) => {
            let (args, ret) = MethodDescriptor::parse(descriptor)
                .map(|d| (d.argument_stack_size() as i64, d.return_stack_size() as i64))
                .unwrap_or((0, 0));
            let receiver = if *code == opcode::INVOKESTATIC { 0 } else { 1 };
            ret - args - receiver
        }
        Instruction::InvokeDynamicInsn(_, descriptor, _) => MethodDescriptor::parse(descriptor)
            .map(|d| d.return_stack_size() as i64 - d.argument_stack_size() as i64)
            .unwrap_or(0),
        Instruction::JumpInsn(code, _) => jump_insn_delta(*code),
        Instruction::Label(_) | Instruction::LineNumber(..) | Instruction::IincInsn(..) => 0,
        Instruction::LdcInsn(value) => ldc_delta(value),
        Instruction::TableSwitchInsn { .. } | Instruction::LookupSwitchInsn { .. } => -1,
        Instruction::MultiANewArrayInsn(_, dimensions) => 1 - *dimensions as i64,
    }
}

fn fixed_insn_delta(op: u8) -> i64 {
    match op {
        opcode::ACONST_NULL => 1,
        0x02..=0x08 => 1,                          // iconst_m1..iconst_5
        0x09..=0x0a => 2,                          // lconst_0/1
        0x0b..=0x0d => 1,                          // fconst_0..2
        0x0e..=0x0f => 2,                          // dconst_0/1
        0x2e | 0x30 | 0x32..=0x35 => -1,           // iaload/faload/aaload/baload/caload/saload
        0x2f | 0x31 => 0,                          // laload/daload
        0x4f | 0x51 | 0x53..=0x56 => -3,           // iastore/fastore/aastore/bastore/castore/sastore
        0x50 | 0x52 => -4,                         // lastore/dastore
        opcode::POP => -1,
        opcode::POP2 => -2,
        opcode::DUP | opcode::DUP_X1 | opcode::DUP_X2 => 1,
        opcode::DUP2 | 0x5d | 0x5e => 2,           // dup2/dup2_x1/dup2_x2
        opcode::SWAP => 0,
        0x60 | 0x64 | 0x68 | 0x6c | 0x70 | 0x7e | 0x80 | 0x82 => -1, // iadd/isub/imul/idiv/irem/iand/ior/ixor
        0x61 | 0x65 | 0x69 | 0x6d | 0x71 | 0x7f | 0x81 | 0x83 => -2, // ladd/lsub/lmul/ldiv/lrem/land/lor/lxor
        0x62 | 0x66 | 0x6a | 0x6e | 0x72 => -1,    // fadd/fsub/fmul/fdiv/frem
        0x63 | 0x67 | 0x6b | 0x6f | 0x73 => -2,    // dadd/dsub/dmul/ddiv/drem
        0x74 | 0x76 => 0,                          // ineg/fneg
        0x75 | 0x77 => 0,                          // lneg/dneg
        0x78 | 0x7a | 0x7c => -1,                  // ishl/ishr/iushr
        0x79 | 0x7b | 0x7d => -1,                  // lshl/lshr/lushr (shift amount pops as a single int)
        opcode::I2L | opcode::I2D => 1,
        opcode::I2F => 0,
        opcode::L2I | opcode::L2F => -1,
        0x8a => 0,                                 // l2d
        opcode::F2I => 0,
        0x8c | 0x8d => 1,                          // f2l/f2d
        opcode::D2I => -1,
        0x8f => -1,                                // d2f
        0x90 => 0,                                 // d2l
        opcode::I2B | opcode::I2C | opcode::I2S => 0,
        opcode::LCMP => -3,                        // pop 2 longs, push int
        opcode::FCMPL | 0x96 => -1,                // fcmpl/fcmpg
        opcode::DCMPL | 0x98 => -3,                // dcmpl/dcmpg
        opcode::IRETURN | opcode::FRETURN | opcode::ARETURN => -1,
        opcode::LRETURN | opcode::DRETURN => -2,
        opcode::RETURN => 0,
        opcode::ARRAYLENGTH => 0,
        opcode::ATHROW => -1,
        opcode::MONITORENTER | opcode::MONITOREXIT => -1,
        _ => 0,
    }
}

fn var_insn_delta(op: u8) -> i64 {
    match op {
        opcode::ILOAD | opcode::FLOAD | opcode::ALOAD => 1,
        opcode::LLOAD | opcode::DLOAD => 2,
        opcode::ISTORE | opcode::FSTORE | opcode::ASTORE => -1,
        opcode::LSTORE | opcode::DSTORE => -2,
        opcode::RET => 0,
        _ => 0,
    }
}

fn jump_insn_delta(op: u8) -> i64 {
    match op {
        opcode::IFEQ..=opcode::IFLE => -1,
        opcode::IF_ICMPEQ..=opcode::IF_ACMPNE => -2,
        opcode::GOTO => 0,
        opcode::JSR => 1,
        opcode::IFNULL | opcode::IFNONNULL => -1,
        _ => 0,
    }
}

fn ldc_delta(value: &LdcValue) -> i64 {
    match value {
        LdcValue::Long(_) | LdcValue::Double(_) => 2,
        LdcValue::Dynamic { descriptor, .. } => descriptor::field_type_slot_size(descriptor) as i64,
        _ => 1,
    }
}

fn negate_condition(op: u8) -> u8 {
    match op {
        opcode::IFEQ => opcode::IFNE,
        opcode::IFNE => opcode::IFEQ,
        opcode::IFLT => opcode::IFGE,
        opcode::IFGE => opcode::IFLT,
        opcode::IFGT => opcode::IFLE,
        opcode::IFLE => opcode::IFGT,
        opcode::IF_ICMPEQ => opcode::IF_ICMPNE,
        opcode::IF_ICMPNE => opcode::IF_ICMPEQ,
        opcode::IF_ICMPLT => opcode::IF_ICMPGE,
        opcode::IF_ICMPGE => opcode::IF_ICMPLT,
        opcode::IF_ICMPGT => opcode::IF_ICMPLE,
        opcode::IF_ICMPLE => opcode::IF_ICMPGT,
        opcode::IF_ACMPEQ => opcode::IF_ACMPNE,
        opcode::IF_ACMPNE => opcode::IF_ACMPEQ,
        opcode::IFNULL => opcode::IFNONNULL,
        opcode::IFNONNULL => opcode::IFNULL,
        other => other,
    }
}

fn instruction_size(insn: &Instruction, offset: u32, wide_jump: bool) -> u32 {
    match insn {
        Instruction::Insn(_) => 1,
        Instruction::IntInsn(code, _) => if *code == opcode::SIPUSH { 3 } else { 2 },
        Instruction::VarInsn(code, index) => {
            if *code == opcode::RET || *index > 255 {
                4
            } else if short_var_opcode(*code, *index).is_some() {
                1
            } else {
                2
            }
        }
        Instruction::TypeInsn(..) => 3,
        Instruction::FieldInsn(..) => 3,
        Instruction::MethodInsn(code, ..) => if *code == opcode::INVOKEINTERFACE { 5 } else { 3 },
        Instruction::InvokeDynamicInsn(..) => 5,
        Instruction::JumpInsn(code, _) => {
            if *code == opcode::GOTO || *code == opcode::JSR {
                if wide_jump { 5 } else { 3 }
            } else if wide_jump {
                8
            } else {
                3
            }
        }
        Instruction::Label(_) | Instruction::LineNumber(..) => 0,
        Instruction::LdcInsn(value) => if matches!(value, LdcValue::Long(_) | LdcValue::Double(_)) { 3 } else { 2 },
        Instruction::IincInsn(index, increment) => if *index > 255 || *increment < -128 || *increment > 127 { 6 } else { 3 },
        Instruction::TableSwitchInsn { min, max, targets, .. } => {
            let pad = (4 - (offset + 1) % 4) % 4;
            let _ = targets;
            1 + pad + 12 + 4 * (max - min + 1).max(0) as u32
        }
        Instruction::LookupSwitchInsn { pairs, .. } => {
            let pad = (4 - (offset + 1) % 4) % 4;
            1 + pad + 8 + 8 * pairs.len() as u32
        }
        Instruction::MultiANewArrayInsn(..) => 4,
    }
}

fn emit_instruction(
    symbols: &mut Rc<RefCell<SymbolTable>>,
    out: &mut ByteVector,
    insn: &Instruction,
    offset: u32,
    label_offsets: &HashMap<LabelId, u32>,
    wide_jump: bool,
) -> Result<()> {
    match insn {
        Instruction::Insn(code) => {
            out.put_byte(*code);
        }
        Instruction::IntInsn(code, value) => {
            out.put_byte(*code);
            if *code == opcode::SIPUSH {
                out.put_short(*value as u16);
            } else {
                out.put_byte(*value as u8);
            }
        }
        Instruction::VarInsn(code, index) => {
            if *code == opcode::RET || *index > 255 {
                out.put_byte(opcode::WIDE);
                out.put_byte(*code);
                out.put_short(*index);
            } else if let Some(short) = short_var_opcode(*code, *index) {
                out.put_byte(short);
            } else {
                out.put_byte(*code);
                out.put_byte(*index as u8);
            }
        }
        Instruction::TypeInsn(code, name) => {
            let index = symbols.borrow_mut().add_constant_class(name)?;
            out.put_byte(*code);
            out.put_short(index);
        }
        Instruction::FieldInsn(code, owner, name, descriptor) => {
            let index = symbols.borrow_mut().add_constant_field_ref(owner, name, descriptor)?;
            out.put_byte(*code);
            out.put_short(index);
        }
        Instruction::MethodInsn(code, owner, name, descriptor, is_interface) => {
            let index = symbols.borrow_mut().add_constant_method_ref(owner, name, descriptor, *is_interface)?;
            out.put_byte(*code);
            out.put_short(index);
            if *code == opcode::INVOKEINTERFACE {
                let count = 1 + descriptor::MethodDescriptor::parse(descriptor).map(|d| d.argument_stack_size()).unwrap_or(0);
                out.put_byte(count as u8);
                out.put_byte(0);
            }
        }
        Instruction::InvokeDynamicInsn(name, descriptor, bootstrap_index) => {
            let index = symbols.borrow_mut().add_constant_invoke_dynamic(name, descriptor, *bootstrap_index)?;
            out.put_byte(opcode::INVOKEDYNAMIC);
            out.put_short(index);
            out.put_short(0);
        }
        Instruction::JumpInsn(code, target) => {
            let target_offset = *label_offsets.get(target).unwrap_or(&0) as i64;
            if *code == opcode::GOTO || *code == opcode::JSR {
                let wide_op = if *code == opcode::GOTO { opcode::GOTO_W } else { opcode::JSR_W };
                if wide_jump {
                    out.put_byte(wide_op);
                    out.put_int((target_offset - offset as i64) as u32);
                } else {
                    out.put_byte(*code);
                    out.put_short((target_offset - offset as i64) as u16);
                }
            } else if wide_jump {
                out.put_byte(negate_condition(*code));
                out.put_short(8);
                out.put_byte(opcode::GOTO_W);
                out.put_int((target_offset - (offset as i64 + 3)) as u32);
            } else {
                out.put_byte(*code);
                out.put_short((target_offset - offset as i64) as u16);
            }
        }
        Instruction::Label(_) | Instruction::LineNumber(..) => {}
        Instruction::LdcInsn(value) => {
            let mut st = symbols.borrow_mut();
            let (index, wide) = match value {
                LdcValue::Int(v) => (st.add_constant_integer(*v)?, false),
                LdcValue::Float(v) => (st.add_constant_float(*v)?, false),
                LdcValue::Long(v) => (st.add_constant_long(*v)?, true),
                LdcValue::Double(v) => (st.add_constant_double(*v)?, true),
                LdcValue::String(v) => (st.add_constant_string(v)?, false),
                LdcValue::Class(v) => (st.add_constant_class(v)?, false),
                LdcValue::MethodType(v) => (st.add_constant_method_type(v)?, false),
                LdcValue::MethodHandle { reference_kind, owner, name, descriptor, is_interface } => {
                    (st.add_constant_method_handle(*reference_kind, owner, name, descriptor, *is_interface)?, false)
                }
                LdcValue::Dynamic { name, descriptor, bootstrap_method_index } => {
                    (st.add_constant_dynamic(name, descriptor, *bootstrap_method_index)?, false)
                }
            };
            drop(st);
            if wide {
                out.put_byte(opcode::LDC2_W);
                out.put_short(index);
            } else if index <= u8::MAX as u16 {
                out.put_byte(opcode::LDC);
                out.put_byte(index as u8);
            } else {
                out.put_byte(opcode::LDC_W);
                out.put_short(index);
            }
        }
        Instruction::IincInsn(index, increment) => {
            if *index > 255 || *increment < -128 || *increment > 127 {
                out.put_byte(opcode::WIDE);
                out.put_byte(opcode::IINC);
                out.put_short(*index);
                out.put_short(*increment as u16);
            } else {
                out.put_byte(opcode::IINC);
                out.put_byte(*index as u8);
                out.put_byte(*increment as u8);
            }
        }
        Instruction::TableSwitchInsn { min, max, default, targets } => {
            out.put_byte(opcode::TABLESWITCH);
            while out.len() as u32 % 4 != 0 {
                out.put_byte(0);
            }
            let default_offset = *label_offsets.get(default).unwrap_or(&0) as i64 - offset as i64;
            out.put_int(default_offset as u32);
            out.put_int(*min as u32);
            out.put_int(*max as u32);
            for target in targets {
                let target_offset = *label_offsets.get(target).unwrap_or(&0) as i64 - offset as i64;
                out.put_int(target_offset as u32);
            }
        }
        Instruction::LookupSwitchInsn { default, pairs } => {
            out.put_byte(opcode::LOOKUPSWITCH);
            while out.len() as u32 % 4 != 0 {
                out.put_byte(0);
            }
            let default_offset = *label_offsets.get(default).unwrap_or(&0) as i64 - offset as i64;
            out.put_int(default_offset as u32);
            out.put_int(pairs.len() as u32);
            for (key, target) in pairs {
                out.put_int(*key as u32);
                let target_offset = *label_offsets.get(target).unwrap_or(&0) as i64 - offset as i64;
                out.put_int(target_offset as u32);
            }
        }
        Instruction::MultiANewArrayInsn(descriptor, dimensions) => {
            let index = symbols.borrow_mut().add_constant_class(descriptor)?;
            out.put_byte(opcode::MULTIANEWARRAY);
            out.put_short(index);
            out.put_byte(*dimensions);
        }
    }
    Ok(())
}

/// Type-level transfer function for `AllFrames` mode. Precise for the
/// instructions most bytecode is made of (constants, locals, fields, calls,
/// `new`/`checkcast`, arithmetic); anything not explicitly modeled falls
/// back to pushing `Top`-typed values sized by `stack_count_delta`, which
/// keeps frame *shapes* consistent even where the emitted type is imprecise.
fn transfer(frame: &mut Frame, insn: &Instruction, offset: u32, resolver: &dyn CommonSuperClassResolver) {
    let _ = resolver;
    match insn {
        Instruction::Insn(code) => transfer_fixed(frame, *code),
        Instruction::IntInsn(code, _) => {
            if *code == opcode::NEWARRAY {
                frame.stack.pop();
                frame.stack.push(AbstractType::Reference("[?".to_owned()));
            } else {
                frame.stack.push(AbstractType::Integer);
            }
        }
        Instruction::VarInsn(code, index) => match *code {
            opcode::ILOAD => frame.stack.push(AbstractType::Integer),
            opcode::FLOAD => frame.stack.push(AbstractType::Float),
            opcode::LLOAD => frame.stack.push(AbstractType::Long),
            opcode::DLOAD => frame.stack.push(AbstractType::Double),
            opcode::ALOAD => {
                let t = frame.locals.get(*index as usize).cloned().unwrap_or(AbstractType::Top);
                frame.stack.push(t);
            }
            opcode::ISTORE | opcode::FSTORE | opcode::LSTORE | opcode::DSTORE | opcode::ASTORE => {
                if let Some(t) = frame.stack.pop() {
                    set_local(frame, *index as usize, t);
                }
            }
            _ => {}
        },
        Instruction::TypeInsn(code, name) => match *code {
            // The marker is the `new`'s own bytecode offset, per JVMS
            // `Uninitialized_variable_info` — stack depth would alias two
            // `new`s reached at the same depth from different blocks.
            opcode::NEW => frame.stack.push(AbstractType::Uninitialized(offset)),
            opcode::ANEWARRAY => {
                frame.stack.pop();
                frame.stack.push(AbstractType::Reference(format!("[L{name};")));
            }
            opcode::CHECKCAST => {
                frame.stack.pop();
                frame.stack.push(AbstractType::Reference(name.clone()));
            }
            opcode::INSTANCEOF => {
                frame.stack.pop();
                frame.stack.push(AbstractType::Integer);
            }
            _ => {}
        },
        Instruction::FieldInsn(code, _, _, descriptor) => {
            let field_type = crate::descriptor::parse_field_type(descriptor);
            let abstract_type = field_type.as_ref().map(field_type_to_abstract).unwrap_or(AbstractType::Top);
            match *code {
                opcode::GETSTATIC => frame.stack.push(abstract_type),
                opcode::PUTSTATIC => {
                    frame.stack.pop();
                }
                opcode::GETFIELD => {
                    frame.stack.pop();
                    frame.stack.push(abstract_type);
                }
                opcode::PUTFIELD => {
                    frame.stack.pop();
                    frame.stack.pop();
                }
                _ => {}
            }
        }
        Instruction::MethodInsn(code, owner, name, descriptor, _) => {
            let parsed = MethodDescriptor::parse(descriptor);
            if let Some(parsed) = &parsed {
                for _ in 0..parsed.parameters.len() {
                    frame.stack.pop();
                }
            }
            if *code != opcode::INVOKESTATIC {
                let receiver = frame.stack.pop();
                if *code == opcode::INVOKESPECIAL && name == "<init>" {
                    if let Some(AbstractType::Uninitialized(marker)) = receiver {
                        replace_uninitialized(frame, marker, owner.clone());
                    }
                }
            }
            if let Some(parsed) = parsed {
                if let Some(ret) = parsed.return_type {
                    frame.stack.push(field_type_to_abstract(&ret));
                }
            }
        }
        Instruction::InvokeDynamicInsn(_, descriptor, _) => {
            if let Some(parsed) = MethodDescriptor::parse(descriptor) {
                for _ in 0..parsed.parameters.len() {
                    frame.stack.pop();
                }
                if let Some(ret) = parsed.return_type {
                    frame.stack.push(field_type_to_abstract(&ret));
                }
            }
        }
        Instruction::JumpInsn(code, _) => {
            if matches!(*code, opcode::IF_ICMPEQ..=opcode::IF_ACMPNE) {
                frame.stack.pop();
                frame.stack.pop();
            } else if !matches!(*code, opcode::GOTO | opcode::JSR) {
                frame.stack.pop();
            }
        }
        Instruction::Label(_) | Instruction::LineNumber(..) => {}
        Instruction::LdcInsn(value) => frame.stack.push(ldc_abstract_type(value)),
        Instruction::IincInsn(..) => {}
        Instruction::TableSwitchInsn { .. } | Instruction::LookupSwitchInsn { .. } => {
            frame.stack.pop();
        }
        Instruction::MultiANewArrayInsn(descriptor, dimensions) => {
            for _ in 0..*dimensions {
                frame.stack.pop();
            }
            frame.stack.push(AbstractType::Reference(descriptor.clone()));
        }
    }
}

fn set_local(frame: &mut Frame, index: usize, value: AbstractType) {
    if frame.locals.len() <= index {
        frame.locals.resize(index + 1, AbstractType::Top);
    }
    frame.locals[index] = value;
}

fn replace_uninitialized(frame: &mut Frame, marker: u32, class_name: String) {
    for slot in frame.locals.iter_mut().chain(frame.stack.iter_mut()) {
        if *slot == AbstractType::Uninitialized(marker) || *slot == AbstractType::UninitializedThis {
            *slot = AbstractType::Reference(class_name.clone());
        }
    }
}

fn ldc_abstract_type(value: &LdcValue) -> AbstractType {
    match value {
        LdcValue::Int(_) => AbstractType::Integer,
        LdcValue::Float(_) => AbstractType::Float,
        LdcValue::Long(_) => AbstractType::Long,
        LdcValue::Double(_) => AbstractType::Double,
        LdcValue::String(_) => AbstractType::Reference("java/lang/String".to_owned()),
        LdcValue::Class(_) => AbstractType::Reference("java/lang/Class".to_owned()),
        LdcValue::MethodType(_) => AbstractType::Reference("java/lang/invoke/MethodType".to_owned()),
        LdcValue::MethodHandle { .. } => AbstractType::Reference("java/lang/invoke/MethodHandle".to_owned()),
        LdcValue::Dynamic { descriptor, .. } => crate::descriptor::parse_field_type(descriptor)
            .map(|t| field_type_to_abstract(&t))
            .unwrap_or(AbstractType::Top),
    }
}

fn transfer_fixed(frame: &mut Frame, op: u8) {
    let mut pop = |frame: &mut Frame| frame.stack.pop();
    match op {
        opcode::ACONST_NULL => frame.stack.push(AbstractType::Null),
        0x02..=0x08 => frame.stack.push(AbstractType::Integer),
        0x09..=0x0a => frame.stack.push(AbstractType::Long),
        0x0b..=0x0d => frame.stack.push(AbstractType::Float),
        0x0e..=0x0f => frame.stack.push(AbstractType::Double),
        opcode::IRETURN | opcode::FRETURN | opcode::LRETURN | opcode::DRETURN | opcode::ARETURN | opcode::ATHROW => {
            frame.stack.clear();
        }
        opcode::RETURN => frame.stack.clear(),
        opcode::POP | opcode::POP2 => {
            pop(frame);
        }
        opcode::DUP => {
            if let Some(top) = frame.stack.last().cloned() {
                frame.stack.push(top);
            }
        }
        opcode::SWAP => {
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v1);
            frame.stack.push(v2);
        }
        opcode::DUP_X1 => {
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v1.clone());
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::DUP_X2 => {
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            let v3 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v1.clone());
            frame.stack.push(v3);
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        // Modeled as the all-category-1 form; the category-2 (single wide
        // operand) form isn't distinguished here, matching this function's
        // documented fallback-to-approximate policy for less common shapes.
        opcode::DUP2 => {
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v2.clone());
            frame.stack.push(v1.clone());
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        0x5d => {
            // dup2_x1
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            let v3 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v2.clone());
            frame.stack.push(v1.clone());
            frame.stack.push(v3);
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        0x5e => {
            // dup2_x2
            let v1 = pop(frame).unwrap_or(AbstractType::Top);
            let v2 = pop(frame).unwrap_or(AbstractType::Top);
            let v3 = pop(frame).unwrap_or(AbstractType::Top);
            let v4 = pop(frame).unwrap_or(AbstractType::Top);
            frame.stack.push(v2.clone());
            frame.stack.push(v1.clone());
            frame.stack.push(v4);
            frame.stack.push(v3);
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::ARRAYLENGTH => {
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        opcode::LCMP | opcode::FCMPL | 0x96 | opcode::DCMPL | 0x98 => {
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        0x60 | 0x64 | 0x68 | 0x6c | 0x70 | 0x7e | 0x80 | 0x82 => {
            // iadd/isub/imul/idiv/irem/iand/ior/ixor
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        0x61 | 0x65 | 0x69 | 0x6d | 0x71 | 0x7f | 0x81 | 0x83 => {
            // ladd/lsub/lmul/ldiv/lrem/land/lor/lxor
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Long);
        }
        0x62 | 0x66 | 0x6a | 0x6e | 0x72 => {
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Float);
        }
        0x63 | 0x67 | 0x6b | 0x6f | 0x73 => {
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Double);
        }
        0x74 | 0x76 => {
            // ineg/fneg: operate in place, type unchanged.
        }
        0x75 | 0x77 => {
            // lneg/dneg: same.
        }
        0x78 | 0x7a | 0x7c => {
            // ishl/ishr/iushr: pop shift amount, leave an int on top.
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        0x79 | 0x7b | 0x7d => {
            // lshl/lshr/lushr: pop int shift amount, leave a long on top.
            pop(frame);
            pop(frame);
            frame.stack.push(AbstractType::Long);
        }
        opcode::I2L => {
            pop(frame);
            frame.stack.push(AbstractType::Long);
        }
        opcode::I2F => {
            pop(frame);
            frame.stack.push(AbstractType::Float);
        }
        opcode::I2D => {
            pop(frame);
            frame.stack.push(AbstractType::Double);
        }
        opcode::L2I => {
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        opcode::L2F => {
            pop(frame);
            frame.stack.push(AbstractType::Float);
        }
        0x8a => {
            // l2d
            pop(frame);
            frame.stack.push(AbstractType::Double);
        }
        opcode::F2I => {
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        0x8c => {
            // f2l
            pop(frame);
            frame.stack.push(AbstractType::Long);
        }
        0x8d => {
            // f2d
            pop(frame);
            frame.stack.push(AbstractType::Double);
        }
        opcode::D2I => {
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        0x8f => {
            // d2f
            pop(frame);
            frame.stack.push(AbstractType::Float);
        }
        0x90 => {
            // d2l
            pop(frame);
            frame.stack.push(AbstractType::Long);
        }
        opcode::I2B | opcode::I2C | opcode::I2S => {
            pop(frame);
            frame.stack.push(AbstractType::Integer);
        }
        opcode::NOP => {}
        _ => {
            // Conservative fallback: assume one push of unknown type.
            frame.stack.push(AbstractType::Top);
        }
    }
}

fn write_frame(symbols: &mut SymbolTable, out: &mut ByteVector, previous: &Frame, current: &Frame, offset_delta: u16) -> Result<()> {
    // Compressed encoding per JVMS §4.7.4: SAME/APPEND/CHOP/FULL forms,
    // SAME_LOCALS_1_STACK_ITEM when it fits exactly.
    if current.locals == previous.locals && current.stack.is_empty() {
        if offset_delta <= 63 {
            out.put_byte(offset_delta as u8);
        } else {
            out.put_byte(251);
            out.put_short(offset_delta);
        }
        return Ok(());
    }
    if current.locals == previous.locals && current.stack.len() == 1 {
        if offset_delta <= 63 {
            out.put_byte(64 + offset_delta as u8);
        } else {
            out.put_byte(247);
            out.put_short(offset_delta);
        }
        write_verification_type(symbols, out, &current.stack[0])?;
        return Ok(());
    }
    if current.stack.is_empty() && current.locals.len() > previous.locals.len() && current.locals[..previous.locals.len()] == previous.locals[..] {
        let appended = current.locals.len() - previous.locals.len();
        if appended <= 3 {
            out.put_byte(251 + appended as u8);
            out.put_short(offset_delta);
            for local in &current.locals[previous.locals.len()..] {
                write_verification_type(symbols, out, local)?;
            }
            return Ok(());
        }
    }
    if current.stack.is_empty() && current.locals.len() < previous.locals.len() && previous.locals[..current.locals.len()] == current.locals[..] {
        let chopped = previous.locals.len() - current.locals.len();
        if chopped <= 3 {
            out.put_byte(251 - chopped as u8);
            out.put_short(offset_delta);
            return Ok(());
        }
    }
    out.put_byte(255);
    out.put_short(offset_delta);
    out.put_short(current.locals.len() as u16);
    for local in &current.locals {
        write_verification_type(symbols, out, local)?;
    }
    out.put_short(current.stack.len() as u16);
    for item in &current.stack {
        write_verification_type(symbols, out, item)?;
    }
    Ok(())
}

fn write_verification_type(symbols: &mut SymbolTable, out: &mut ByteVector, t: &AbstractType) -> Result<()> {
    out.put_byte(t.verification_tag());
    match t {
        AbstractType::Reference(name) => {
            out.put_short(symbols.add_constant_class(name)?);
        }
        AbstractType::Uninitialized(offset) => {
            out.put_short(*offset as u16);
        }
        _ => {}
    }
    Ok(())
}

impl MethodVisitor for MethodWriter {
    fn visit_parameter(&mut self, name: Option<&str>, access_flags: u16) -> Result<()> {
        let name_index = name.map(|n| self.symbols.borrow_mut().add_constant_utf8(n)).transpose()?;
        self.parameters.push((name_index, access_flags));
        Ok(())
    }

    fn visit_annotation_default(&mut self) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        let buffer = Rc::new(RefCell::new(ByteVector::new()));
        self.annotation_default = Some(buffer.clone());
        Ok(Some(Box::new(ElementValueWriter::new(self.symbols.clone(), buffer))))
    }

    fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        let buffer = Rc::new(RefCell::new(ByteVector::new()));
        let writer = AnnotationWriter::new_annotation(self.symbols.clone(), buffer.clone(), descriptor)?;
        if visible {
            self.visible_annotations.push(buffer);
        } else {
            self.invisible_annotations.push(buffer);
        }
        Ok(Some(Box::new(writer)))
    }

    fn visit_code(&mut self) -> Result<()> {
        self.has_code = true;
        Ok(())
    }

    fn visit_insn(&mut self, opcode: u8) -> Result<()> {
        self.instructions.push(Instruction::Insn(opcode));
        Ok(())
    }

    fn visit_int_insn(&mut self, opcode: u8, operand: i32) -> Result<()> {
        self.instructions.push(Instruction::IntInsn(opcode, operand));
        Ok(())
    }

    fn visit_var_insn(&mut self, opcode: u8, var_index: u16) -> Result<()> {
        self.instructions.push(Instruction::VarInsn(opcode, var_index));
        Ok(())
    }

    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) -> Result<()> {
        self.instructions.push(Instruction::TypeInsn(opcode, type_name.to_owned()));
        Ok(())
    }

    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Result<()> {
        self.instructions
            .push(Instruction::FieldInsn(opcode, owner.to_owned(), name.to_owned(), descriptor.to_owned()));
        Ok(())
    }

    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) -> Result<()> {
        self.instructions.push(Instruction::MethodInsn(
            opcode,
            owner.to_owned(),
            name.to_owned(),
            descriptor.to_owned(),
            is_interface,
        ));
        Ok(())
    }

    fn visit_invoke_dynamic_insn(&mut self, name: &str, descriptor: &str, bootstrap_method_index: u16) -> Result<()> {
        self.instructions
            .push(Instruction::InvokeDynamicInsn(name.to_owned(), descriptor.to_owned(), bootstrap_method_index));
        Ok(())
    }

    fn visit_jump_insn(&mut self, opcode: u8, label: LabelId) -> Result<()> {
        self.instructions.push(Instruction::JumpInsn(opcode, label));
        Ok(())
    }

    fn visit_label(&mut self, label: LabelId) -> Result<()> {
        self.instructions.push(Instruction::Label(label));
        Ok(())
    }

    fn visit_ldc_insn(&mut self, value: LdcValue) -> Result<()> {
        self.instructions.push(Instruction::LdcInsn(value));
        Ok(())
    }

    fn visit_iinc_insn(&mut self, var_index: u16, increment: i32) -> Result<()> {
        self.instructions.push(Instruction::IincInsn(var_index, increment));
        Ok(())
    }

    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: LabelId, targets: &[LabelId]) -> Result<()> {
        self.instructions.push(Instruction::TableSwitchInsn {
            min,
            max,
            default,
            targets: targets.to_vec(),
        });
        Ok(())
    }

    fn visit_lookup_switch_insn(&mut self, default: LabelId, pairs: &[(i32, LabelId)]) -> Result<()> {
        self.instructions.push(Instruction::LookupSwitchInsn {
            default,
            pairs: pairs.to_vec(),
        });
        Ok(())
    }

    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) -> Result<()> {
        self.instructions
            .push(Instruction::MultiANewArrayInsn(descriptor.to_owned(), dimensions));
        Ok(())
    }

    fn visit_try_catch_block(&mut self, start: LabelId, end: LabelId, handler: LabelId, catch_type: Option<&str>) -> Result<()> {
        let (catch_type_index, catch_type_name) = match catch_type {
            Some(name) => (self.symbols.borrow_mut().add_constant_class(name)?, Some(name.to_owned())),
            None => (0, None),
        };
        self.try_catch_blocks.push(Handler {
            start,
            end,
            handler,
            catch_type_index,
            catch_type_name,
        });
        Ok(())
    }

    fn visit_local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        start: LabelId,
        end: LabelId,
        index: u16,
    ) -> Result<()> {
        let (name_index, descriptor_index, signature_index) = {
            let mut st = self.symbols.borrow_mut();
            (
                st.add_constant_utf8(name)?,
                st.add_constant_utf8(descriptor)?,
                signature.map(|s| st.add_constant_utf8(s)).transpose()?,
            )
        };
        self.local_variables.push(LocalVariableEntry {
            name_index,
            descriptor_index,
            signature_index,
            start,
            end,
            index,
        });
        Ok(())
    }

    fn visit_line_number(&mut self, line: u16, start: LabelId) -> Result<()> {
        self.instructions.push(Instruction::LineNumber(line, start));
        Ok(())
    }

    fn visit_max(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        self.declared_max_stack = max_stack;
        self.declared_max_locals = max_locals;
        Ok(())
    }

    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.attributes.push_back(crate::attribute::Attribute::new(name, data.to_vec()));
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl MethodWriter {
    pub fn set_owner_hint(&mut self, owner: &str) {
        self.owner_hint = Some(owner.to_owned());
    }

    fn attribute_count(&self) -> u16 {
        let mut count = self.has_code as u16;
        count += !self.exception_indices.is_empty() as u16;
        count += self.signature_index.is_some() as u16;
        count += self.needs_synthetic_attribute() as u16;
        count += !self.parameters.is_empty() as u16;
        count += self.annotation_default.is_some() as u16;
        count += !self.visible_annotations.is_empty() as u16;
        count += !self.invisible_annotations.is_empty() as u16;
        count += self.attributes.len() as u16;
        count
    }

    pub fn serialize(&mut self, out: &mut ByteVector) -> Result<()> {
        out.put_short(self.access_flags);
        out.put_short(self.name_index);
        out.put_short(self.descriptor_index);
        out.put_short(self.attribute_count());

        if self.has_code {
            let code = self.serialize_code()?;
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::CODE)?;
            drop(st);
            out.put_short(name);
            out.put_int(code.len() as u32);
            out.put_byte_array(code.as_bytes());
        }
        if !self.exception_indices.is_empty() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::EXCEPTIONS)?;
            drop(st);
            out.put_short(name);
            out.put_int(2 + 2 * self.exception_indices.len() as u32);
            out.put_short(self.exception_indices.len() as u16);
            for index in &self.exception_indices {
                out.put_short(*index);
            }
        }
        if let Some(index) = self.signature_index {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(crate::constants::attr::SIGNATURE)?;
            drop(st);
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        if self.needs_synthetic_attribute() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::SYNTHETIC)?;
            drop(st);
            out.put_short(name);
            out.put_int(0);
        }
        if !self.parameters.is_empty() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::METHOD_PARAMETERS)?;
            drop(st);
            let mut body = ByteVector::new();
            body.put_byte(self.parameters.len() as u8);
            for (name_index, access_flags) in &self.parameters {
                body.put_short(name_index.unwrap_or(0));
                body.put_short(*access_flags);
            }
            out.put_short(name);
            out.put_int(body.len() as u32);
            out.put_byte_array(body.as_bytes());
        }
        if let Some(default) = &self.annotation_default {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::ANNOTATION_DEFAULT)?;
            drop(st);
            out.put_short(name);
            out.put_int(default.borrow().len() as u32);
            out.put_byte_array(default.borrow().as_bytes());
        }
        write_annotations_attribute(&self.symbols, out, attr::RUNTIME_VISIBLE_ANNOTATIONS, &self.visible_annotations)?;
        write_annotations_attribute(&self.symbols, out, attr::RUNTIME_INVISIBLE_ANNOTATIONS, &self.invisible_annotations)?;
        for attribute in self.attributes.iter() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(&attribute.name)?;
            drop(st);
            out.put_short(name);
            out.put_int(attribute.data.len() as u32);
            out.put_byte_array(&attribute.data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_symbols() -> Rc<RefCell<SymbolTable>> {
        Rc::new(RefCell::new(SymbolTable::new(52, 0)))
    }

    const ACC_STATIC: u16 = 0x0008;

    #[test]
    fn conditional_branch_produces_one_same_frame_under_all_frames() {
        let mut writer =
            MethodWriter::new(fresh_symbols(), 52, ComputeMode::AllFrames, ACC_STATIC, "branch", "(Z)V", None, &[]).unwrap();
        writer.visit_code().unwrap();
        let after_if = writer.labels.new_label();
        writer.visit_var_insn(opcode::ILOAD, 0).unwrap();
        writer.visit_jump_insn(opcode::IFEQ, after_if).unwrap();
        writer.visit_insn(opcode::RETURN).unwrap();
        writer.visit_label(after_if).unwrap();
        writer.visit_insn(opcode::RETURN).unwrap();
        writer.visit_end().unwrap();

        let body = writer.serialize_code().unwrap();
        let bytes = body.as_bytes();
        // max_stack, max_locals, code_length, code bytes.
        let code_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let code = &bytes[8..8 + code_length];
        assert_eq!(code, &[opcode::ILOAD_0, opcode::IFEQ, 0x00, 0x04, opcode::RETURN, opcode::RETURN]);

        // exception_table_count(2) follows the code, then attributes_count(2).
        let after_code = 8 + code_length;
        let exception_count = u16::from_be_bytes([bytes[after_code], bytes[after_code + 1]]);
        assert_eq!(exception_count, 0);
        let attr_section = after_code + 2;
        let attribute_count = u16::from_be_bytes([bytes[attr_section], bytes[attr_section + 1]]);
        assert_eq!(attribute_count, 1, "expected exactly one StackMapTable attribute");

        // name_index(2), attribute_length(4), then the StackMapTable body itself.
        let table_body_start = attr_section + 2 + 2 + 4;
        let entry_count = u16::from_be_bytes([bytes[table_body_start], bytes[table_body_start + 1]]);
        assert_eq!(entry_count, 1);
        let tag = bytes[table_body_start + 2];
        assert!(tag <= 63, "expected a one-byte same_frame tag, got {tag}");
    }

    #[test]
    fn short_forward_jump_emits_a_narrow_offset() {
        let mut writer = MethodWriter::new(fresh_symbols(), 52, ComputeMode::Nothing, ACC_STATIC, "m", "()V", None, &[]).unwrap();
        writer.visit_code().unwrap();
        writer.visit_max(1, 0).unwrap();
        let target = writer.labels.new_label();
        writer.visit_jump_insn(opcode::IFEQ, target).unwrap();
        for _ in 0..97 {
            writer.visit_insn(opcode::NOP).unwrap();
        }
        writer.visit_label(target).unwrap();
        writer.visit_insn(opcode::RETURN).unwrap();
        writer.visit_end().unwrap();

        let body = writer.serialize_code().unwrap();
        let bytes = body.as_bytes();
        let code_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let code = &bytes[8..8 + code_length];
        assert_eq!(code[0], opcode::IFEQ);
        assert_eq!((code[1], code[2]), (0x00, 0x64));
        assert_eq!(code_length, 3 + 97 + 1);
    }

    #[test]
    fn forward_jump_past_i16_range_widens_to_goto_w() {
        let mut writer = MethodWriter::new(fresh_symbols(), 52, ComputeMode::Nothing, ACC_STATIC, "m", "()V", None, &[]).unwrap();
        writer.visit_code().unwrap();
        writer.visit_max(1, 0).unwrap();
        let target = writer.labels.new_label();
        writer.visit_jump_insn(opcode::IFEQ, target).unwrap();
        for _ in 0..40000 {
            writer.visit_insn(opcode::NOP).unwrap();
        }
        writer.visit_label(target).unwrap();
        writer.visit_insn(opcode::RETURN).unwrap();
        writer.visit_end().unwrap();

        let body = writer.serialize_code().unwrap();
        let bytes = body.as_bytes();
        let code_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let code = &bytes[8..8 + code_length];
        assert_eq!(code[0], opcode::IFNE, "a too-far conditional jump negates its own condition");
        assert_eq!((code[1], code[2]), (0x00, 0x08), "skips over the GOTO_W it inserts");
        assert_eq!(code[3], opcode::GOTO_W);
        let wide_offset = u32::from_be_bytes([code[4], code[5], code[6], code[7]]);
        assert_eq!(wide_offset, 40000);
    }

    #[test]
    fn table_switch_pads_to_the_next_word_boundary() {
        let mut writer = MethodWriter::new(fresh_symbols(), 52, ComputeMode::Nothing, ACC_STATIC, "m", "()V", None, &[]).unwrap();
        writer.visit_code().unwrap();
        writer.visit_max(1, 0).unwrap();
        for _ in 0..5 {
            writer.visit_insn(opcode::NOP).unwrap();
        }
        let after = writer.labels.new_label();
        writer
            .visit_table_switch_insn(0, 3, after, &[after, after, after, after])
            .unwrap();
        writer.visit_label(after).unwrap();
        writer.visit_insn(opcode::RETURN).unwrap();
        writer.visit_end().unwrap();

        let body = writer.serialize_code().unwrap();
        let bytes = body.as_bytes();
        let code_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let code = &bytes[8..8 + code_length];

        assert_eq!(code[5], opcode::TABLESWITCH);
        // The switch starts at code offset 5; two zero bytes pad out to the
        // next multiple of four before the operand words begin at offset 8.
        assert_eq!(&code[6..8], &[0, 0]);
        let default_offset = u32::from_be_bytes([code[8], code[9], code[10], code[11]]);
        let low = u32::from_be_bytes([code[12], code[13], code[14], code[15]]);
        let high = u32::from_be_bytes([code[16], code[17], code[18], code[19]]);
        assert_eq!(low, 0);
        assert_eq!(high, 3);
        for i in 0..4 {
            let start = 20 + i * 4;
            let target = u32::from_be_bytes([code[start], code[start + 1], code[start + 2], code[start + 3]]);
            assert_eq!(target, default_offset, "every label coincides right after the switch body");
        }
    }

    #[test]
    fn oversized_code_attribute_is_rejected_before_serialization() {
        let mut writer = MethodWriter::new(fresh_symbols(), 52, ComputeMode::Nothing, ACC_STATIC, "huge", "()V", None, &[]).unwrap();
        writer.set_owner_hint("p/Big");
        writer.visit_code().unwrap();
        writer.visit_max(0, 0).unwrap();
        for _ in 0..70_000 {
            writer.visit_insn(opcode::NOP).unwrap();
        }
        writer.visit_end().unwrap();

        match writer.serialize_code() {
            Err(Error::MethodTooLarge { class, method, descriptor, length }) => {
                assert_eq!(class, "p/Big");
                assert_eq!(method, "huge");
                assert_eq!(descriptor, "()V");
                assert_eq!(length, 70_000);
            }
            other => panic!("expected MethodTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn short_var_opcode_only_applies_to_load_and_store_within_index_three() {
        assert_eq!(short_var_opcode(opcode::ILOAD, 0), Some(opcode::ILOAD_0));
        assert_eq!(short_var_opcode(opcode::ILOAD, 3), Some(opcode::ILOAD_0 + 3));
        assert_eq!(short_var_opcode(opcode::ILOAD, 4), None);
        assert_eq!(short_var_opcode(opcode::ASTORE, 1), Some(opcode::ASTORE_0 + 1));
        assert_eq!(short_var_opcode(opcode::RET, 0), None);
    }
}
