//! Top-level orchestrator: accumulates a class's header, pool, members, and
//! attributes via `ClassVisitor` callbacks, then serializes them into a
//! JVMS §4.1 `ClassFile` byte sequence.
//!
//! Fields, methods, and record components are each driven through their own
//! dedicated writer; `ClassWriter` retains one `Rc<RefCell<_>>` per member so
//! the `Box<dyn FieldVisitor>`/`Box<dyn MethodVisitor>`/etc. handed back to
//! the caller and the copy kept for final serialization are the same object.

pub mod annotation_writer;
pub mod field_writer;
pub mod method_writer;
pub mod record_component_writer;

use crate::attribute::{Attribute, AttributeList};
use crate::bytevector::ByteVector;
use crate::constants::attr;
use crate::error::Result;
use crate::symbol::SymbolTable;
use crate::version;
use crate::visitor::{
    AnnotationVisitor, ClassVisitor, ConstantValue, FieldVisitor, LdcValue, MethodVisitor,
    RecordComponentVisitor,
};
use annotation_writer::AnnotationWriter;
use bitflags::bitflags;
use field_writer::{write_annotations_attribute, FieldWriter};
use method_writer::{ComputeMode, MethodWriter};
use record_component_writer::RecordComponentWriter;
use std::cell::RefCell;
use std::rc::Rc;

bitflags! {
    /// Orthogonal knobs that don't fit `ComputeMode`'s per-method granularity.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct ClassWriterFlags: u8 {
        /// Set when this writer shares its `SymbolTable` with the
        /// `ClassReader` that produced the class being rewritten, so a
        /// caller copying a method through untouched can bypass
        /// `MethodWriter`'s instruction IR with `set_raw_code_attribute`
        /// instead of decoding and re-encoding every instruction.
        const SHARED_SYMBOL_TABLE = 0b0000_0001;
    }
}

struct InnerClassEntry {
    inner_class_index: u16,
    outer_class_index: Option<u16>,
    inner_name_index: Option<u16>,
    access_flags: u16,
}

/// Forwards each `FieldVisitor` callback into a shared `FieldWriter`, so the
/// boxed handle returned to the caller and the copy `ClassWriter` keeps for
/// `serialize` mutate the same object.
struct FieldHandle(Rc<RefCell<FieldWriter>>);

impl FieldVisitor for FieldHandle {
    fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.0.borrow_mut().visit_annotation(descriptor, visible)
    }
    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.0.borrow_mut().visit_attribute(name, data)
    }
    fn visit_end(&mut self) -> Result<()> {
        self.0.borrow_mut().visit_end()
    }
}

struct RecordComponentHandle(Rc<RefCell<RecordComponentWriter>>);

impl RecordComponentVisitor for RecordComponentHandle {
    fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.0.borrow_mut().visit_annotation(descriptor, visible)
    }
    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.0.borrow_mut().visit_attribute(name, data)
    }
    fn visit_end(&mut self) -> Result<()> {
        self.0.borrow_mut().visit_end()
    }
}

struct MethodHandle(Rc<RefCell<MethodWriter>>);

impl MethodVisitor for MethodHandle {
    fn visit_parameter(&mut self, name: Option<&str>, access_flags: u16) -> Result<()> {
        self.0.borrow_mut().visit_parameter(name, access_flags)
    }
    fn visit_annotation_default(&mut self) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.0.borrow_mut().visit_annotation_default()
    }
    fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.0.borrow_mut().visit_annotation(descriptor, visible)
    }
    fn visit_code(&mut self) -> Result<()> {
        self.0.borrow_mut().visit_code()
    }
    fn visit_frame(&mut self) -> Result<()> {
        self.0.borrow_mut().visit_frame()
    }
    fn visit_insn(&mut self, opcode: u8) -> Result<()> {
        self.0.borrow_mut().visit_insn(opcode)
    }
    fn visit_int_insn(&mut self, opcode: u8, operand: i32) -> Result<()> {
        self.0.borrow_mut().visit_int_insn(opcode, operand)
    }
    fn visit_var_insn(&mut self, opcode: u8, var_index: u16) -> Result<()> {
        self.0.borrow_mut().visit_var_insn(opcode, var_index)
    }
    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) -> Result<()> {
        self.0.borrow_mut().visit_type_insn(opcode, type_name)
    }
    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Result<()> {
        self.0.borrow_mut().visit_field_insn(opcode, owner, name, descriptor)
    }
    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) -> Result<()> {
        self.0.borrow_mut().visit_method_insn(opcode, owner, name, descriptor, is_interface)
    }
    fn visit_invoke_dynamic_insn(&mut self, name: &str, descriptor: &str, bootstrap_method_index: u16) -> Result<()> {
        self.0.borrow_mut().visit_invoke_dynamic_insn(name, descriptor, bootstrap_method_index)
    }
    fn visit_jump_insn(&mut self, opcode: u8, label: crate::label::LabelId) -> Result<()> {
        self.0.borrow_mut().visit_jump_insn(opcode, label)
    }
    fn visit_label(&mut self, label: crate::label::LabelId) -> Result<()> {
        self.0.borrow_mut().visit_label(label)
    }
    fn visit_ldc_insn(&mut self, value: LdcValue) -> Result<()> {
        self.0.borrow_mut().visit_ldc_insn(value)
    }
    fn visit_iinc_insn(&mut self, var_index: u16, increment: i32) -> Result<()> {
        self.0.borrow_mut().visit_iinc_insn(var_index, increment)
    }
    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: crate::label::LabelId, targets: &[crate::label::LabelId]) -> Result<()> {
        self.0.borrow_mut().visit_table_switch_insn(min, max, default, targets)
    }
    fn visit_lookup_switch_insn(&mut self, default: crate::label::LabelId, pairs: &[(i32, crate::label::LabelId)]) -> Result<()> {
        self.0.borrow_mut().visit_lookup_switch_insn(default, pairs)
    }
    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) -> Result<()> {
        self.0.borrow_mut().visit_multi_anew_array_insn(descriptor, dimensions)
    }
    fn visit_try_catch_block(&mut self, start: crate::label::LabelId, end: crate::label::LabelId, handler: crate::label::LabelId, catch_type: Option<&str>) -> Result<()> {
        self.0.borrow_mut().visit_try_catch_block(start, end, handler, catch_type)
    }
    fn visit_local_variable(&mut self, name: &str, descriptor: &str, signature: Option<&str>, start: crate::label::LabelId, end: crate::label::LabelId, index: u16) -> Result<()> {
        self.0.borrow_mut().visit_local_variable(name, descriptor, signature, start, end, index)
    }
    fn visit_line_number(&mut self, line: u16, start: crate::label::LabelId) -> Result<()> {
        self.0.borrow_mut().visit_line_number(line, start)
    }
    fn visit_max(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        self.0.borrow_mut().visit_max(max_stack, max_locals)
    }
    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.0.borrow_mut().visit_attribute(name, data)
    }
    fn visit_end(&mut self) -> Result<()> {
        self.0.borrow_mut().visit_end()
    }
}

pub struct ClassWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    flags: ClassWriterFlags,
    compute_mode: ComputeMode,
    major_version: u16,
    minor_version: u16,
    access_flags: u16,
    this_name: String,
    this_class_index: u16,
    super_class_index: u16,
    signature_index: Option<u16>,
    interfaces: Vec<u16>,
    source_file_index: Option<u16>,
    source_debug_extension: Option<Vec<u8>>,
    nest_host_index: Option<u16>,
    nest_members: Vec<u16>,
    permitted_subclasses: Vec<u16>,
    outer_class: Option<(u16, Option<u16>)>,
    inner_classes: Vec<InnerClassEntry>,
    visible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    invisible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    record_components: Vec<Rc<RefCell<RecordComponentWriter>>>,
    fields: Vec<Rc<RefCell<FieldWriter>>>,
    methods: Vec<Rc<RefCell<MethodWriter>>>,
    attributes: AttributeList,
}

impl ClassWriter {
    /// Starts from a fresh, empty constant pool.
    pub fn new(major_version: u16, minor_version: u16, compute_mode: ComputeMode, flags: ClassWriterFlags) -> Self {
        let symbols = Rc::new(RefCell::new(SymbolTable::new(major_version, minor_version)));
        ClassWriter::with_symbol_table(symbols, compute_mode, flags)
    }

    /// Builds atop a `SymbolTable` a `ClassReader` already populated, so
    /// constants it decoded don't need re-interning. Marks
    /// `SHARED_SYMBOL_TABLE` automatically.
    pub fn with_shared_symbol_table(symbols: Rc<RefCell<SymbolTable>>, compute_mode: ComputeMode, mut flags: ClassWriterFlags) -> Self {
        flags.insert(ClassWriterFlags::SHARED_SYMBOL_TABLE);
        ClassWriter::with_symbol_table(symbols, compute_mode, flags)
    }

    fn with_symbol_table(symbols: Rc<RefCell<SymbolTable>>, compute_mode: ComputeMode, flags: ClassWriterFlags) -> Self {
        let (major_version, minor_version) = {
            let st = symbols.borrow();
            (st.major_version(), st.minor_version())
        };
        ClassWriter {
            symbols,
            flags,
            compute_mode,
            major_version,
            minor_version,
            access_flags: 0,
            this_name: String::new(),
            this_class_index: 0,
            super_class_index: 0,
            signature_index: None,
            interfaces: Vec::new(),
            source_file_index: None,
            source_debug_extension: None,
            nest_host_index: None,
            nest_members: Vec::new(),
            permitted_subclasses: Vec::new(),
            outer_class: None,
            inner_classes: Vec::new(),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            record_components: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: AttributeList::new(),
        }
    }

    pub fn shares_symbol_table(&self) -> bool {
        self.flags.contains(ClassWriterFlags::SHARED_SYMBOL_TABLE)
    }

    pub fn symbol_table(&self) -> Rc<RefCell<SymbolTable>> {
        self.symbols.clone()
    }

    fn class_attribute_count(&self) -> u16 {
        let mut count = 0u16;
        count += self.source_file_index.is_some() as u16;
        count += self.source_debug_extension.is_some() as u16;
        count += !self.inner_classes.is_empty() as u16;
        count += self.outer_class.is_some() as u16;
        count += self.signature_index.is_some() as u16;
        count += !self.visible_annotations.is_empty() as u16;
        count += !self.invisible_annotations.is_empty() as u16;
        count += (self.symbols.borrow().bootstrap_method_count() > 0) as u16;
        count += self.nest_host_index.is_some() as u16;
        count += !self.nest_members.is_empty() as u16;
        count += !self.record_components.is_empty() as u16;
        count += !self.permitted_subclasses.is_empty() as u16;
        count += self.attributes.len() as u16;
        count
    }

    /// Serializes the complete `ClassFile` (JVMS §4.1): magic/version header,
    /// constant pool, access_flags/this_class/super_class/interfaces, then
    /// fields, methods, and class-level attributes in that fixed order.
    ///
    /// Members are serialized to temporary buffers first since doing so can
    /// still grow the constant pool (a field's `ConstantValue`, say), and
    /// the pool has to be fully settled before it's written.
    pub fn to_byte_array(&mut self) -> Result<Vec<u8>> {
        let mut fields_body = ByteVector::new();
        for field in &self.fields {
            field.borrow().serialize(&mut fields_body)?;
        }
        let mut methods_body = ByteVector::new();
        for method in &self.methods {
            method.borrow_mut().serialize(&mut methods_body)?;
        }
        let attributes_body = self.serialize_class_attributes()?;

        let mut out = ByteVector::new();
        out.put_int(0xCAFEBABE);
        out.put_short(self.minor_version);
        out.put_short(self.major_version);
        self.symbols.borrow().serialize(&mut out)?;
        out.put_short(self.access_flags);
        out.put_short(self.this_class_index);
        out.put_short(self.super_class_index);
        out.put_short(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            out.put_short(*interface);
        }
        out.put_short(self.fields.len() as u16);
        out.put_byte_array(fields_body.as_bytes());
        out.put_short(self.methods.len() as u16);
        out.put_byte_array(methods_body.as_bytes());
        out.put_short(self.class_attribute_count());
        out.put_byte_array(attributes_body.as_bytes());
        Ok(out.into_bytes())
    }

    fn serialize_class_attributes(&self) -> Result<ByteVector> {
        let mut out = ByteVector::new();
        if let Some(index) = self.source_file_index {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::SOURCE_FILE)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        if let Some(debug) = &self.source_debug_extension {
            let name = self.symbols.borrow_mut().add_constant_utf8("SourceDebugExtension")?;
            out.put_short(name);
            out.put_int(debug.len() as u32);
            out.put_byte_array(debug);
        }
        if !self.inner_classes.is_empty() {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::INNER_CLASSES)?;
            let mut body = ByteVector::new();
            body.put_short(self.inner_classes.len() as u16);
            for entry in &self.inner_classes {
                body.put_short(entry.inner_class_index);
                body.put_short(entry.outer_class_index.unwrap_or(0));
                body.put_short(entry.inner_name_index.unwrap_or(0));
                body.put_short(entry.access_flags);
            }
            out.put_short(name);
            out.put_int(body.len() as u32);
            out.put_byte_array(body.as_bytes());
        }
        if let Some((owner_index, method_nat_index)) = self.outer_class {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::ENCLOSING_METHOD)?;
            out.put_short(name);
            out.put_int(4);
            out.put_short(owner_index);
            out.put_short(method_nat_index.unwrap_or(0));
        }
        if let Some(index) = self.signature_index {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::SIGNATURE)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        write_annotations_attribute(&self.symbols, &mut out, attr::RUNTIME_VISIBLE_ANNOTATIONS, &self.visible_annotations)?;
        write_annotations_attribute(&self.symbols, &mut out, attr::RUNTIME_INVISIBLE_ANNOTATIONS, &self.invisible_annotations)?;
        if let Some(bootstrap_methods) = self.symbols.borrow().serialize_bootstrap_methods() {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::BOOTSTRAP_METHODS)?;
            out.put_short(name);
            out.put_int(bootstrap_methods.len() as u32);
            out.put_byte_array(bootstrap_methods.as_bytes());
        }
        if let Some(index) = self.nest_host_index {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::NEST_HOST)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        if !self.nest_members.is_empty() {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::NEST_MEMBERS)?;
            out.put_short(name);
            out.put_int(2 + 2 * self.nest_members.len() as u32);
            out.put_short(self.nest_members.len() as u16);
            for member in &self.nest_members {
                out.put_short(*member);
            }
        }
        if !self.record_components.is_empty() {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::RECORD)?;
            let mut body = ByteVector::new();
            body.put_short(self.record_components.len() as u16);
            for component in &self.record_components {
                component.borrow().serialize(&mut body)?;
            }
            out.put_short(name);
            out.put_int(body.len() as u32);
            out.put_byte_array(body.as_bytes());
        }
        if !self.permitted_subclasses.is_empty() {
            let name = self.symbols.borrow_mut().add_constant_utf8(attr::PERMITTED_SUBCLASSES)?;
            out.put_short(name);
            out.put_int(2 + 2 * self.permitted_subclasses.len() as u32);
            out.put_short(self.permitted_subclasses.len() as u16);
            for subclass in &self.permitted_subclasses {
                out.put_short(*subclass);
            }
        }
        for attribute in self.attributes.iter() {
            let name = self.symbols.borrow_mut().add_constant_utf8(&attribute.name)?;
            out.put_short(name);
            out.put_int(attribute.data.len() as u32);
            out.put_byte_array(&attribute.data);
        }
        Ok(out)
    }
}

impl ClassVisitor for ClassWriter {
    fn visit(
        &mut self,
        major_version: u16,
        minor_version: u16,
        access_flags: u16,
        this_class: &str,
        signature: Option<&str>,
        super_class: Option<&str>,
        interfaces: &[String],
    ) -> Result<()> {
        self.major_version = major_version;
        self.minor_version = minor_version;
        self.access_flags = access_flags;
        self.this_name = this_class.to_owned();
        let mut st = self.symbols.borrow_mut();
        self.this_class_index = st.add_constant_class(this_class)?;
        self.super_class_index = match super_class {
            Some(name) => st.add_constant_class(name)?,
            None => 0,
        };
        self.signature_index = signature.map(|s| st.add_constant_utf8(s)).transpose()?;
        self.interfaces = interfaces
            .iter()
            .map(|name| st.add_constant_class(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn visit_source(&mut self, source: Option<&str>, debug: Option<&str>) -> Result<()> {
        self.source_file_index = source
            .map(|s| self.symbols.borrow_mut().add_constant_utf8(s))
            .transpose()?;
        self.source_debug_extension = debug.map(crate::modified_utf8::encode);
        Ok(())
    }

    fn visit_nest_host(&mut self, nest_host: &str) -> Result<()> {
        self.nest_host_index = Some(self.symbols.borrow_mut().add_constant_class(nest_host)?);
        Ok(())
    }

    fn visit_outer_class(&mut self, owner: &str, name: Option<&str>, descriptor: Option<&str>) -> Result<()> {
        let mut st = self.symbols.borrow_mut();
        let owner_index = st.add_constant_class(owner)?;
        let method_nat_index = match (name, descriptor) {
            (Some(n), Some(d)) => Some(st.add_constant_name_and_type(n, d)?),
            _ => None,
        };
        self.outer_class = Some((owner_index, method_nat_index));
        Ok(())
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

    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.attributes.push_back(Attribute::new(name, data.to_vec()));
        Ok(())
    }

    fn visit_nest_member(&mut self, member: &str) -> Result<()> {
        let index = self.symbols.borrow_mut().add_constant_class(member)?;
        self.nest_members.push(index);
        Ok(())
    }

    fn visit_permitted_subclass(&mut self, subclass: &str) -> Result<()> {
        let index = self.symbols.borrow_mut().add_constant_class(subclass)?;
        self.permitted_subclasses.push(index);
        Ok(())
    }

    fn visit_inner_class(&mut self, name: &str, outer_name: Option<&str>, inner_name: Option<&str>, access_flags: u16) -> Result<()> {
        let mut st = self.symbols.borrow_mut();
        let inner_class_index = st.add_constant_class(name)?;
        let outer_class_index = outer_name.map(|n| st.add_constant_class(n)).transpose()?;
        let inner_name_index = inner_name.map(|n| st.add_constant_utf8(n)).transpose()?;
        self.inner_classes.push(InnerClassEntry {
            inner_class_index,
            outer_class_index,
            inner_name_index,
            access_flags,
        });
        Ok(())
    }

    fn visit_record_component(&mut self, name: &str, descriptor: &str, signature: Option<&str>) -> Result<Option<Box<dyn RecordComponentVisitor>>> {
        if !version::supports_records(self.major_version) {
            return Err(crate::error::Error::UnsupportedVersion {
                feature: "record components",
                required_major: version::V14,
                actual_major: self.major_version,
            });
        }
        let writer = Rc::new(RefCell::new(RecordComponentWriter::new(self.symbols.clone(), name, descriptor, signature)?));
        self.record_components.push(writer.clone());
        Ok(Some(Box::new(RecordComponentHandle(writer))))
    }

    fn visit_field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        constant_value: Option<ConstantValue>,
    ) -> Result<Option<Box<dyn FieldVisitor>>> {
        let writer = Rc::new(RefCell::new(FieldWriter::new(
            self.symbols.clone(),
            self.major_version,
            access_flags,
            name,
            descriptor,
            signature,
            constant_value,
        )?));
        self.fields.push(writer.clone());
        Ok(Some(Box::new(FieldHandle(writer))))
    }

    fn visit_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> Result<Option<Box<dyn MethodVisitor>>> {
        let mut writer = MethodWriter::new(
            self.symbols.clone(),
            self.major_version,
            self.compute_mode,
            access_flags,
            name,
            descriptor,
            signature,
            exceptions,
        )?;
        writer.set_owner_hint(&self.this_name);
        let writer = Rc::new(RefCell::new(writer));
        self.methods.push(writer.clone());
        Ok(Some(Box::new(MethodHandle(writer))))
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ClassReader;

    #[test]
    fn minimal_class_round_trips_through_a_reader() {
        let mut writer = ClassWriter::new(version::V8, 0, ComputeMode::MaxStackAndLocal, ClassWriterFlags::empty());
        writer
            .visit(version::V8, 0, 0x0021, "pkg/Minimal", None, Some("java/lang/Object"), &[])
            .unwrap();
        writer.visit_end().unwrap();
        let bytes = writer.to_byte_array().unwrap();

        assert_eq!(&bytes[0..4], &0xCAFEBABEu32.to_be_bytes());
        let reader = ClassReader::new(&bytes).unwrap();
        struct Recorder {
            this_class: String,
        }
        impl ClassVisitor for Recorder {
            fn visit(&mut self, _: u16, _: u16, _: u16, this_class: &str, _: Option<&str>, _: Option<&str>, _: &[String]) -> Result<()> {
                self.this_class = this_class.to_owned();
                Ok(())
            }
        }
        let mut recorder = Recorder { this_class: String::new() };
        reader.accept(&mut recorder).unwrap();
        assert_eq!(recorder.this_class, "pkg/Minimal");
    }

    #[test]
    fn field_with_constant_value_serializes_one_attribute() {
        let mut writer = ClassWriter::new(version::V8, 0, ComputeMode::Nothing, ClassWriterFlags::empty());
        writer
            .visit(version::V8, 0, 0x0021, "pkg/HasField", None, Some("java/lang/Object"), &[])
            .unwrap();
        let mut field = writer
            .visit_field(0x0019, "X", "I", None, Some(ConstantValue::Int(7)))
            .unwrap()
            .unwrap();
        field.visit_end().unwrap();
        writer.visit_end().unwrap();
        let bytes = writer.to_byte_array().unwrap();
        assert!(bytes.len() > 10);
    }

    #[test]
    fn record_component_before_v14_is_rejected() {
        let mut writer = ClassWriter::new(version::V11, 0, ComputeMode::Nothing, ClassWriterFlags::empty());
        writer
            .visit(version::V11, 0, 0x0021, "pkg/NotARecord", None, Some("java/lang/Record"), &[])
            .unwrap();
        let err = match writer.visit_record_component("x", "I", None) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, crate::error::Error::UnsupportedVersion { .. }));
    }
}
