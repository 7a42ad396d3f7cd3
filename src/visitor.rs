//! The callback protocol decoupling decode (`ClassReader`) from re-encode
//! (`ClassWriter`).
//!
//! Each visitor trait method has a default no-op (or forwarding, where a
//! `next` handle is available) implementation, so a visitor interested in
//! only one callback doesn't have to stub out the rest. This also gives
//! visitor transparency: a chain of visitors that each forward to an inner
//! `next` and change nothing must reproduce the class byte-for-byte.

use crate::error::Result;

/// Top-level visitor, invoked once per class: `visit`, then
/// interfaces/fields/methods/attributes in any order amongst themselves,
/// then `visit_end`.
pub trait ClassVisitor {
    fn visit(
        &mut self,
        _major_version: u16,
        _minor_version: u16,
        _access_flags: u16,
        _this_class: &str,
        _signature: Option<&str>,
        _super_class: Option<&str>,
        _interfaces: &[String],
    ) -> Result<()> {
        Ok(())
    }

    fn visit_source(&mut self, _source: Option<&str>, _debug: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn visit_nest_host(&mut self, _nest_host: &str) -> Result<()> {
        Ok(())
    }

    fn visit_outer_class(&mut self, _owner: &str, _name: Option<&str>, _descriptor: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn visit_annotation(&mut self, _descriptor: &str, _visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_attribute(&mut self, _name: &str, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn visit_nest_member(&mut self, _member: &str) -> Result<()> {
        Ok(())
    }

    fn visit_permitted_subclass(&mut self, _subclass: &str) -> Result<()> {
        Ok(())
    }

    fn visit_inner_class(
        &mut self,
        _name: &str,
        _outer_name: Option<&str>,
        _inner_name: Option<&str>,
        _access_flags: u16,
    ) -> Result<()> {
        Ok(())
    }

    fn visit_record_component(
        &mut self,
        _name: &str,
        _descriptor: &str,
        _signature: Option<&str>,
    ) -> Result<Option<Box<dyn RecordComponentVisitor>>> {
        Ok(None)
    }

    fn visit_field(
        &mut self,
        _access_flags: u16,
        _name: &str,
        _descriptor: &str,
        _signature: Option<&str>,
        _constant_value: Option<ConstantValue>,
    ) -> Result<Option<Box<dyn FieldVisitor>>> {
        Ok(None)
    }

    fn visit_method(
        &mut self,
        _access_flags: u16,
        _name: &str,
        _descriptor: &str,
        _signature: Option<&str>,
        _exceptions: &[String],
    ) -> Result<Option<Box<dyn MethodVisitor>>> {
        Ok(None)
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A `ConstantValue` attribute payload (JVMS §4.7.2): already-resolved, typed
/// by the owning field's descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
}

pub trait FieldVisitor {
    fn visit_annotation(&mut self, _descriptor: &str, _visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_attribute(&mut self, _name: &str, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

pub trait RecordComponentVisitor {
    fn visit_annotation(&mut self, _descriptor: &str, _visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_attribute(&mut self, _name: &str, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Method bodies may be visited without any code at all (abstract/native
/// methods skip straight to `visit_end`).
pub trait MethodVisitor {
    fn visit_parameter(&mut self, _name: Option<&str>, _access_flags: u16) -> Result<()> {
        Ok(())
    }

    fn visit_annotation_default(&mut self) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_annotation(&mut self, _descriptor: &str, _visible: bool) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_code(&mut self) -> Result<()> {
        Ok(())
    }

    fn visit_frame(&mut self) -> Result<()> {
        Ok(())
    }

    fn visit_insn(&mut self, _opcode: u8) -> Result<()> {
        Ok(())
    }

    fn visit_int_insn(&mut self, _opcode: u8, _operand: i32) -> Result<()> {
        Ok(())
    }

    fn visit_var_insn(&mut self, _opcode: u8, _var_index: u16) -> Result<()> {
        Ok(())
    }

    fn visit_type_insn(&mut self, _opcode: u8, _type_name: &str) -> Result<()> {
        Ok(())
    }

    fn visit_field_insn(&mut self, _opcode: u8, _owner: &str, _name: &str, _descriptor: &str) -> Result<()> {
        Ok(())
    }

    fn visit_method_insn(
        &mut self,
        _opcode: u8,
        _owner: &str,
        _name: &str,
        _descriptor: &str,
        _is_interface: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn visit_invoke_dynamic_insn(&mut self, _name: &str, _descriptor: &str, _bootstrap_method_index: u16) -> Result<()> {
        Ok(())
    }

    fn visit_jump_insn(&mut self, _opcode: u8, _label: crate::label::LabelId) -> Result<()> {
        Ok(())
    }

    fn visit_label(&mut self, _label: crate::label::LabelId) -> Result<()> {
        Ok(())
    }

    fn visit_ldc_insn(&mut self, _value: LdcValue) -> Result<()> {
        Ok(())
    }

    fn visit_iinc_insn(&mut self, _var_index: u16, _increment: i32) -> Result<()> {
        Ok(())
    }

    fn visit_table_switch_insn(
        &mut self,
        _min: i32,
        _max: i32,
        _default: crate::label::LabelId,
        _targets: &[crate::label::LabelId],
    ) -> Result<()> {
        Ok(())
    }

    fn visit_lookup_switch_insn(
        &mut self,
        _default: crate::label::LabelId,
        _pairs: &[(i32, crate::label::LabelId)],
    ) -> Result<()> {
        Ok(())
    }

    fn visit_multi_anew_array_insn(&mut self, _descriptor: &str, _dimensions: u8) -> Result<()> {
        Ok(())
    }

    fn visit_try_catch_block(
        &mut self,
        _start: crate::label::LabelId,
        _end: crate::label::LabelId,
        _handler: crate::label::LabelId,
        _catch_type: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    fn visit_local_variable(
        &mut self,
        _name: &str,
        _descriptor: &str,
        _signature: Option<&str>,
        _start: crate::label::LabelId,
        _end: crate::label::LabelId,
        _index: u16,
    ) -> Result<()> {
        Ok(())
    }

    fn visit_line_number(&mut self, _line: u16, _start: crate::label::LabelId) -> Result<()> {
        Ok(())
    }

    fn visit_max(&mut self, _max_stack: u16, _max_locals: u16) -> Result<()> {
        Ok(())
    }

    fn visit_attribute(&mut self, _name: &str, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A value loadable via `ldc`/`ldc_w`/`ldc2_w`; unifies the four wire forms
/// (JVMS §4.4) plus the `MethodType`/`MethodHandle`/dynamic-constant forms
/// added for `invokedynamic` support (class-file version gated).
#[derive(Clone, Debug, PartialEq)]
pub enum LdcValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodType(String),
    MethodHandle { reference_kind: u8, owner: String, name: String, descriptor: String, is_interface: bool },
    Dynamic { name: String, descriptor: String, bootstrap_method_index: u16 },
}

pub trait AnnotationVisitor {
    fn visit(&mut self, _name: Option<&str>, _value: AnnotationValue) -> Result<()> {
        Ok(())
    }

    fn visit_enum(&mut self, _name: Option<&str>, _descriptor: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn visit_annotation(&mut self, _name: Option<&str>, _descriptor: &str) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_array(&mut self, _name: Option<&str>) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        Ok(None)
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One `element_value` payload (JVMS §4.7.16.1), for the scalar `visit` callback.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(String),
    Class(String),
}
