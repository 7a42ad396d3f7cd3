//! Decodes a `ClassFile` (JVMS §4.1) into a sequence of visitor callbacks.
//!
//! A single forward pass over the byte array, with the constant pool decoded
//! once up front into a `SymbolTable` and every other section resolved
//! through it by index. There is no intermediate tree — each attribute is
//! decoded directly into the matching visitor callback as it's encountered.

use crate::attribute::Attribute;
use crate::constants::{attr, opcode, tag};
use crate::error::{Error, Result};
use crate::label::{LabelId, LabelTable};
use crate::modified_utf8;
use crate::symbol::{RawEntry, SymbolTable};
use crate::visitor::{AnnotationValue, AnnotationVisitor, ClassVisitor, ConstantValue, LdcValue, MethodVisitor};
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read};

const MAGIC: u32 = 0xCAFEBABE;

/// Reads a `ClassFile` structure from an in-memory byte slice and replays it
/// as visitor callbacks. Holds no state beyond the input buffer and the
/// `SymbolTable` built from its constant pool; a fresh `ClassReader` is
/// cheap to construct per class.
pub struct ClassReader<'data> {
    data: &'data [u8],
    symbols: SymbolTable,
    this_class_index: u16,
    super_class_index: u16,
    access_flags: u16,
    interfaces: Vec<u16>,
    fields_offset: usize,
}

impl<'data> ClassReader<'data> {
    pub fn new(data: &'data [u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let magic = cursor.read_u32::<BigEndian>()?;
        if magic != MAGIC {
            return Err(Error::format(format!("bad magic number 0x{magic:08X}")));
        }
        let minor_version = cursor.read_u16::<BigEndian>()?;
        let major_version = cursor.read_u16::<BigEndian>()?;
        let constant_pool_count = cursor.read_u16::<BigEndian>()?;

        let symbols = SymbolTable::read(major_version, minor_version, constant_pool_count, &mut || {
            read_constant_pool_entry(&mut cursor)
        })?;

        let access_flags = cursor.read_u16::<BigEndian>()?;
        let this_class_index = cursor.read_u16::<BigEndian>()?;
        let super_class_index = cursor.read_u16::<BigEndian>()?;
        let interfaces_count = cursor.read_u16::<BigEndian>()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(cursor.read_u16::<BigEndian>()?);
        }
        let fields_offset = cursor.position() as usize;

        Ok(ClassReader {
            data,
            symbols,
            this_class_index,
            super_class_index,
            access_flags,
            interfaces,
            fields_offset,
        })
    }

    pub fn major_version(&self) -> u16 {
        self.symbols.major_version()
    }

    /// Hands back the decoded constant pool, consuming the reader. Lets a
    /// caller that's about to write a transform-free copy of this class seed
    /// a `ClassWriter` with the same indices this reader resolved, via
    /// `ClassWriter::with_shared_symbol_table`, instead of re-interning every
    /// constant from scratch as `accept` replays them.
    pub fn into_symbol_table(self) -> SymbolTable {
        self.symbols
    }

    /// Replays the whole class as a sequence of callbacks on `visitor`, in
    /// the fixed header/interfaces/fields/methods/attributes order JVMS §4.1
    /// lays the class file out in.
    pub fn accept(&self, visitor: &mut dyn ClassVisitor) -> Result<()> {
        let this_name = self
            .symbols
            .class_name(self.this_class_index)
            .ok_or_else(|| Error::format("this_class does not refer to a CONSTANT_Class"))?;
        let super_name = if self.super_class_index == 0 {
            None
        } else {
            Some(
                self.symbols
                    .class_name(self.super_class_index)
                    .ok_or_else(|| Error::format("super_class does not refer to a CONSTANT_Class"))?,
            )
        };
        let interface_names: Vec<String> = self
            .interfaces
            .iter()
            .map(|&i| {
                self.symbols
                    .class_name(i)
                    .map(str::to_owned)
                    .ok_or_else(|| Error::format("interfaces entry does not refer to a CONSTANT_Class"))
            })
            .collect::<Result<_>>()?;

        // Class-level attributes physically follow fields and methods in the
        // file, but the visitor callback order puts them right after `visit`
        // and before any `visit_field`/`visit_method` call. Walk past fields
        // and methods without decoding them to reach that section, decode
        // and dispatch it, then come back and replay fields/methods from the
        // top with a fresh cursor.
        let mut scan = Cursor::new(self.data);
        scan.set_position(self.fields_offset as u64);
        let fields_count = scan.read_u16::<BigEndian>()?;
        skip_members(&mut scan, fields_count)?;
        let methods_count = scan.read_u16::<BigEndian>()?;
        skip_members(&mut scan, methods_count)?;
        let class_attributes_count = scan.read_u16::<BigEndian>()?;
        let mut class_attributes = Vec::with_capacity(class_attributes_count as usize);
        for _ in 0..class_attributes_count {
            class_attributes.push(self.read_attribute(&mut scan)?);
        }

        let mut signature: Option<String> = None;
        let mut source_file: Option<String> = None;
        let mut nest_host: Option<String> = None;
        let mut outer_class: Option<(String, Option<String>, Option<String>)> = None;
        let mut visible_annotations: Option<Vec<u8>> = None;
        let mut invisible_annotations: Option<Vec<u8>> = None;
        let mut nest_members = Vec::new();
        let mut permitted_subclasses = Vec::new();
        let mut inner_classes = Vec::new();
        let mut record_components: Vec<(String, String, Option<String>, Vec<Attribute>)> = Vec::new();
        let mut remaining = Vec::new();

        for a in class_attributes {
            match a.name.as_str() {
                n if n == crate::constants::attr::SIGNATURE => signature = self.read_signature(&a.data)?,
                n if n == attr::SOURCE_FILE => {
                    let index = (&a.data[..]).read_u16::<BigEndian>()?;
                    source_file = self.symbols.utf8(index).map(str::to_owned);
                }
                n if n == attr::NEST_HOST => {
                    let index = (&a.data[..]).read_u16::<BigEndian>()?;
                    nest_host = Some(
                        self.symbols
                            .class_name(index)
                            .ok_or_else(|| Error::format("NestHost did not resolve to a CONSTANT_Class"))?
                            .to_owned(),
                    );
                }
                n if n == attr::ENCLOSING_METHOD => {
                    let mut cur = &a.data[..];
                    let class_index = cur.read_u16::<BigEndian>()?;
                    let method_index = cur.read_u16::<BigEndian>()?;
                    let owner = self
                        .symbols
                        .class_name(class_index)
                        .ok_or_else(|| Error::format("EnclosingMethod class_index did not resolve"))?
                        .to_owned();
                    let (method_name, method_descriptor) = if method_index != 0 {
                        self.symbols
                            .name_and_type(method_index)
                            .map(|(n, d)| (Some(n.to_owned()), Some(d.to_owned())))
                            .unwrap_or((None, None))
                    } else {
                        (None, None)
                    };
                    outer_class = Some((owner, method_name, method_descriptor));
                }
                n if n == attr::RUNTIME_VISIBLE_ANNOTATIONS => visible_annotations = Some(a.data.clone()),
                n if n == attr::RUNTIME_INVISIBLE_ANNOTATIONS => invisible_annotations = Some(a.data.clone()),
                n if n == attr::NEST_MEMBERS => {
                    let mut cur = &a.data[..];
                    let count = cur.read_u16::<BigEndian>()?;
                    for _ in 0..count {
                        let index = cur.read_u16::<BigEndian>()?;
                        nest_members.push(
                            self.symbols
                                .class_name(index)
                                .ok_or_else(|| Error::format("NestMembers entry did not resolve"))?
                                .to_owned(),
                        );
                    }
                }
                n if n == attr::PERMITTED_SUBCLASSES => {
                    let mut cur = &a.data[..];
                    let count = cur.read_u16::<BigEndian>()?;
                    for _ in 0..count {
                        let index = cur.read_u16::<BigEndian>()?;
                        permitted_subclasses.push(
                            self.symbols
                                .class_name(index)
                                .ok_or_else(|| Error::format("PermittedSubclasses entry did not resolve"))?
                                .to_owned(),
                        );
                    }
                }
                n if n == attr::INNER_CLASSES => {
                    let mut cur = &a.data[..];
                    let count = cur.read_u16::<BigEndian>()?;
                    for _ in 0..count {
                        let inner_index = cur.read_u16::<BigEndian>()?;
                        let outer_index = cur.read_u16::<BigEndian>()?;
                        let inner_name_index = cur.read_u16::<BigEndian>()?;
                        let access_flags = cur.read_u16::<BigEndian>()?;
                        let name = self
                            .symbols
                            .class_name(inner_index)
                            .ok_or_else(|| Error::format("InnerClasses inner_class_info did not resolve"))?
                            .to_owned();
                        let outer_name = if outer_index != 0 {
                            Some(
                                self.symbols
                                    .class_name(outer_index)
                                    .ok_or_else(|| Error::format("InnerClasses outer_class_info did not resolve"))?
                                    .to_owned(),
                            )
                        } else {
                            None
                        };
                        let inner_name = if inner_name_index != 0 {
                            self.symbols.utf8(inner_name_index).map(str::to_owned)
                        } else {
                            None
                        };
                        inner_classes.push((name, outer_name, inner_name, access_flags));
                    }
                }
                n if n == attr::RECORD => {
                    let mut cur = Cursor::new(&a.data[..]);
                    let count = cur.read_u16::<BigEndian>()?;
                    for _ in 0..count {
                        let name_index = cur.read_u16::<BigEndian>()?;
                        let descriptor_index = cur.read_u16::<BigEndian>()?;
                        let name = self
                            .symbols
                            .utf8(name_index)
                            .ok_or_else(|| Error::format("record component name_index did not resolve"))?
                            .to_owned();
                        let descriptor = self
                            .symbols
                            .utf8(descriptor_index)
                            .ok_or_else(|| Error::format("record component descriptor_index did not resolve"))?
                            .to_owned();
                        let attributes_count = cur.read_u16::<BigEndian>()?;
                        let mut attrs = Vec::with_capacity(attributes_count as usize);
                        for _ in 0..attributes_count {
                            attrs.push(self.read_attribute(&mut cur)?);
                        }
                        let mut component_signature = None;
                        for attribute in &attrs {
                            if attribute.name == crate::constants::attr::SIGNATURE {
                                component_signature = self.read_signature(&attribute.data)?;
                            }
                        }
                        record_components.push((name, descriptor, component_signature, attrs));
                    }
                }
                _ => remaining.push(a),
            }
        }

        visitor.visit(
            self.symbols.major_version(),
            self.symbols.minor_version(),
            self.access_flags,
            this_name,
            signature.as_deref(),
            super_name,
            &interface_names,
        )?;

        if source_file.is_some() {
            visitor.visit_source(source_file.as_deref(), None)?;
        }
        if let Some(nest_host) = &nest_host {
            visitor.visit_nest_host(nest_host)?;
        }
        if let Some((owner, name, descriptor)) = &outer_class {
            visitor.visit_outer_class(owner, name.as_deref(), descriptor.as_deref())?;
        }
        if let Some(data) = &visible_annotations {
            decode_annotations_list(data, &self.symbols, |descriptor| visitor.visit_annotation(descriptor, true))?;
        }
        if let Some(data) = &invisible_annotations {
            decode_annotations_list(data, &self.symbols, |descriptor| visitor.visit_annotation(descriptor, false))?;
        }
        for a in &remaining {
            visitor.visit_attribute(&a.name, &a.data)?;
        }
        for member in &nest_members {
            visitor.visit_nest_member(member)?;
        }
        for subclass in &permitted_subclasses {
            visitor.visit_permitted_subclass(subclass)?;
        }
        for (name, outer_name, inner_name, access_flags) in &inner_classes {
            visitor.visit_inner_class(name, outer_name.as_deref(), inner_name.as_deref(), *access_flags)?;
        }
        for (name, descriptor, component_signature, attrs) in &record_components {
            if let Some(mut rv) = visitor.visit_record_component(name, descriptor, component_signature.as_deref())? {
                for a in attrs {
                    if a.name != crate::constants::attr::SIGNATURE {
                        rv.visit_attribute(&a.name, &a.data)?;
                    }
                }
                rv.visit_end()?;
            }
        }

        let mut cursor = Cursor::new(self.data);
        cursor.set_position(self.fields_offset as u64);

        let fields_count = cursor.read_u16::<BigEndian>()?;
        for _ in 0..fields_count {
            self.read_member(&mut cursor, true, &mut |access_flags, name, descriptor, attrs| {
                let mut constant_value = None;
                let mut field_signature = None;
                for a in &attrs {
                    if a.name == attr::CONSTANT_VALUE {
                        constant_value = Some(self.read_constant_value(&a.data, descriptor)?);
                    } else if a.name == crate::constants::attr::SIGNATURE {
                        field_signature = self.read_signature(&a.data)?;
                    }
                }
                if let Some(mut fv) = visitor.visit_field(access_flags, name, descriptor, field_signature.as_deref(), constant_value)? {
                    for a in &attrs {
                        if a.name != attr::CONSTANT_VALUE && a.name != crate::constants::attr::SIGNATURE {
                            fv.visit_attribute(&a.name, &a.data)?;
                        }
                    }
                    fv.visit_end()?;
                }
                Ok(())
            })?;
        }

        let methods_count = cursor.read_u16::<BigEndian>()?;
        for _ in 0..methods_count {
            self.read_method(&mut cursor, visitor)?;
        }

        visitor.visit_end()
    }

    fn read_signature(&self, data: &[u8]) -> Result<Option<String>> {
        let index = (&data[..]).read_u16::<BigEndian>()?;
        Ok(self.symbols.utf8(index).map(str::to_owned))
    }

    fn read_constant_value(&self, data: &[u8], descriptor: &str) -> Result<ConstantValue> {
        let index = (&data[..]).read_u16::<BigEndian>()?;
        Ok(match descriptor {
            "I" | "S" | "B" | "C" | "Z" => {
                let v = read_pool_i32(&self.symbols, index)?;
                ConstantValue::Int(v)
            }
            "J" => ConstantValue::Long(read_pool_i64(&self.symbols, index)?),
            "F" => ConstantValue::Float(read_pool_f32(&self.symbols, index)?),
            "D" => ConstantValue::Double(read_pool_f64(&self.symbols, index)?),
            _ => ConstantValue::String(
                self.symbols
                    .utf8(index)
                    .ok_or_else(|| Error::format("ConstantValue String did not resolve"))?
                    .to_owned(),
            ),
        })
    }

    fn read_member(
        &self,
        cursor: &mut Cursor<&[u8]>,
        _is_field: bool,
        handle: &mut dyn FnMut(u16, &str, &str, Vec<Attribute>) -> Result<()>,
    ) -> Result<()> {
        let access_flags = cursor.read_u16::<BigEndian>()?;
        let name_index = cursor.read_u16::<BigEndian>()?;
        let descriptor_index = cursor.read_u16::<BigEndian>()?;
        let name = self
            .symbols
            .utf8(name_index)
            .ok_or_else(|| Error::format("member name_index did not resolve to a Utf8"))?
            .to_owned();
        let descriptor = self
            .symbols
            .utf8(descriptor_index)
            .ok_or_else(|| Error::format("member descriptor_index did not resolve to a Utf8"))?
            .to_owned();
        let attributes_count = cursor.read_u16::<BigEndian>()?;
        let mut attrs = Vec::with_capacity(attributes_count as usize);
        for _ in 0..attributes_count {
            attrs.push(self.read_attribute(cursor)?);
        }
        handle(access_flags, &name, &descriptor, attrs)
    }

    fn read_attribute(&self, cursor: &mut Cursor<&[u8]>) -> Result<Attribute> {
        let name_index = cursor.read_u16::<BigEndian>()?;
        let length = cursor.read_u32::<BigEndian>()?;
        let name = self
            .symbols
            .utf8(name_index)
            .ok_or_else(|| Error::format("attribute_name_index did not resolve to a Utf8"))?
            .to_owned();
        let mut data = vec![0u8; length as usize];
        cursor.read_exact(&mut data)?;
        Ok(Attribute::new(name, data))
    }

    fn read_method(&self, cursor: &mut Cursor<&[u8]>, class_visitor: &mut dyn ClassVisitor) -> Result<()> {
        let access_flags = cursor.read_u16::<BigEndian>()?;
        let name_index = cursor.read_u16::<BigEndian>()?;
        let descriptor_index = cursor.read_u16::<BigEndian>()?;
        let name = self
            .symbols
            .utf8(name_index)
            .ok_or_else(|| Error::format("method name_index did not resolve"))?
            .to_owned();
        let descriptor = self
            .symbols
            .utf8(descriptor_index)
            .ok_or_else(|| Error::format("method descriptor_index did not resolve"))?
            .to_owned();
        let attributes_count = cursor.read_u16::<BigEndian>()?;
        let mut attrs = Vec::with_capacity(attributes_count as usize);
        for _ in 0..attributes_count {
            attrs.push(self.read_attribute(cursor)?);
        }

        let mut exceptions = Vec::new();
        let mut signature = None;
        let mut code_attribute: Option<&Attribute> = None;
        let mut other_attrs = Vec::new();
        for a in &attrs {
            if a.name == attr::EXCEPTIONS {
                let mut r = &a.data[..];
                let count = r.read_u16::<BigEndian>()?;
                for _ in 0..count {
                    let index = r.read_u16::<BigEndian>()?;
                    if let Some(name) = self.symbols.class_name(index) {
                        exceptions.push(name.to_owned());
                    }
                }
            } else if a.name == crate::constants::attr::SIGNATURE {
                signature = self.read_signature(&a.data)?;
            } else if a.name == attr::CODE {
                code_attribute = Some(a);
            } else {
                other_attrs.push(a);
            }
        }

        let mv = class_visitor.visit_method(access_flags, &name, &descriptor, signature.as_deref(), &exceptions)?;
        let Some(mut mv) = mv else {
            return Ok(());
        };

        if let Some(code) = code_attribute {
            self.read_code(&code.data, mv.as_mut())?;
        }
        for a in other_attrs {
            mv.visit_attribute(&a.name, &a.data)?;
        }
        mv.visit_end()
    }

    /// Decodes one `Code` attribute body and drives the instruction-level
    /// visitor callbacks (JVMS §4.7.3).
    fn read_code(&self, data: &[u8], visitor: &mut dyn MethodVisitor) -> Result<()> {
        let mut cursor = Cursor::new(data);
        let max_stack = cursor.read_u16::<BigEndian>()?;
        let max_locals = cursor.read_u16::<BigEndian>()?;
        let code_length = cursor.read_u32::<BigEndian>()?;
        let code_start = cursor.position() as usize;
        let code_end = code_start + code_length as usize;
        let code = &data[code_start..code_end];
        cursor.set_position(code_end as u64);

        let mut labels = LabelTable::new();
        let mut label_at = HashMap::new();
        collect_label_targets(code, &mut |offset| {
            *label_at.entry(offset).or_insert_with(|| labels.new_label())
        });

        visitor.visit_code()?;

        let exception_table_length = cursor.read_u16::<BigEndian>()?;
        let mut handlers = Vec::with_capacity(exception_table_length as usize);
        for _ in 0..exception_table_length {
            let start_pc = cursor.read_u16::<BigEndian>()? as u32;
            let end_pc = cursor.read_u16::<BigEndian>()? as u32;
            let handler_pc = cursor.read_u16::<BigEndian>()? as u32;
            let catch_type = cursor.read_u16::<BigEndian>()?;
            handlers.push((start_pc, end_pc, handler_pc, catch_type));
        }
        for (start, end, handler, catch_type) in &handlers {
            let catch_name = if *catch_type == 0 {
                None
            } else {
                self.symbols.class_name(*catch_type)
            };
            visitor.visit_try_catch_block(
                *label_at.entry(*start).or_insert_with(|| labels.new_label()),
                *label_at.entry(*end).or_insert_with(|| labels.new_label()),
                *label_at.entry(*handler).or_insert_with(|| labels.new_label()),
                catch_name,
            )?;
        }

        let code_attributes_count = cursor.read_u16::<BigEndian>()?;
        let mut line_number_table = None;
        let mut local_variable_table = None;
        for _ in 0..code_attributes_count {
            let a = self.read_attribute(&mut cursor)?;
            if a.name == attr::LINE_NUMBER_TABLE {
                line_number_table = Some(a.data);
            } else if a.name == attr::LOCAL_VARIABLE_TABLE {
                local_variable_table = Some(a.data);
            }
        }

        self.walk_instructions(code, &label_at, visitor)?;

        if let Some(data) = line_number_table {
            let mut r = &data[..];
            let count = r.read_u16::<BigEndian>()?;
            for _ in 0..count {
                let start_pc = r.read_u16::<BigEndian>()? as u32;
                let line = r.read_u16::<BigEndian>()?;
                if let Some(&label) = label_at.get(&start_pc) {
                    visitor.visit_line_number(line, label)?;
                }
            }
        }
        if let Some(data) = local_variable_table {
            let mut r = &data[..];
            let count = r.read_u16::<BigEndian>()?;
            for _ in 0..count {
                let start_pc = r.read_u16::<BigEndian>()? as u32;
                let length = r.read_u16::<BigEndian>()? as u32;
                let name_index = r.read_u16::<BigEndian>()?;
                let descriptor_index = r.read_u16::<BigEndian>()?;
                let index = r.read_u16::<BigEndian>()?;
                let name = self.symbols.utf8(name_index).unwrap_or("").to_owned();
                let descriptor = self.symbols.utf8(descriptor_index).unwrap_or("").to_owned();
                let start_label = *label_at.entry(start_pc).or_insert_with(|| labels.new_label());
                let end_label = *label_at.entry(start_pc + length).or_insert_with(|| labels.new_label());
                visitor.visit_local_variable(&name, &descriptor, None, start_label, end_label, index)?;
            }
        }

        visitor.visit_max(max_stack, max_locals)
    }

    fn walk_instructions(
        &self,
        code: &[u8],
        label_at: &HashMap<u32, LabelId>,
        visitor: &mut dyn MethodVisitor,
    ) -> Result<()> {
        let mut offset = 0u32;
        let mut cursor = Cursor::new(code);
        while (cursor.position() as usize) < code.len() {
            if let Some(&label) = label_at.get(&offset) {
                visitor.visit_label(label)?;
            }
            let insn_start = cursor.position() as u32;
            let raw_opcode = cursor.read_u8()?;
            let wide = raw_opcode == opcode::WIDE;
            let op = if wide { cursor.read_u8()? } else { raw_opcode };

            match op {
                // No-operand instructions: constants, array loads/stores, the
                // *_0.._3 load/store family, stack ops, arithmetic/logic,
                // conversions, comparisons, returns, monitors.
                opcode::NOP
                | opcode::ACONST_NULL
                | 0x02..=0x0f // iconst_m1..dconst_1
                | 0x2e..=0x35 // iaload..saload
                | 0x4f..=0x56 // iastore..sastore
                | 0x57..=0x5f // pop..swap
                | 0x60..=0x83 // iadd..lxor
                | 0x85..=0x93 // i2l..i2s
                | 0x94..=0x98 // lcmp..dcmpg
                | opcode::IRETURN..=opcode::RETURN
                | opcode::ARRAYLENGTH
                | opcode::ATHROW
                | opcode::MONITORENTER
                | opcode::MONITOREXIT
                => {
                    visitor.visit_insn(op)?;
                }
                // The one-byte iload_0..astore_3 forms: recover the canonical
                // opcode and implied index so callers see the same shape as
                // the explicit `iload <n>` encoding.
                0x1a..=0x2d | 0x3b..=0x4e => {
                    let (canonical, index) = short_var_insn(op);
                    visitor.visit_var_insn(canonical, index)?;
                }
                opcode::BIPUSH => {
                    let v = cursor.read_i8()? as i32;
                    visitor.visit_int_insn(op, v)?;
                }
                opcode::SIPUSH => {
                    let v = cursor.read_i16::<BigEndian>()? as i32;
                    visitor.visit_int_insn(op, v)?;
                }
                opcode::NEWARRAY => {
                    let v = cursor.read_u8()? as i32;
                    visitor.visit_int_insn(op, v)?;
                }
                opcode::LDC => {
                    let index = cursor.read_u8()? as u16;
                    visitor.visit_ldc_insn(self.read_ldc(index)?)?;
                }
                opcode::LDC_W | opcode::LDC2_W => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    visitor.visit_ldc_insn(self.read_ldc(index)?)?;
                }
                opcode::ILOAD..=opcode::ALOAD | opcode::ISTORE..=opcode::ASTORE | opcode::RET => {
                    let index = if wide { cursor.read_u16::<BigEndian>()? } else { cursor.read_u8()? as u16 };
                    visitor.visit_var_insn(op, index)?;
                }
                opcode::IINC => {
                    let (index, increment) = if wide {
                        (cursor.read_u16::<BigEndian>()?, cursor.read_i16::<BigEndian>()? as i32)
                    } else {
                        (cursor.read_u8()? as u16, cursor.read_i8()? as i32)
                    };
                    visitor.visit_iinc_insn(index, increment)?;
                }
                opcode::NEW | opcode::ANEWARRAY | opcode::CHECKCAST | opcode::INSTANCEOF => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let name = self
                        .symbols
                        .class_name(index)
                        .ok_or_else(|| Error::format("type instruction index did not resolve"))?;
                    visitor.visit_type_insn(op, name)?;
                }
                opcode::GETSTATIC..=opcode::PUTFIELD => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let (owner, name, descriptor) = self
                        .symbols
                        .member_ref(index)
                        .ok_or_else(|| Error::format("field instruction index did not resolve"))?;
                    visitor.visit_field_insn(op, owner, name, descriptor)?;
                }
                opcode::INVOKEVIRTUAL | opcode::INVOKESPECIAL | opcode::INVOKESTATIC => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let (owner, name, descriptor) = self
                        .symbols
                        .member_ref(index)
                        .ok_or_else(|| Error::format("method instruction index did not resolve"))?;
                    visitor.visit_method_insn(op, owner, name, descriptor, false)?;
                }
                opcode::INVOKEINTERFACE => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let _count = cursor.read_u8()?;
                    let _zero = cursor.read_u8()?;
                    let (owner, name, descriptor) = self
                        .symbols
                        .member_ref(index)
                        .ok_or_else(|| Error::format("interface method instruction index did not resolve"))?;
                    visitor.visit_method_insn(op, owner, name, descriptor, true)?;
                }
                opcode::INVOKEDYNAMIC => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let _zero = cursor.read_u16::<BigEndian>()?;
                    let (name, descriptor, bootstrap_index) = self.read_invoke_dynamic(index)?;
                    visitor.visit_invoke_dynamic_insn(&name, &descriptor, bootstrap_index)?;
                }
                opcode::IFEQ..=opcode::JSR | opcode::IFNULL | opcode::IFNONNULL => {
                    let delta = cursor.read_i16::<BigEndian>()? as i64;
                    let target = (insn_start as i64 + delta) as u32;
                    let label = *label_at
                        .get(&target)
                        .ok_or_else(|| Error::format("jump target has no matching label"))?;
                    visitor.visit_jump_insn(op, label)?;
                }
                opcode::GOTO_W | opcode::JSR_W => {
                    let delta = cursor.read_i32::<BigEndian>()? as i64;
                    let target = (insn_start as i64 + delta) as u32;
                    let label = *label_at
                        .get(&target)
                        .ok_or_else(|| Error::format("jump target has no matching label"))?;
                    visitor.visit_jump_insn(if op == opcode::GOTO_W { opcode::GOTO } else { opcode::JSR }, label)?;
                }
                opcode::TABLESWITCH => {
                    while cursor.position() % 4 != 0 {
                        cursor.read_u8()?;
                    }
                    let default_offset = cursor.read_i32::<BigEndian>()? as i64;
                    let low = cursor.read_i32::<BigEndian>()?;
                    let high = cursor.read_i32::<BigEndian>()?;
                    let default_label = *label_at
                        .get(&((insn_start as i64 + default_offset) as u32))
                        .ok_or_else(|| Error::format("tableswitch default has no label"))?;
                    let mut targets = Vec::new();
                    for _ in low..=high {
                        let offset = cursor.read_i32::<BigEndian>()? as i64;
                        targets.push(
                            *label_at
                                .get(&((insn_start as i64 + offset) as u32))
                                .ok_or_else(|| Error::format("tableswitch target has no label"))?,
                        );
                    }
                    visitor.visit_table_switch_insn(low, high, default_label, &targets)?;
                }
                opcode::LOOKUPSWITCH => {
                    while cursor.position() % 4 != 0 {
                        cursor.read_u8()?;
                    }
                    let default_offset = cursor.read_i32::<BigEndian>()? as i64;
                    let npairs = cursor.read_i32::<BigEndian>()?;
                    let default_label = *label_at
                        .get(&((insn_start as i64 + default_offset) as u32))
                        .ok_or_else(|| Error::format("lookupswitch default has no label"))?;
                    let mut pairs = Vec::with_capacity(npairs as usize);
                    for _ in 0..npairs {
                        let key = cursor.read_i32::<BigEndian>()?;
                        let offset = cursor.read_i32::<BigEndian>()? as i64;
                        let label = *label_at
                            .get(&((insn_start as i64 + offset) as u32))
                            .ok_or_else(|| Error::format("lookupswitch target has no label"))?;
                        pairs.push((key, label));
                    }
                    visitor.visit_lookup_switch_insn(default_label, &pairs)?;
                }
                opcode::MULTIANEWARRAY => {
                    let index = cursor.read_u16::<BigEndian>()?;
                    let dimensions = cursor.read_u8()?;
                    let name = self
                        .symbols
                        .class_name(index)
                        .ok_or_else(|| Error::format("multianewarray index did not resolve"))?;
                    visitor.visit_multi_anew_array_insn(name, dimensions)?;
                }
                other => {
                    return Err(Error::format(format!("unrecognized opcode 0x{other:02X}")));
                }
            }
            offset = cursor.position() as u32;
        }
        Ok(())
    }

    fn read_ldc(&self, index: u16) -> Result<LdcValue> {
        Ok(match read_pool_tag(&self.symbols, index)? {
            tag::INTEGER => LdcValue::Int(read_pool_i32(&self.symbols, index)?),
            tag::FLOAT => LdcValue::Float(read_pool_f32(&self.symbols, index)?),
            tag::LONG => LdcValue::Long(read_pool_i64(&self.symbols, index)?),
            tag::DOUBLE => LdcValue::Double(read_pool_f64(&self.symbols, index)?),
            tag::STRING => LdcValue::String(
                self.symbols
                    .utf8(index)
                    .ok_or_else(|| Error::format("ldc string constant did not resolve"))?
                    .to_owned(),
            ),
            tag::CLASS => LdcValue::Class(
                self.symbols
                    .class_name(index)
                    .ok_or_else(|| Error::format("ldc class constant did not resolve"))?
                    .to_owned(),
            ),
            tag::METHOD_TYPE => LdcValue::MethodType(
                self.symbols
                    .utf8(index)
                    .ok_or_else(|| Error::format("ldc MethodType descriptor did not resolve"))?
                    .to_owned(),
            ),
            tag::DYNAMIC => {
                let (name, descriptor, bootstrap_method_index) = self.read_invoke_dynamic(index)?;
                LdcValue::Dynamic { name, descriptor, bootstrap_method_index }
            }
            t => return Err(Error::format(format!("ldc cannot load constant pool tag {t}"))),
        })
    }

    /// Shared by `invokedynamic` and `CONSTANT_Dynamic` loads: both entries
    /// are `(bootstrap_method_attr_index, name_and_type_index)` pairs.
    fn read_invoke_dynamic(&self, index: u16) -> Result<(String, String, u16)> {
        let (name, descriptor) = self
            .symbols
            .invoke_dynamic_name_and_type(index)
            .ok_or_else(|| Error::format("invokedynamic/dynamic index did not resolve"))?;
        let bootstrap_index = self
            .symbols
            .invoke_dynamic_bootstrap_index(index)
            .ok_or_else(|| Error::format("invokedynamic/dynamic index did not resolve a bootstrap index"))?;
        Ok((name.to_owned(), descriptor.to_owned(), bootstrap_index))
    }
}

/// Maps a one-byte `iload_0`..`astore_3` opcode back to its canonical
/// `iload`/`istore`-family opcode plus the local index it implies.
fn short_var_insn(op: u8) -> (u8, u16) {
    match op {
        0x1a..=0x1d => (opcode::ILOAD, (op - opcode::ILOAD_0) as u16),
        0x1e..=0x21 => (opcode::LLOAD, (op - opcode::LLOAD_0) as u16),
        0x22..=0x25 => (opcode::FLOAD, (op - opcode::FLOAD_0) as u16),
        0x26..=0x29 => (opcode::DLOAD, (op - opcode::DLOAD_0) as u16),
        0x2a..=0x2d => (opcode::ALOAD, (op - opcode::ALOAD_0) as u16),
        0x3b..=0x3e => (opcode::ISTORE, (op - opcode::ISTORE_0) as u16),
        0x3f..=0x42 => (opcode::LSTORE, (op - opcode::LSTORE_0) as u16),
        0x43..=0x46 => (opcode::FSTORE, (op - opcode::FSTORE_0) as u16),
        0x47..=0x4a => (opcode::DSTORE, (op - opcode::DSTORE_0) as u16),
        _ => (opcode::ASTORE, (op - opcode::ASTORE_0) as u16),
    }
}

/// Walks past `count` `field_info`/`method_info` entries without decoding
/// them, just enough to reach whatever follows (the class-level attributes
/// table, which is emitted after fields and methods on the wire but visited
/// before them in callback order).
fn skip_members(cursor: &mut Cursor<&[u8]>, count: u16) -> Result<()> {
    for _ in 0..count {
        cursor.read_u16::<BigEndian>()?; // access_flags
        cursor.read_u16::<BigEndian>()?; // name_index
        cursor.read_u16::<BigEndian>()?; // descriptor_index
        let attributes_count = cursor.read_u16::<BigEndian>()?;
        for _ in 0..attributes_count {
            cursor.read_u16::<BigEndian>()?; // attribute_name_index
            let length = cursor.read_u32::<BigEndian>()?;
            cursor.set_position(cursor.position() + length as u64);
        }
    }
    Ok(())
}

/// Decodes one JVMS §4.7.16.1 `element_value`, forwarding it to `visitor`.
/// Mirrors `AnnotationWriter`'s tag encoding exactly.
fn decode_element_value(
    cursor: &mut Cursor<&[u8]>,
    symbols: &SymbolTable,
    name: Option<&str>,
    visitor: &mut dyn AnnotationVisitor,
) -> Result<()> {
    let tag = cursor.read_u8()?;
    match tag {
        b'B' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Byte(read_pool_i32(symbols, index)? as i8))?;
        }
        b'C' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Char(read_pool_i32(symbols, index)? as u16))?;
        }
        b'D' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Double(read_pool_f64(symbols, index)?))?;
        }
        b'F' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Float(read_pool_f32(symbols, index)?))?;
        }
        b'I' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Int(read_pool_i32(symbols, index)?))?;
        }
        b'J' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Long(read_pool_i64(symbols, index)?))?;
        }
        b'S' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Short(read_pool_i32(symbols, index)? as i16))?;
        }
        b'Z' => {
            let index = cursor.read_u16::<BigEndian>()?;
            visitor.visit(name, AnnotationValue::Boolean(read_pool_i32(symbols, index)? != 0))?;
        }
        b's' => {
            let index = cursor.read_u16::<BigEndian>()?;
            let v = symbols.utf8(index).ok_or_else(|| Error::format("element_value string did not resolve to a Utf8"))?;
            visitor.visit(name, AnnotationValue::String(v.to_owned()))?;
        }
        b'c' => {
            let index = cursor.read_u16::<BigEndian>()?;
            let v = symbols.utf8(index).ok_or_else(|| Error::format("element_value class did not resolve to a Utf8"))?;
            visitor.visit(name, AnnotationValue::Class(v.to_owned()))?;
        }
        b'e' => {
            let type_index = cursor.read_u16::<BigEndian>()?;
            let const_index = cursor.read_u16::<BigEndian>()?;
            let type_name = symbols
                .utf8(type_index)
                .ok_or_else(|| Error::format("enum_const_value type_name_index did not resolve"))?;
            let const_name = symbols
                .utf8(const_index)
                .ok_or_else(|| Error::format("enum_const_value const_name_index did not resolve"))?;
            visitor.visit_enum(name, type_name, const_name)?;
        }
        b'@' => {
            let type_index = cursor.read_u16::<BigEndian>()?;
            let descriptor = symbols
                .utf8(type_index)
                .ok_or_else(|| Error::format("nested annotation type_index did not resolve"))?
                .to_owned();
            let num_pairs = cursor.read_u16::<BigEndian>()?;
            if let Some(mut nested) = visitor.visit_annotation(name, &descriptor)? {
                for _ in 0..num_pairs {
                    let pair_name_index = cursor.read_u16::<BigEndian>()?;
                    let pair_name = symbols.utf8(pair_name_index).map(str::to_owned);
                    decode_element_value(cursor, symbols, pair_name.as_deref(), nested.as_mut())?;
                }
                nested.visit_end()?;
            } else {
                for _ in 0..num_pairs {
                    cursor.read_u16::<BigEndian>()?;
                    skip_element_value(cursor)?;
                }
            }
        }
        b'[' => {
            let num_values = cursor.read_u16::<BigEndian>()?;
            if let Some(mut nested) = visitor.visit_array(name)? {
                for _ in 0..num_values {
                    decode_element_value(cursor, symbols, None, nested.as_mut())?;
                }
                nested.visit_end()?;
            } else {
                for _ in 0..num_values {
                    skip_element_value(cursor)?;
                }
            }
        }
        other => return Err(Error::format(format!("unknown element_value tag 0x{other:02x}"))),
    }
    Ok(())
}

/// Advances past one `element_value` without decoding it, for a nested
/// annotation/array whose owning callback declined (`visit_annotation`
/// returned `None`).
fn skip_element_value(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    let tag = cursor.read_u8()?;
    match tag {
        b'e' => {
            cursor.read_u16::<BigEndian>()?;
            cursor.read_u16::<BigEndian>()?;
        }
        b'@' => {
            cursor.read_u16::<BigEndian>()?;
            let num_pairs = cursor.read_u16::<BigEndian>()?;
            for _ in 0..num_pairs {
                cursor.read_u16::<BigEndian>()?;
                skip_element_value(cursor)?;
            }
        }
        b'[' => {
            let num_values = cursor.read_u16::<BigEndian>()?;
            for _ in 0..num_values {
                skip_element_value(cursor)?;
            }
        }
        _ => {
            cursor.read_u16::<BigEndian>()?;
        }
    }
    Ok(())
}

/// Decodes a `RuntimeVisible/InvisibleAnnotations` attribute body, calling
/// `visit_one` per annotation to get the consumer's `AnnotationVisitor` (or
/// `None` to skip it while still advancing the cursor correctly).
fn decode_annotations_list<F>(data: &[u8], symbols: &SymbolTable, mut visit_one: F) -> Result<()>
where
    F: FnMut(&str) -> Result<Option<Box<dyn AnnotationVisitor>>>,
{
    let mut cursor = Cursor::new(data);
    let count = cursor.read_u16::<BigEndian>()?;
    for _ in 0..count {
        let type_index = cursor.read_u16::<BigEndian>()?;
        let descriptor = symbols
            .utf8(type_index)
            .ok_or_else(|| Error::format("annotation type_index did not resolve to a Utf8"))?
            .to_owned();
        let num_pairs = cursor.read_u16::<BigEndian>()?;
        if let Some(mut av) = visit_one(&descriptor)? {
            for _ in 0..num_pairs {
                let name_index = cursor.read_u16::<BigEndian>()?;
                let name = symbols.utf8(name_index).map(str::to_owned);
                decode_element_value(&mut cursor, symbols, name.as_deref(), av.as_mut())?;
            }
            av.visit_end()?;
        } else {
            for _ in 0..num_pairs {
                cursor.read_u16::<BigEndian>()?;
                skip_element_value(&mut cursor)?;
            }
        }
    }
    Ok(())
}

fn read_pool_tag(symbols: &SymbolTable, index: u16) -> Result<u8> {
    symbols
        .entry_tag(index)
        .ok_or_else(|| Error::format("constant pool index did not resolve"))
}

fn read_pool_i32(symbols: &SymbolTable, index: u16) -> Result<i32> {
    symbols
        .integer_value(index)
        .ok_or_else(|| Error::format("expected CONSTANT_Integer"))
}

fn read_pool_f32(symbols: &SymbolTable, index: u16) -> Result<f32> {
    symbols
        .float_value(index)
        .ok_or_else(|| Error::format("expected CONSTANT_Float"))
}

fn read_pool_i64(symbols: &SymbolTable, index: u16) -> Result<i64> {
    symbols
        .long_value(index)
        .ok_or_else(|| Error::format("expected CONSTANT_Long"))
}

fn read_pool_f64(symbols: &SymbolTable, index: u16) -> Result<f64> {
    symbols
        .double_value(index)
        .ok_or_else(|| Error::format("expected CONSTANT_Double"))
}

fn read_constant_pool_entry(cursor: &mut Cursor<&[u8]>) -> Result<(u8, RawEntry)> {
    let tag = cursor.read_u8()?;
    let raw = match tag {
        t if t == tag::UTF8 => {
            let len = cursor.read_u16::<BigEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            cursor.read_exact(&mut bytes)?;
            RawEntry::Utf8(modified_utf8::decode(&bytes)?)
        }
        t if t == tag::INTEGER || t == tag::FLOAT => RawEntry::FourBytes(cursor.read_u32::<BigEndian>()?),
        t if t == tag::LONG || t == tag::DOUBLE => RawEntry::EightBytes(cursor.read_u64::<BigEndian>()?),
        t if t == tag::CLASS || t == tag::STRING || t == tag::METHOD_TYPE || t == tag::MODULE || t == tag::PACKAGE => {
            RawEntry::OneIndex(cursor.read_u16::<BigEndian>()?)
        }
        t if t == tag::FIELDREF
            || t == tag::METHODREF
            || t == tag::INTERFACE_METHODREF
            || t == tag::NAME_AND_TYPE
            || t == tag::DYNAMIC
            || t == tag::INVOKE_DYNAMIC =>
        {
            RawEntry::TwoIndices(cursor.read_u16::<BigEndian>()?, cursor.read_u16::<BigEndian>()?)
        }
        t if t == tag::METHOD_HANDLE => RawEntry::MethodHandle(cursor.read_u8()?, cursor.read_u16::<BigEndian>()?),
        other => return Err(Error::format(format!("unrecognized constant pool tag {other}"))),
    };
    Ok((tag, raw))
}

/// Scans the code array once to find every offset that is the target of a
/// jump, switch, exception range, or local-variable range, assigning each a
/// `LabelId` up front so `walk_instructions` never needs a second pass.
fn collect_label_targets(code: &[u8], mut new_label: impl FnMut(u32) -> LabelId) {
    let mut cursor = Cursor::new(code);
    while (cursor.position() as usize) < code.len() {
        let insn_start = cursor.position() as u32;
        let Ok(raw_opcode) = cursor.read_u8() else { break };
        let wide = raw_opcode == opcode::WIDE;
        let Ok(op) = (if wide { cursor.read_u8() } else { Ok(raw_opcode) }) else { break };
        let skip = |cursor: &mut Cursor<&[u8]>, n: i64| {
            cursor.set_position((cursor.position() as i64 + n) as u64);
        };
        match op {
            opcode::BIPUSH | opcode::NEWARRAY | opcode::LDC => skip(&mut cursor, 1),
            opcode::SIPUSH | opcode::LDC_W | opcode::LDC2_W | opcode::NEW | opcode::ANEWARRAY | opcode::CHECKCAST
            | opcode::INSTANCEOF | opcode::GETSTATIC..=opcode::PUTFIELD | opcode::INVOKEVIRTUAL
            | opcode::INVOKESPECIAL | opcode::INVOKESTATIC => skip(&mut cursor, 2),
            opcode::INVOKEINTERFACE | opcode::INVOKEDYNAMIC | opcode::MULTIANEWARRAY => {
                skip(&mut cursor, if op == opcode::MULTIANEWARRAY { 3 } else { 4 })
            }
            opcode::ILOAD..=opcode::ALOAD | opcode::ISTORE..=opcode::ASTORE | opcode::RET => {
                skip(&mut cursor, if wide { 2 } else { 1 })
            }
            opcode::IINC => skip(&mut cursor, if wide { 4 } else { 2 }),
            opcode::IFEQ..=opcode::JSR | opcode::IFNULL | opcode::IFNONNULL => {
                if let Ok(delta) = cursor.read_i16::<BigEndian>() {
                    new_label((insn_start as i64 + delta as i64) as u32);
                }
            }
            opcode::GOTO_W | opcode::JSR_W => {
                if let Ok(delta) = cursor.read_i32::<BigEndian>() {
                    new_label((insn_start as i64 + delta as i64) as u32);
                }
            }
            opcode::TABLESWITCH => {
                while cursor.position() % 4 != 0 {
                    let _ = cursor.read_u8();
                }
                if let (Ok(default_offset), Ok(low), Ok(high)) = (
                    cursor.read_i32::<BigEndian>(),
                    cursor.read_i32::<BigEndian>(),
                    cursor.read_i32::<BigEndian>(),
                ) {
                    new_label((insn_start as i64 + default_offset as i64) as u32);
                    for _ in low..=high {
                        if let Ok(offset) = cursor.read_i32::<BigEndian>() {
                            new_label((insn_start as i64 + offset as i64) as u32);
                        }
                    }
                }
            }
            opcode::LOOKUPSWITCH => {
                while cursor.position() % 4 != 0 {
                    let _ = cursor.read_u8();
                }
                if let (Ok(default_offset), Ok(npairs)) =
                    (cursor.read_i32::<BigEndian>(), cursor.read_i32::<BigEndian>())
                {
                    new_label((insn_start as i64 + default_offset as i64) as u32);
                    for _ in 0..npairs {
                        let _ = cursor.read_i32::<BigEndian>();
                        if let Ok(offset) = cursor.read_i32::<BigEndian>() {
                            new_label((insn_start as i64 + offset as i64) as u32);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let data = [0u8, 0, 0, 0];
        assert!(matches!(ClassReader::new(&data), Err(Error::Io(_)) | Err(Error::Format { .. })));
    }
}
