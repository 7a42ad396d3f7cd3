//! Serializes one `field_info` structure (JVMS §4.5).
//!
//! Shares `MethodWriter`'s "collect via visitor callbacks, serialize once at
//! the end" shape, but without any of its code-specific machinery.

use crate::attribute::AttributeList;
use crate::bytevector::ByteVector;
use crate::constants::attr;
use crate::error::Result;
use crate::symbol::SymbolTable;
use crate::version;
use crate::visitor::{AnnotationVisitor, ConstantValue, FieldVisitor};
use crate::writer::annotation_writer::AnnotationWriter;
use std::cell::RefCell;
use std::rc::Rc;

pub struct FieldWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    major_version: u16,
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    signature_index: Option<u16>,
    constant_value_index: Option<u16>,
    visible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    invisible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    attributes: AttributeList,
}

impl FieldWriter {
    pub fn new(
        symbols: Rc<RefCell<SymbolTable>>,
        major_version: u16,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        constant_value: Option<ConstantValue>,
    ) -> Result<Self> {
        let (name_index, descriptor_index, signature_index, constant_value_index) = {
            let mut st = symbols.borrow_mut();
            let name_index = st.add_constant_utf8(name)?;
            let descriptor_index = st.add_constant_utf8(descriptor)?;
            let signature_index = signature.map(|s| st.add_constant_utf8(s)).transpose()?;
            let constant_value_index = constant_value
                .map(|v| add_constant_value(&mut st, v))
                .transpose()?;
            (name_index, descriptor_index, signature_index, constant_value_index)
        };
        Ok(FieldWriter {
            symbols,
            major_version,
            access_flags,
            name_index,
            descriptor_index,
            signature_index,
            constant_value_index,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            attributes: AttributeList::new(),
        })
    }

    fn needs_synthetic_attribute(&self) -> bool {
        version::requires_synthetic_attribute(self.major_version) && self.access_flags & 0x1000 != 0
    }

    fn attribute_count(&self) -> u16 {
        let mut count = 0u16;
        count += self.signature_index.is_some() as u16;
        count += self.constant_value_index.is_some() as u16;
        count += self.needs_synthetic_attribute() as u16;
        count += !self.visible_annotations.is_empty() as u16;
        count += !self.invisible_annotations.is_empty() as u16;
        count += self.attributes.len() as u16;
        count
    }

    pub fn serialize(&self, out: &mut ByteVector) -> Result<()> {
        out.put_short(self.access_flags);
        out.put_short(self.name_index);
        out.put_short(self.descriptor_index);
        out.put_short(self.attribute_count());

        if let Some(index) = self.constant_value_index {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::CONSTANT_VALUE)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        if let Some(index) = self.signature_index {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(crate::constants::attr::SIGNATURE)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
        }
        if self.needs_synthetic_attribute() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(attr::SYNTHETIC)?;
            out.put_short(name);
            out.put_int(0);
        }
        write_annotations_attribute(&self.symbols, out, attr::RUNTIME_VISIBLE_ANNOTATIONS, &self.visible_annotations)?;
        write_annotations_attribute(&self.symbols, out, attr::RUNTIME_INVISIBLE_ANNOTATIONS, &self.invisible_annotations)?;
        for attribute in self.attributes.iter() {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(&attribute.name)?;
            out.put_short(name);
            out.put_int(attribute.data.len() as u32);
            out.put_byte_array(&attribute.data);
        }
        Ok(())
    }
}

impl FieldVisitor for FieldWriter {
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
        self.attributes.push_back(crate::attribute::Attribute::new(name, data.to_vec()));
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        Ok(())
    }
}

fn add_constant_value(symbols: &mut SymbolTable, value: ConstantValue) -> Result<u16> {
    match value {
        ConstantValue::Int(v) => symbols.add_constant_integer(v),
        ConstantValue::Float(v) => symbols.add_constant_float(v),
        ConstantValue::Long(v) => symbols.add_constant_long(v),
        ConstantValue::Double(v) => symbols.add_constant_double(v),
        ConstantValue::String(v) => symbols.add_constant_string(&v),
    }
}

/// Shared by every writer that can carry `RuntimeVisible/InvisibleAnnotations`
/// (`FieldWriter`, `RecordComponentWriter`, `MethodWriter`, `ClassWriter`):
/// wraps a list of pre-serialized `annotation` buffers with the attribute
/// header, writing nothing if the list is empty.
pub(crate) fn write_annotations_attribute(
    symbols: &Rc<RefCell<SymbolTable>>,
    out: &mut ByteVector,
    attribute_name: &str,
    annotations: &[Rc<RefCell<ByteVector>>],
) -> Result<()> {
    if annotations.is_empty() {
        return Ok(());
    }
    let name_index = symbols.borrow_mut().add_constant_utf8(attribute_name)?;
    let mut body = ByteVector::new();
    body.put_short(annotations.len() as u16);
    for annotation in annotations {
        body.put_byte_array(annotation.borrow().as_bytes());
    }
    out.put_short(name_index);
    out.put_int(body.len() as u32);
    out.put_byte_array(body.as_bytes());
    Ok(())
}
