//! Serializes one `record_component_info` structure (JVMS §4.7.30), added by
//! the `Record` attribute (class-file version >= 58).
//!
//! Shaped identically to `FieldWriter` minus `access_flags` and
//! `ConstantValue` — a record component is a name/descriptor pair that can
//! carry a signature, annotations, and arbitrary attributes, nothing else.

use crate::attribute::AttributeList;
use crate::bytevector::ByteVector;
use crate::constants::attr;
use crate::error::Result;
use crate::symbol::SymbolTable;
use crate::visitor::{AnnotationVisitor, RecordComponentVisitor};
use crate::writer::annotation_writer::AnnotationWriter;
use crate::writer::field_writer::write_annotations_attribute;
use std::cell::RefCell;
use std::rc::Rc;

pub struct RecordComponentWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    name_index: u16,
    descriptor_index: u16,
    signature_index: Option<u16>,
    visible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    invisible_annotations: Vec<Rc<RefCell<ByteVector>>>,
    attributes: AttributeList,
}

impl RecordComponentWriter {
    pub fn new(
        symbols: Rc<RefCell<SymbolTable>>,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
    ) -> Result<Self> {
        let (name_index, descriptor_index, signature_index) = {
            let mut st = symbols.borrow_mut();
            (
                st.add_constant_utf8(name)?,
                st.add_constant_utf8(descriptor)?,
                signature.map(|s| st.add_constant_utf8(s)).transpose()?,
            )
        };
        Ok(RecordComponentWriter {
            symbols,
            name_index,
            descriptor_index,
            signature_index,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            attributes: AttributeList::new(),
        })
    }

    fn attribute_count(&self) -> u16 {
        self.signature_index.is_some() as u16
            + !self.visible_annotations.is_empty() as u16
            + !self.invisible_annotations.is_empty() as u16
            + self.attributes.len() as u16
    }

    pub fn serialize(&self, out: &mut ByteVector) -> Result<()> {
        out.put_short(self.name_index);
        out.put_short(self.descriptor_index);
        out.put_short(self.attribute_count());
        if let Some(index) = self.signature_index {
            let mut st = self.symbols.borrow_mut();
            let name = st.add_constant_utf8(crate::constants::attr::SIGNATURE)?;
            out.put_short(name);
            out.put_int(2);
            out.put_short(index);
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

impl RecordComponentVisitor for RecordComponentWriter {
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
