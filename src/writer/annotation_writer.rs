//! Serializes one `annotation` structure (JVMS §4.7.16) from visitor
//! callbacks.
//!
//! `element_value` is a tagged union of primitive, `String`, `Class`,
//! `enum_const`, nested `annotation`, or `array`. `AnnotationWriter` buffers
//! its `element_value` pairs into a `ByteVector` as each one is visited, then
//! the owning `ClassWriter`/`MethodWriter`/`FieldWriter` wraps that buffer
//! with the enclosing `RuntimeVisible/InvisibleAnnotations` attribute header.

use crate::bytevector::ByteVector;
use crate::error::Result;
use crate::symbol::SymbolTable;
use crate::visitor::{AnnotationValue, AnnotationVisitor};
use std::cell::RefCell;
use std::rc::Rc;

/// Tag bytes for `element_value.tag` (JVMS §4.7.16.1).
mod tag {
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const DOUBLE: u8 = b'D';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const ENUM: u8 = b'e';
    pub const CLASS: u8 = b'c';
    pub const ANNOTATION: u8 = b'@';
    pub const ARRAY: u8 = b'[';
}

/// Writes one `annotation` or `array` element_value body directly into a
/// shared `ByteVector`, via a `Rc<RefCell<_>>` on the constant pool since
/// nested annotation/array visitors borrow the same symbol table and output
/// buffer as their parent for the lifetime of the visit.
pub struct AnnotationWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    out: Rc<RefCell<ByteVector>>,
    /// Offset of this annotation's `num_element_value_pairs` (or, for an
    /// array, `num_values`) field, patched in `visit_end`.
    count_offset: usize,
    count: u16,
    is_array: bool,
}

impl AnnotationWriter {
    /// Starts a top-level `annotation` structure: writes `type_index` and
    /// reserves the pair-count slot, returning a writer that appends pairs
    /// to `out` until `visit_end`.
    pub fn new_annotation(
        symbols: Rc<RefCell<SymbolTable>>,
        out: Rc<RefCell<ByteVector>>,
        descriptor: &str,
    ) -> Result<Self> {
        let type_index = symbols.borrow_mut().add_constant_utf8(descriptor)?;
        let mut buf = out.borrow_mut();
        buf.put_short(type_index);
        let count_offset = buf.reserve(2);
        drop(buf);
        Ok(AnnotationWriter {
            symbols,
            out,
            count_offset,
            count: 0,
            is_array: false,
        })
    }

    /// Starts an `array` element_value body: reserves `num_values` only (no
    /// type index — JVMS §4.7.16.1 `array_value` has none).
    pub fn new_array(symbols: Rc<RefCell<SymbolTable>>, out: Rc<RefCell<ByteVector>>) -> Self {
        let count_offset = out.borrow_mut().reserve(2);
        AnnotationWriter {
            symbols,
            out,
            count_offset,
            count: 0,
            is_array: true,
        }
    }

    fn write_name(&self, name: Option<&str>) -> Result<()> {
        if self.is_array {
            return Ok(());
        }
        let index = self.symbols.borrow_mut().add_constant_utf8(name.unwrap_or(""))?;
        self.out.borrow_mut().put_short(index);
        Ok(())
    }
}

impl AnnotationVisitor for AnnotationWriter {
    fn visit(&mut self, name: Option<&str>, value: AnnotationValue) -> Result<()> {
        self.write_name(name)?;
        let mut symbols = self.symbols.borrow_mut();
        let mut out = self.out.borrow_mut();
        match value {
            AnnotationValue::Byte(v) => {
                out.put_byte(tag::BYTE);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Char(v) => {
                out.put_byte(tag::CHAR);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Short(v) => {
                out.put_byte(tag::SHORT);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Boolean(v) => {
                out.put_byte(tag::BOOLEAN);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Int(v) => {
                out.put_byte(tag::INT);
                out.put_short(symbols.add_constant_integer(v)?);
            }
            AnnotationValue::Float(v) => {
                out.put_byte(tag::FLOAT);
                out.put_short(symbols.add_constant_float(v)?);
            }
            AnnotationValue::Long(v) => {
                out.put_byte(tag::LONG);
                out.put_short(symbols.add_constant_long(v)?);
            }
            AnnotationValue::Double(v) => {
                out.put_byte(tag::DOUBLE);
                out.put_short(symbols.add_constant_double(v)?);
            }
            AnnotationValue::String(v) => {
                out.put_byte(tag::STRING);
                out.put_short(symbols.add_constant_utf8(&v)?);
            }
            AnnotationValue::Class(v) => {
                out.put_byte(tag::CLASS);
                out.put_short(symbols.add_constant_utf8(&v)?);
            }
        }
        drop(out);
        drop(symbols);
        self.count += 1;
        Ok(())
    }

    fn visit_enum(&mut self, name: Option<&str>, descriptor: &str, value: &str) -> Result<()> {
        self.write_name(name)?;
        let mut symbols = self.symbols.borrow_mut();
        let descriptor_index = symbols.add_constant_utf8(descriptor)?;
        let value_index = symbols.add_constant_utf8(value)?;
        drop(symbols);
        let mut out = self.out.borrow_mut();
        out.put_byte(tag::ENUM);
        out.put_short(descriptor_index);
        out.put_short(value_index);
        drop(out);
        self.count += 1;
        Ok(())
    }

    fn visit_annotation(&mut self, name: Option<&str>, descriptor: &str) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.write_name(name)?;
        self.out.borrow_mut().put_byte(tag::ANNOTATION);
        self.count += 1;
        let nested = AnnotationWriter::new_annotation(self.symbols.clone(), self.out.clone(), descriptor)?;
        Ok(Some(Box::new(nested)))
    }

    fn visit_array(&mut self, name: Option<&str>) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.write_name(name)?;
        self.out.borrow_mut().put_byte(tag::ARRAY);
        self.count += 1;
        let nested = AnnotationWriter::new_array(self.symbols.clone(), self.out.clone());
        Ok(Some(Box::new(nested)))
    }

    fn visit_end(&mut self) -> Result<()> {
        self.out.borrow_mut().set_short_at(self.count_offset, self.count);
        Ok(())
    }
}

/// Writes a single bare `element_value` with no enclosing name or count —
/// used for `AnnotationDefault` (JVMS §4.7.22), whose body is exactly one
/// `element_value` and nothing else.
pub struct ElementValueWriter {
    symbols: Rc<RefCell<SymbolTable>>,
    out: Rc<RefCell<ByteVector>>,
}

impl ElementValueWriter {
    pub fn new(symbols: Rc<RefCell<SymbolTable>>, out: Rc<RefCell<ByteVector>>) -> Self {
        ElementValueWriter { symbols, out }
    }
}

impl AnnotationVisitor for ElementValueWriter {
    fn visit(&mut self, _name: Option<&str>, value: AnnotationValue) -> Result<()> {
        let mut symbols = self.symbols.borrow_mut();
        let mut out = self.out.borrow_mut();
        match value {
            AnnotationValue::Byte(v) => {
                out.put_byte(tag::BYTE);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Char(v) => {
                out.put_byte(tag::CHAR);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Short(v) => {
                out.put_byte(tag::SHORT);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Boolean(v) => {
                out.put_byte(tag::BOOLEAN);
                out.put_short(symbols.add_constant_integer(v as i32)?);
            }
            AnnotationValue::Int(v) => {
                out.put_byte(tag::INT);
                out.put_short(symbols.add_constant_integer(v)?);
            }
            AnnotationValue::Float(v) => {
                out.put_byte(tag::FLOAT);
                out.put_short(symbols.add_constant_float(v)?);
            }
            AnnotationValue::Long(v) => {
                out.put_byte(tag::LONG);
                out.put_short(symbols.add_constant_long(v)?);
            }
            AnnotationValue::Double(v) => {
                out.put_byte(tag::DOUBLE);
                out.put_short(symbols.add_constant_double(v)?);
            }
            AnnotationValue::String(v) => {
                out.put_byte(tag::STRING);
                out.put_short(symbols.add_constant_utf8(&v)?);
            }
            AnnotationValue::Class(v) => {
                out.put_byte(tag::CLASS);
                out.put_short(symbols.add_constant_utf8(&v)?);
            }
        }
        Ok(())
    }

    fn visit_enum(&mut self, _name: Option<&str>, descriptor: &str, value: &str) -> Result<()> {
        let mut symbols = self.symbols.borrow_mut();
        let descriptor_index = symbols.add_constant_utf8(descriptor)?;
        let value_index = symbols.add_constant_utf8(value)?;
        drop(symbols);
        let mut out = self.out.borrow_mut();
        out.put_byte(tag::ENUM);
        out.put_short(descriptor_index);
        out.put_short(value_index);
        Ok(())
    }

    fn visit_annotation(&mut self, _name: Option<&str>, descriptor: &str) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.out.borrow_mut().put_byte(tag::ANNOTATION);
        let nested = AnnotationWriter::new_annotation(self.symbols.clone(), self.out.clone(), descriptor)?;
        Ok(Some(Box::new(nested)))
    }

    fn visit_array(&mut self, _name: Option<&str>) -> Result<Option<Box<dyn AnnotationVisitor>>> {
        self.out.borrow_mut().put_byte(tag::ARRAY);
        let nested = AnnotationWriter::new_array(self.symbols.clone(), self.out.clone());
        Ok(Some(Box::new(nested)))
    }
}
