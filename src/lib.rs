//! A JVM class-file reader/writer pair built around ASM-style visitor
//! callbacks (JVMS §4): a `ClassReader` replays an existing `.class` file as
//! a sequence of `visit_*` calls, and a `ClassWriter` implements the same
//! visitor trait to re-encode whatever it's fed. Chaining a transform
//! between the two — or wiring a `ClassWriter` directly to a `ClassReader`'s
//! output, unmodified — is the whole point of sharing one callback protocol.

pub mod attribute;
pub mod bytevector;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod label;
pub mod modified_utf8;
pub mod reader;
pub mod symbol;
pub mod version;
pub mod visitor;
pub mod writer;

pub use error::{Error, Result};
pub use reader::ClassReader;
pub use symbol::SymbolTable;
pub use visitor::{
    AnnotationValue, AnnotationVisitor, ClassVisitor, ConstantValue, FieldVisitor, LdcValue,
    MethodVisitor, RecordComponentVisitor,
};
pub use writer::method_writer::ComputeMode;
pub use writer::{ClassWriter, ClassWriterFlags};
