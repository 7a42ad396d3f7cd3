use classforge::constants::opcode;
use classforge::{ClassReader, ClassVisitor, ClassWriter, ClassWriterFlags, ComputeMode, FieldVisitor, MethodVisitor, Result};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct MethodRecorder {
    max_stack: u16,
    max_locals: u16,
    opcodes: Vec<u8>,
    saw_stack_map_table: bool,
}

impl MethodVisitor for MethodRecorder {
    fn visit_insn(&mut self, opcode: u8) -> Result<()> {
        self.opcodes.push(opcode);
        Ok(())
    }

    fn visit_var_insn(&mut self, opcode: u8, var_index: u16) -> Result<()> {
        assert_eq!(var_index, 0);
        self.opcodes.push(opcode);
        Ok(())
    }

    fn visit_max(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        self.max_stack = max_stack;
        self.max_locals = max_locals;
        Ok(())
    }

    fn visit_attribute(&mut self, name: &str, _data: &[u8]) -> Result<()> {
        if name == "StackMapTable" {
            self.saw_stack_map_table = true;
        }
        Ok(())
    }
}

struct MethodHandle(Rc<RefCell<MethodRecorder>>);

impl MethodVisitor for MethodHandle {
    fn visit_insn(&mut self, opcode: u8) -> Result<()> {
        self.0.borrow_mut().visit_insn(opcode)
    }

    fn visit_var_insn(&mut self, opcode: u8, var_index: u16) -> Result<()> {
        self.0.borrow_mut().visit_var_insn(opcode, var_index)
    }

    fn visit_max(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        self.0.borrow_mut().visit_max(max_stack, max_locals)
    }

    fn visit_attribute(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.0.borrow_mut().visit_attribute(name, data)
    }
}

struct SingleMethodClassVisitor {
    expected_name: &'static str,
    method: Rc<RefCell<MethodRecorder>>,
}

impl ClassVisitor for SingleMethodClassVisitor {
    fn visit_method(
        &mut self,
        _access_flags: u16,
        name: &str,
        _descriptor: &str,
        _signature: Option<&str>,
        _exceptions: &[String],
    ) -> Result<Option<Box<dyn MethodVisitor>>> {
        assert_eq!(name, self.expected_name);
        Ok(Some(Box::new(MethodHandle(self.method.clone()))))
    }
}

// S1: a minimal static int identity method round-trips to the exact header,
// pool size, and code bytes javac/ASM would produce, with no computed frames.
#[test]
fn static_identity_method_emits_expected_header_and_code() {
    let mut writer = ClassWriter::new(52, 0, ComputeMode::MaxStackAndLocal, ClassWriterFlags::empty());
    writer
        .visit(52, 0, 0x0021, "pkg/Demo", None, Some("java/lang/Object"), &[])
        .unwrap();
    let mut method = writer.visit_method(0x0009, "id", "(I)I", None, &[]).unwrap().unwrap();
    method.visit_code().unwrap();
    method.visit_var_insn(opcode::ILOAD, 0).unwrap();
    method.visit_insn(opcode::IRETURN).unwrap();
    method.visit_end().unwrap();
    writer.visit_end().unwrap();

    let bytes = writer.to_byte_array().unwrap();
    assert_eq!(&bytes[0..8], &[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34]);
    let constant_pool_count = u16::from_be_bytes([bytes[8], bytes[9]]);
    assert_eq!(
        constant_pool_count, 8,
        "Utf8/Class(this), Utf8/Class(super), name, descriptor, \"Code\" = 7 entries plus the reserved slot"
    );

    let reader = ClassReader::new(&bytes).unwrap();
    let recorder = Rc::new(RefCell::new(MethodRecorder::default()));
    let mut visitor = SingleMethodClassVisitor { expected_name: "id", method: recorder.clone() };
    reader.accept(&mut visitor).unwrap();

    let recorded = recorder.borrow();
    assert_eq!(recorded.opcodes, vec![opcode::ILOAD, opcode::IRETURN]);
    assert_eq!(recorded.max_stack, 1);
    assert_eq!(recorded.max_locals, 1);
    assert!(!recorded.saw_stack_map_table);
}

// S5: a custom attribute unknown to the reader survives a decode/re-encode
// pass byte for byte, because the reader forwards it as opaque bytes and the
// writer re-emits whatever it's handed.
#[test]
fn unknown_field_attribute_survives_a_read_rewrite_round_trip() {
    let mut writer = ClassWriter::new(52, 0, ComputeMode::Nothing, ClassWriterFlags::empty());
    writer
        .visit(52, 0, 0x0021, "pkg/Carrier", None, Some("java/lang/Object"), &[])
        .unwrap();
    let mut field = writer.visit_field(0x0001, "x", "I", None, None).unwrap().unwrap();
    field.visit_attribute("Foo", &[0x01, 0x02, 0x03]).unwrap();
    field.visit_end().unwrap();
    writer.visit_end().unwrap();
    let original = writer.to_byte_array().unwrap();

    let reader = ClassReader::new(&original).unwrap();
    let mut rewriter = ClassWriter::new(52, 0, ComputeMode::Nothing, ClassWriterFlags::empty());
    reader.accept(&mut rewriter).unwrap();
    let rewritten = rewriter.to_byte_array().unwrap();

    assert_eq!(original, rewritten);
    let foo_payload = [0x01u8, 0x02, 0x03];
    assert!(
        original.windows(foo_payload.len()).any(|w| w == foo_payload),
        "the attribute's raw payload should appear unmodified in the output"
    );
}

// S6: an oversized method body is rejected with enough context to find it,
// rather than silently truncating or panicking.
#[test]
fn oversized_method_body_is_rejected_with_identifying_context() {
    let mut writer = ClassWriter::new(52, 0, ComputeMode::Nothing, ClassWriterFlags::empty());
    writer
        .visit(52, 0, 0x0021, "pkg/TooBig", None, Some("java/lang/Object"), &[])
        .unwrap();
    let mut method = writer.visit_method(0x0009, "huge", "()V", None, &[]).unwrap().unwrap();
    method.visit_code().unwrap();
    method.visit_max(0, 0).unwrap();
    for _ in 0..70_000 {
        method.visit_insn(opcode::NOP).unwrap();
    }
    method.visit_end().unwrap();
    writer.visit_end().unwrap();

    let err = writer.to_byte_array().unwrap_err();
    match err {
        classforge::Error::MethodTooLarge { class, method, descriptor, length } => {
            assert_eq!(class, "pkg/TooBig");
            assert_eq!(method, "huge");
            assert_eq!(descriptor, "()V");
            assert_eq!(length, 70_000);
        }
        other => panic!("expected MethodTooLarge, got {other:?}"),
    }
}
