//! Decodes a `.class` file and re-encodes it unchanged, to exercise the
//! reader/writer pair end to end. Usage: `roundtrip <path/to/Class.class>
//! [output/path.class]`.

use classforge::{ClassReader, ClassWriter, ClassWriterFlags, ComputeMode};
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(input_path) = args.next() else {
        eprintln!("usage: roundtrip <path/to/Class.class> [output/path.class]");
        return ExitCode::FAILURE;
    };
    let output_path = args.next();

    let bytes = match fs::read(&input_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("failed to read {input_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match roundtrip(&bytes) {
        Ok(rewritten) => {
            log::info!("{input_path}: {} bytes in, {} bytes out", bytes.len(), rewritten.len());
            if let Some(output_path) = output_path {
                if let Err(e) = fs::write(&output_path, &rewritten) {
                    eprintln!("failed to write {output_path}: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{input_path}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn roundtrip(bytes: &[u8]) -> classforge::Result<Vec<u8>> {
    let reader = ClassReader::new(bytes)?;
    let mut writer = ClassWriter::new(
        reader.major_version(),
        0,
        ComputeMode::AllFrames,
        ClassWriterFlags::empty(),
    );
    reader.accept(&mut writer)?;
    writer.to_byte_array()
}
