use std::fs;
use harvester_engine::{ensure_output_dir, uniquify, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn second_write_gets_a_numbered_name() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_unique("Board.zip", b"one").unwrap();
    let second = writer.write_unique("Board.zip", b"two").unwrap();
    let third = writer.write_unique("Board.zip", b"three").unwrap();

    assert_eq!(first.file_name().unwrap(), "Board.zip");
    assert_eq!(second.file_name().unwrap(), "Board (1).zip");
    assert_eq!(third.file_name().unwrap(), "Board (2).zip");
    assert_eq!(fs::read(&first).unwrap(), b"one");
    assert_eq!(fs::read(&second).unwrap(), b"two");
}

#[test]
fn uniquify_handles_names_without_extension() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("clip"), "x").unwrap();

    let path = uniquify(temp.path(), "clip").unwrap();
    assert_eq!(path.file_name().unwrap(), "clip (1)");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write_unique("Board.zip", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("Board.zip").exists());
}
