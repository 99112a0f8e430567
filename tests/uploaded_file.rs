//! Move lifecycle for uploaded files, against a real filesystem.

use std::fs;
use std::io::Read;

use genkan::{Error, UploadStream, UploadedFile};
use tempfile::tempdir;

#[test]
fn move_to_writes_the_contents_and_consumes_the_stream() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("stored.txt");

    let file = UploadedFile::new(UploadStream::from_bytes("file contents"));
    file.move_to(&target).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "file contents");
    assert!(matches!(file.take_stream(), Err(Error::Consumed)));
    let again = dir.path().join("again.txt");
    assert!(matches!(file.move_to(again), Err(Error::Consumed)));
}

#[test]
fn move_to_copies_disk_backed_streams_larger_than_one_chunk() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("incoming.bin");
    fs::write(&source, vec![7u8; 10_000]).unwrap();

    let target = dir.path().join("final.bin");
    let file = UploadedFile::open(&source).unwrap();
    file.move_to(&target).unwrap();

    assert_eq!(fs::read(&target).unwrap(), vec![7u8; 10_000]);
}

#[test]
fn move_to_overwrites_an_existing_target() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("slot.txt");
    fs::write(&target, "old contents, much longer than the new ones").unwrap();

    let file = UploadedFile::new(UploadStream::from_bytes("new"));
    file.move_to(&target).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
}

#[test]
fn move_to_a_missing_directory_leaves_the_upload_usable() {
    let dir = tempdir().unwrap();
    let bad_target = dir.path().join("no_such_dir").join("file.txt");

    let file = UploadedFile::new(UploadStream::from_bytes("still here"));
    match file.move_to(&bad_target) {
        Err(Error::TargetDirectory(reported)) => {
            assert_eq!(reported, dir.path().join("no_such_dir"));
        }
        other => panic!("expected a target-directory error, got {other:?}"),
    }

    // The failed move consumed nothing.
    let mut contents = String::new();
    file.take_stream().unwrap().read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "still here");
}

#[test]
fn move_to_the_filesystem_root_is_rejected_up_front() {
    let file = UploadedFile::new(UploadStream::from_bytes("x"));
    assert!(matches!(file.move_to("/"), Err(Error::TargetDirectory(_))));
    assert!(file.take_stream().is_ok());
}

#[test]
fn moving_through_one_clone_consumes_for_all() {
    let dir = tempdir().unwrap();
    let file = UploadedFile::new(UploadStream::from_bytes("shared"));
    let clone = file.clone();

    clone.move_to(dir.path().join("by_clone.txt")).unwrap();
    assert!(matches!(file.take_stream(), Err(Error::Consumed)));
}
