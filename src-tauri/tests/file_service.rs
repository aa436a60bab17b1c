use md_editor_lib::files::{self, FileError};
use std::fs;
use tempfile::tempdir;

#[test]
fn lists_only_top_level_markdown_files() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    fs::write(dir.join("a.md"), "a").unwrap();
    fs::write(dir.join("B.MD"), "b").unwrap();
    fs::write(dir.join("notes.txt"), "x").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("c.md"), "c").unwrap();
    fs::create_dir(dir.join("folder.md")).unwrap();

    let mut listed = files::list_markdown_files(dir).expect("list");
    listed.sort();
    let mut expected = vec![
        dir.join("B.MD").to_string_lossy().into_owned(),
        dir.join("a.md").to_string_lossy().into_owned(),
    ];
    expected.sort();
    assert_eq!(listed, expected);
}

#[test]
fn listing_a_missing_directory_fails() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("gone");
    assert!(matches!(files::list_markdown_files(&missing), Err(FileError::Io { .. })));
}

#[test]
fn create_refuses_existing_names() {
    let temp = tempdir().expect("tempdir");
    let path = files::create_file(temp.path(), "Untitled").expect("create");
    assert_eq!(path, temp.path().join("Untitled.md").to_string_lossy());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");

    fs::write(&path, "keep me").unwrap();
    let again = files::create_file(temp.path(), "Untitled");
    assert!(matches!(again, Err(FileError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
}

#[test]
fn read_creates_missing_file_empty() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("fresh.md");
    assert_eq!(files::read_file(&path).expect("read"), "");
    assert!(path.exists());
}

#[test]
fn write_overwrites_whole_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("doc.md");
    files::write_file(&path, "first version, quite long").expect("write");
    files::write_file(&path, "second").expect("write");
    assert_eq!(files::read_file(&path).expect("read"), "second");
}

#[test]
fn delete_tolerates_missing_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("doc.md");
    fs::write(&path, "x").unwrap();
    files::delete_file(&path).expect("delete");
    assert!(!path.exists());
    files::delete_file(&path).expect("delete again");
}

#[test]
fn rename_appends_extension_and_keeps_content() {
    let temp = tempdir().expect("tempdir");
    let old = temp.path().join("Untitled.md");
    fs::write(&old, "body").unwrap();

    let new_path = files::rename_file(&old, "Plans").expect("rename");
    assert_eq!(new_path, temp.path().join("Plans.md").to_string_lossy());
    assert!(!old.exists());
    assert_eq!(fs::read_to_string(&new_path).unwrap(), "body");
}

#[test]
fn rename_never_overwrites_another_file() {
    let temp = tempdir().expect("tempdir");
    let a = temp.path().join("a.md");
    let b = temp.path().join("b.md");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    assert!(matches!(files::rename_file(&a, "b"), Err(FileError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&a).unwrap(), "a");
    assert_eq!(fs::read_to_string(&b).unwrap(), "b");
}

#[test]
fn rename_rejects_path_like_names() {
    let temp = tempdir().expect("tempdir");
    let a = temp.path().join("a.md");
    fs::write(&a, "a").unwrap();
    assert!(matches!(files::rename_file(&a, "../escape"), Err(FileError::InvalidName { .. })));
    assert!(a.exists());
}

#[test]
fn images_load_as_data_uris() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("pixel.gif");
    fs::write(&path, b"GIF89a").unwrap();
    let uri = files::load_image_data_uri(&path).expect("load");
    assert_eq!(uri, "data:image/gif;base64,R0lGODlh");
}
