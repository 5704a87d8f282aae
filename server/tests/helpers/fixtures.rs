//! Fixture site scaffolding for integration tests.

use std::path::Path;

/// Recursively copy a fixture site. Contents only, no metadata.
pub fn copy_dir_recursive(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).expect("Failed to create dir");
    for entry in std::fs::read_dir(src).expect("Failed to read dir") {
        let entry = entry.expect("Failed to read entry");
        let target = dst.join(entry.file_name());
        if entry.file_type().expect("Failed to stat entry").is_dir() {
            copy_dir_recursive(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).expect("Failed to copy file");
        }
    }
}

