/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use linguabatch::file_utils::{split_segments, FileManager};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test directory creation, including nested paths
#[test]
fn test_ensure_dir_withNestedPath_shouldCreateAllLevels() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b").join("c");

    FileManager::ensure_dir(&nested)?;
    assert!(nested.is_dir());

    // Existing directories are fine
    FileManager::ensure_dir(&nested)?;
    Ok(())
}

#[test]
fn test_write_then_read_shouldReturnSameContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("notes.txt");

    FileManager::write_to_file(&path, "Bonjour\n")?;
    assert_eq!(FileManager::read_to_string(&path)?, "Bonjour\n");
    Ok(())
}

#[test]
fn test_read_segments_shouldSplitParagraphs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "guide.txt",
        "Welcome to the guide.\n\nInstall the tool\nwith the installer.\n\n\n   \nDone.\n",
    )?;

    let segments = FileManager::read_segments(&path)?;
    assert_eq!(
        segments,
        vec![
            "Welcome to the guide.".to_string(),
            "Install the tool with the installer.".to_string(),
            "Done.".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_read_segments_withBlankFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "blank.txt", "\n \n\t\n")?;

    assert!(FileManager::read_segments(&path).is_err());
    assert!(FileManager::read_segments(temp_dir.path().join("missing.txt")).is_err());
    Ok(())
}

#[test]
fn test_split_segments_withWindowsLineEndings_shouldSplit() {
    let segments = split_segments("First line\r\n\r\nSecond  line\r\nstill second");
    assert_eq!(segments, vec!["First line".to_string(), "Second line still second".to_string()]);
}
