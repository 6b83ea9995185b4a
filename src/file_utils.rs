use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

// @module: File utilities and plain-text segmenting for import

/// One or more blank lines, possibly holding whitespace
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\r?\n[ \t]*(\r?\n[ \t]*)+").expect("Invalid paragraph break regex")
});

/// Runs of whitespace inside a paragraph
static INNER_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Read a plain-text file and split it into segments, one per paragraph
    pub fn read_segments<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow::anyhow!("Input file does not exist: {:?}", path));
        }
        let content = Self::read_to_string(path)?;
        let segments = split_segments(&content);
        if segments.is_empty() {
            return Err(anyhow::anyhow!("No text found in {:?}", path));
        }
        Ok(segments)
    }
}

/// Split text into paragraphs, collapsing whitespace inside each one
pub fn split_segments(text: &str) -> Vec<String> {
    let text = text.trim_start_matches('\u{feff}');
    PARAGRAPH_BREAK
        .split(text)
        .map(|paragraph| INNER_WHITESPACE.replace_all(paragraph.trim(), " ").into_owned())
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}
