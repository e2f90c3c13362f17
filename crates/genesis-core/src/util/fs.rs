//! Filesystem utilities.

use genesis_types::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Expand path with tilde.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }

    path.to_path_buf()
}

/// Read entire file as string (slurp).
pub fn slurp(path: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(path).map_err(Into::into)
}

/// Capture content to an ephemeral scratch file.
///
/// The file is removed when the returned handle drops; used to hand
/// multiline secret values to the store CLI without exposing them on a
/// command line.
pub fn scratch_file(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_file_round_trip() {
        let file = scratch_file("line one\nline two\n").unwrap();
        let read_back = slurp(file.path()).unwrap();
        assert_eq!(read_back, "line one\nline two\n");
    }
}
