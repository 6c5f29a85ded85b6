use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
    }
    Ok(())
}

/// Find the largest char boundary in `s` that is <= `max_bytes`.
/// Safe for slicing: `&s[..find_char_boundary(s, max_bytes)]` never panics.
pub fn find_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Truncate `s` to at most `max_bytes`, appending an ellipsis when cut.
/// Used for log previews and error-body excerpts.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let boundary = find_char_boundary(s, max_bytes);
    format!("{}...", &s[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_char_boundary_ascii() {
        let s = "Hello, world!";
        assert_eq!(find_char_boundary(s, 5), 5);
        assert_eq!(find_char_boundary(s, 100), s.len());
        assert_eq!(find_char_boundary(s, 0), 0);
    }

    #[test]
    fn test_find_char_boundary_multibyte() {
        let s = "Héllo wörld"; // é is 2 bytes, ö is 2 bytes
        assert_eq!(find_char_boundary(s, 2), 1); // mid-'é', snaps back to 1
        assert_eq!(find_char_boundary(s, 3), 3); // after 'é'
    }

    #[test]
    fn test_truncate_utf8_short_input() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_utf8_cuts_on_boundary() {
        let s = "Hi 👋 there";
        // '👋' occupies bytes 3..7, so a 4-byte limit snaps back to 3
        assert_eq!(truncate_utf8(s, 4), "Hi ...");
    }

    #[test]
    fn test_ensure_dir_creates_new() {
        use std::path::PathBuf;
        let temp_dir = PathBuf::from("test_utils_ensure_dir");
        let _ = fs::remove_dir_all(&temp_dir);

        assert!(ensure_dir(&temp_dir).is_ok());
        assert!(temp_dir.exists());

        let _ = fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn test_ensure_dir_existing() {
        use std::path::PathBuf;
        let temp_dir = PathBuf::from("test_utils_ensure_dir_existing");
        let _ = fs::create_dir_all(&temp_dir);

        assert!(ensure_dir(&temp_dir).is_ok());
        assert!(temp_dir.exists());

        let _ = fs::remove_dir_all(&temp_dir);
    }
}
