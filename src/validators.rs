//! Directory diagnostics for the configured prompt locations.

use std::path::Path;

/// Check if metadata indicates a valid directory (pure function).
/// Returns an error message if validation fails, None if valid.
fn check_directory_metadata(is_dir: bool) -> Option<String> {
    if !is_dir {
        Some("Path is not a directory".to_string())
    } else {
        None
    }
}

/// Convert an I/O error to an appropriate error message for directory validation.
fn directory_error_message(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => "Directory not found".to_string(),
        std::io::ErrorKind::PermissionDenied => "Cannot access directory".to_string(),
        _ => "Invalid path".to_string(),
    }
}

/// Validate that a path points to an existing directory.
/// Returns an error message if validation fails, None if valid.
pub fn validate_directory_exists(path: &Path) -> Option<String> {
    if path.as_os_str().is_empty() {
        return Some("Path cannot be empty".to_string());
    }

    match std::fs::metadata(path) {
        Ok(metadata) => check_directory_metadata(metadata.is_dir()),
        Err(e) => Some(directory_error_message(&e)),
    }
}

/// Validate that a prompt directory can be listed.
/// A directory that exists but can't be opened is reported separately from a missing one.
pub fn validate_prompt_dir(path: &Path) -> Option<String> {
    if let Some(message) = validate_directory_exists(path) {
        return Some(message);
    }
    match std::fs::read_dir(path) {
        Ok(_) => None,
        Err(e) => Some(directory_error_message(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_directory_metadata_valid_directory() {
        assert_eq!(check_directory_metadata(true), None);
    }

    #[test]
    fn test_check_directory_metadata_not_a_directory() {
        assert_eq!(
            check_directory_metadata(false),
            Some("Path is not a directory".to_string())
        );
    }

    #[test]
    fn test_directory_error_message_not_found() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        assert_eq!(directory_error_message(&error), "Directory not found");
    }

    #[test]
    fn test_directory_error_message_permission_denied() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(directory_error_message(&error), "Cannot access directory");
    }

    #[test]
    fn test_directory_error_message_other_error() {
        let error = std::io::Error::other("other");
        assert_eq!(directory_error_message(&error), "Invalid path");
    }

    #[test]
    fn test_validate_directory_exists() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(validate_directory_exists(tmp.path()), None);
        assert_eq!(
            validate_directory_exists(&tmp.path().join("missing")),
            Some("Directory not found".to_string())
        );
        assert_eq!(
            validate_directory_exists(Path::new("")),
            Some("Path cannot be empty".to_string())
        );
    }

    #[test]
    fn test_validate_prompt_dir_rejects_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("prompts");
        std::fs::write(&file, "").unwrap();
        assert_eq!(
            validate_prompt_dir(&file),
            Some("Path is not a directory".to_string())
        );
        assert_eq!(validate_prompt_dir(tmp.path()), None);
    }
}
