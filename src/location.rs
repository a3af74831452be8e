//! Source locations attached to assertion failures and skips.

use std::fmt;

/// A file/line pair identifying where an assertion or skip was recorded.
///
/// Cheap to copy around; callers typically construct one from `file!()`
/// and `line!()` at the call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Captures the call site of an assertion or expectation call.
///
/// Expands to a [`SourceLocation`] using the caller's `file!()`/`line!()`.
#[macro_export]
macro_rules! here {
    () => {
        $crate::location::SourceLocation::new(file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format_is_file_colon_line() {
        let loc = SourceLocation::new("foo.rs", 42);
        assert_eq!(loc.to_string(), "foo.rs:42");
    }

    #[test]
    fn here_macro_captures_current_file_and_line() {
        let loc = here!();
        assert!(loc.file.ends_with("location.rs"));
    }
}
