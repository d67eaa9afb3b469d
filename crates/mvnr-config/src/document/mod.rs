//! TOML document parsing shared by the manifest and settings files

use std::ops::Range;

use serde::de::DeserializeOwned;

use mvnr_core::error::MvnrError;

use crate::ConfigResult;

/// Parse `content` into `T`, reporting syntax and type errors with the
/// line and column they occur at.
///
/// The document is first checked with `toml_edit`, which locates syntax
/// errors precisely, then deserialized with `toml`.
pub fn parse_document<T: DeserializeOwned>(file: &str, content: &str) -> ConfigResult<T> {
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| located(file, content, e.message(), e.span()))?;

    toml::from_str(content).map_err(|e| located(file, content, e.message(), e.span()))
}

fn located(file: &str, content: &str, message: &str, span: Option<Range<usize>>) -> MvnrError {
    let (line, column) = span.map_or((0, 0), |span| line_column(content, span.start));
    MvnrError::TomlParse {
        file: file.to_string(),
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

/// Shorthand for a validation failure on `field`
pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> MvnrError {
    MvnrError::ConfigValidation {
        field: field.into(),
        reason: reason.into(),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn line_column_counts_newlines(lines in prop::collection::vec("[a-z =\"]{0,12}", 1..8), pick in 0usize..8) {
            let content = lines.join("\n");
            let line = pick % lines.len();
            let offset: usize = lines[..line].iter().map(|l| l.len() + 1).sum();
            prop_assert_eq!(line_column(&content, offset), (line + 1, 1));
        }
    }
}
