//! Error message formatting with actionable suggestions.

use std::error::Error;

use mvnr_core::error::MvnrError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
#[derive(Debug, Clone)]
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its location, a suggestion and the source chain
    pub fn format_error(&self, error: &MvnrError) -> String {
        let mut output = self.format_simple(&error.to_string());
        output.push('\n');

        if let MvnrError::TomlParse { file, line, column, .. } = error {
            if *line > 0 {
                output.push_str(&self.format_location(file, *line, *column));
                output.push('\n');
            }
        }

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("{}: {}\n", self.colors.dim("help"), suggestion));
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&format!("{}: {}\n", self.colors.dim("caused by"), err));
            source = err.source();
        }

        output
    }

    /// Format an error that is not an `MvnrError`, with its context chain
    pub fn format_any(&self, error: &anyhow::Error) -> String {
        match error.downcast_ref::<MvnrError>() {
            Some(error) => self.format_error(error),
            None => format!("{}\n", self.format_simple(&format!("{error:#}"))),
        }
    }

    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("  {} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
