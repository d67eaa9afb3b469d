//! Terminal output formatting.
//!
//! Results go to stdout; diagnostics go to stderr so that `mvnr resolve`
//! output can be piped.

pub mod colors;
pub mod errors;

use colors::ColorSupport;

/// Output handler for consistent terminal formatting
#[derive(Debug, Clone)]
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &ColorSupport {
        &self.colors
    }

    /// Print a result line as is
    pub fn plain(&self, message: &str) {
        println!("{message}");
    }

    pub fn info(&self, message: &str) {
        eprintln!("{}", self.colors.dim(message));
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", self.colors.green("✓"), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("warning:"), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("error:"), message);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
