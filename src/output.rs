//! User-facing output utilities for clean, colored terminal messages
//!
//! Messages shown to the user go through here rather than through the
//! logger, so they carry no timestamps, levels or module paths.

use owo_colors::OwoColorize;

/// Display a warning message to the user in yellow with padding
///
/// # Example
/// ```ignore
/// output::warn("No entry point found for: left-pad");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("Error: Project root does not exist: ./missing");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Display an informational message to the user in default color with padding
pub fn info(message: &str) {
    eprintln!("\n{}\n", message);
}

/// Display a success message in green
pub fn success(message: &str) {
    eprintln!("{}", message.green());
}
