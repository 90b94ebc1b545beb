//! Output formatting for CLI.

mod json;
mod text;

pub use json::{JsonFormatter, ProviderInfoOutput};
pub use text::TextFormatter;
