//! Code generator backed by an external coding CLI.

pub mod cli_code_generator;

pub use cli_code_generator::{CliCodeGenerator, CliCodeGeneratorConfig};
