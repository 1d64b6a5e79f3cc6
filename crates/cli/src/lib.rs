pub mod app;
pub mod config;
pub mod output;

pub use app::{CliApp, ExitCode, Invocation};
pub use config::StudioConfig;
pub use output::OutputFormatter;
