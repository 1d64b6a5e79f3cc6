//! Compiler service boundary for Solidity Studio
//!
//! Turns a `CompilationUnit` into a request for the external compiler service,
//! decodes its responses and translates raw compiler errors into explanations.

pub mod client;
pub mod interpreter;
pub mod request;
pub mod response;

pub use client::{ClientConfig, CompilerClient};
pub use interpreter::{
    CompilerErrorKind, ErrorInterpreter, Interpretation, interpret_compiler_error,
};
pub use request::CompileRequest;
pub use response::{CompiledContract, CompilerFailure, CompilerResult};

use thiserror::Error;

/// Errors raised while talking to the compiler service
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Invalid compiler endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed compiler response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compilation unit for '{0}' has no entry source")]
    EmptyUnit(String),
}

/// Result type for compiler service operations
pub type ServiceResult<T> = Result<T, CompilerError>;
