//! Compiler service responses

use crate::interpreter::{CompilerErrorKind, ErrorInterpreter};
use crate::{CompilerError, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful compilation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledContract {
    pub contract_name: String,
    pub abi: Value,
    pub bytecode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_estimates: Option<Value>,
    /// Size of the deployed bytecode in bytes
    pub deployed_bytecode_size: usize,
}

impl CompiledContract {
    /// ABI entries of the given type (`function`, `event`, ...)
    pub fn abi_entries(&self, entry_type: &str) -> Vec<&Value> {
        self.abi
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.get("type").and_then(Value::as_str) == Some(entry_type))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Failed compilation or service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerFailure {
    /// Interpreted explanation
    pub message: String,
    /// Message as reported by the service
    pub raw_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CompilerErrorKind>,
}

impl CompilerFailure {
    /// Interpret a raw failure message
    pub fn from_raw(raw: impl Into<String>, interpreter: &ErrorInterpreter) -> Self {
        let raw_message = raw.into();
        let interpretation = interpreter.interpret(&raw_message);
        Self {
            message: interpretation.message,
            raw_message,
            kind: interpretation.kind,
        }
    }
}

/// Outcome of one compile request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompilerResult {
    Success(CompiledContract),
    Failure(CompilerFailure),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    success: Option<bool>,
    abi: Option<Value>,
    bytecode: Option<String>,
    contract_name: Option<String>,
    compiler_version: Option<String>,
    #[serde(default)]
    warnings: Vec<Value>,
    gas_estimates: Option<Value>,
    deployed_bytecode_size: Option<usize>,
    error: Option<Value>,
    message: Option<String>,
}

const NO_MESSAGE: &str = "Compilation failed without an error message";

impl CompilerResult {
    /// Decode a response body
    pub fn from_json(body: &str, interpreter: &ErrorInterpreter) -> ServiceResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value, interpreter)
    }

    /// Decode an already parsed response body
    pub fn from_value(value: Value, interpreter: &ErrorInterpreter) -> ServiceResult<Self> {
        let raw: RawResponse = serde_json::from_value(value)?;

        let failed = raw.success == Some(false) || (raw.error.is_some() && raw.bytecode.is_none());
        if failed {
            let message = raw
                .error
                .as_ref()
                .map(error_text)
                .or(raw.message)
                .unwrap_or_else(|| NO_MESSAGE.to_string());
            return Ok(Self::failure(message, interpreter));
        }

        let bytecode = raw
            .bytecode
            .ok_or_else(|| CompilerError::InvalidResponse("missing bytecode".to_string()))?;
        let contract_name = raw
            .contract_name
            .ok_or_else(|| CompilerError::InvalidResponse("missing contractName".to_string()))?;
        let deployed_bytecode_size = raw
            .deployed_bytecode_size
            .unwrap_or_else(|| hex_byte_len(&bytecode));

        Ok(CompilerResult::Success(CompiledContract {
            contract_name,
            abi: raw.abi.unwrap_or_else(|| Value::Array(Vec::new())),
            bytecode,
            compiler_version: raw.compiler_version,
            warnings: raw.warnings.iter().map(error_text).collect(),
            gas_estimates: raw.gas_estimates,
            deployed_bytecode_size,
        }))
    }

    /// Failure built from a raw message
    pub fn failure(raw: impl Into<String>, interpreter: &ErrorInterpreter) -> Self {
        CompilerResult::Failure(CompilerFailure::from_raw(raw, interpreter))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompilerResult::Success(_))
    }

    pub fn contract(&self) -> Option<&CompiledContract> {
        match self {
            CompilerResult::Success(contract) => Some(contract),
            CompilerResult::Failure(_) => None,
        }
    }
}

/// Services report errors and warnings as strings or as solc-style objects
fn error_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("formattedMessage")
            .or_else(|| map.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn hex_byte_len(bytecode: &str) -> usize {
    let hex = bytecode.strip_prefix("0x").unwrap_or(bytecode);
    hex.len() / 2
}
