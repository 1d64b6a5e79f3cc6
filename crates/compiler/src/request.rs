//! Request payloads for the compiler service

use crate::{CompilerError, ServiceResult};
use resolver::CompilationUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a compile request
///
/// Single-file mode carries one source string; multi-file mode carries every
/// file of the unit keyed by canonical path plus the entry point and the
/// library prefixes the service must fetch itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompileRequest {
    #[serde(rename_all = "camelCase")]
    Multi {
        sources: BTreeMap<String, String>,
        entry_point: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        libraries: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Single { source: String, file_name: String },
}

impl CompileRequest {
    /// Build the request for a unit; single mode when nothing beyond the entry file is needed
    pub fn from_unit(unit: &CompilationUnit) -> ServiceResult<Self> {
        let entry_source = unit
            .entry_source()
            .ok_or_else(|| CompilerError::EmptyUnit(unit.entry_path.clone()))?;

        if unit.files.len() == 1 && unit.external_libraries.is_empty() {
            let file_name = unit
                .entry_path
                .rsplit('/')
                .next()
                .unwrap_or(&unit.entry_path)
                .to_string();
            return Ok(CompileRequest::Single {
                source: entry_source.to_string(),
                file_name,
            });
        }

        Ok(CompileRequest::Multi {
            sources: unit.files.clone(),
            entry_point: unit.entry_path.clone(),
            libraries: unit.external_libraries.iter().cloned().collect(),
        })
    }

    pub fn is_multi_file(&self) -> bool {
        matches!(self, CompileRequest::Multi { .. })
    }

    /// Path or file name of the file being compiled
    pub fn entry_point(&self) -> &str {
        match self {
            CompileRequest::Multi { entry_point, .. } => entry_point,
            CompileRequest::Single { file_name, .. } => file_name,
        }
    }

    /// Number of source files in the payload
    pub fn source_count(&self) -> usize {
        match self {
            CompileRequest::Multi { sources, .. } => sources.len(),
            CompileRequest::Single { .. } => 1,
        }
    }
}
