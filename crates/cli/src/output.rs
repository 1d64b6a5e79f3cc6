use anyhow::{Context, Result};
use compiler::{CompilerResult, Interpretation};
use console::{Color, style};
use resolver::graph::GraphReport;
use resolver::{CompilationUnit, ImportKind};
use serde::Serialize;

use crate::config::OutputFormatSetting;

/// Where one import statement of a file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ImportStatus {
    /// Bound to a project file
    Internal { path: String, ambiguous: bool },
    /// Belongs to a known library
    External { library: String, prefix: String },
    /// Nothing matched
    Missing {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// One row of the `imports` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    pub path: String,
    pub kind: ImportKind,
    pub line: usize,
    pub resolution: ImportStatus,
}

/// Output of the `imports` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportsReport {
    pub file: String,
    pub imports: Vec<ImportRow>,
}

/// Output of the `resolve` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    pub from: String,
    pub import: String,
    pub resolved: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
}

/// Output of the `graph` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphOutput {
    #[serde(flatten)]
    pub report: GraphReport,
    /// Dependencies first; absent when the graph has a cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topological_order: Option<Vec<String>>,
}

/// Formats command results for the terminal or as JSON
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormatSetting,
    colors: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormatSetting, colors: bool) -> Self {
        Self { format, colors }
    }

    pub fn format(&self) -> OutputFormatSetting {
        self.format
    }

    fn render<T: Serialize>(&self, value: &T, console: impl FnOnce(&T) -> String) -> Result<String> {
        match self.format {
            OutputFormatSetting::Json => {
                serde_json::to_string_pretty(value).context("Failed to serialize output")
            }
            OutputFormatSetting::Console => Ok(console(value)),
        }
    }

    fn paint<D: std::fmt::Display>(&self, text: D, color: Color) -> String {
        style(text).fg(color).force_styling(self.colors).to_string()
    }

    fn bold<D: std::fmt::Display>(&self, text: D) -> String {
        style(text).bold().force_styling(self.colors).to_string()
    }

    fn dim<D: std::fmt::Display>(&self, text: D) -> String {
        style(text).dim().force_styling(self.colors).to_string()
    }

    pub fn imports(&self, report: &ImportsReport) -> Result<String> {
        self.render(report, |report| {
            let mut output = vec![self.bold(format!("Imports of {}", report.file))];
            if report.imports.is_empty() {
                output.push("  (no import statements)".to_string());
            }

            for row in &report.imports {
                let status = match &row.resolution {
                    ImportStatus::Internal { path, ambiguous } => {
                        let note = if *ambiguous { " (ambiguous name match)" } else { "" };
                        format!("{} {}{}", self.paint("→", Color::Green), path, self.paint(note, Color::Yellow))
                    }
                    ImportStatus::External { library, prefix } => format!(
                        "{} {} {}",
                        self.paint("⇢", Color::Cyan),
                        library,
                        self.dim(format!("({})", prefix))
                    ),
                    ImportStatus::Missing { reason } => format!(
                        "{} {}",
                        self.paint("✗ missing", Color::Red),
                        reason.as_deref().unwrap_or("")
                    ),
                };
                output.push(format!(
                    "  {} {}{}  {}",
                    self.dim(format!("{:>4}", row.line)),
                    row.path,
                    self.dim(kind_suffix(&row.kind)),
                    status.trim_end()
                ));
            }

            output.join("\n")
        })
    }

    pub fn resolution(&self, report: &ResolveReport) -> Result<String> {
        self.render(report, |report| match &report.library {
            Some(library) => format!(
                "{} {}",
                report.resolved,
                self.dim(format!("(external: {})", library))
            ),
            None => report.resolved.clone(),
        })
    }

    pub fn graph(&self, graph: &GraphOutput) -> Result<String> {
        self.render(graph, |graph| {
            let report = &graph.report;
            let mut output = vec![self.bold(format!(
                "Dependency graph: {} files",
                report.files.len()
            ))];

            for node in &report.files {
                if node.dependencies.is_empty() {
                    output.push(format!("  {}", node.path));
                } else {
                    output.push(format!(
                        "  {} {} {}",
                        node.path,
                        self.dim("→"),
                        node.dependencies.join(", ")
                    ));
                }
            }

            if !report.external.is_empty() {
                output.push(String::new());
                output.push(self.bold("External libraries:"));
                for reference in &report.external {
                    output.push(format!(
                        "  {} {}",
                        self.paint(&reference.import_path, Color::Cyan),
                        self.dim(format!("({})", reference.name))
                    ));
                }
            }

            if !report.missing.is_empty() {
                output.push(String::new());
                output.push(self.paint("Missing imports:", Color::Red));
                for missing in &report.missing {
                    output.push(format!("  {} in {}", missing.raw, missing.source_path));
                }
            }

            if !report.ambiguous.is_empty() {
                output.push(String::new());
                output.push(self.paint("Ambiguous imports:", Color::Yellow));
                for ambiguous in &report.ambiguous {
                    output.push(format!(
                        "  {} in {} bound to {} (candidates: {})",
                        ambiguous.raw,
                        ambiguous.source_path,
                        ambiguous.chosen,
                        ambiguous.candidates.join(", ")
                    ));
                }
            }

            output.push(String::new());
            match &graph.topological_order {
                Some(order) => output.push(format!("Build order: {}", order.join(", "))),
                None => output.push(self.paint(
                    "Warning: the graph contains a dependency cycle",
                    Color::Yellow,
                )),
            }

            output.join("\n")
        })
    }

    pub fn unit(&self, unit: &CompilationUnit) -> Result<String> {
        self.render(unit, |unit| {
            let mut output = vec![self.bold(format!(
                "Compilation unit for {}: {} files",
                unit.entry_path,
                unit.files.len()
            ))];
            for path in unit.source_order() {
                output.push(format!("  {}", path));
            }
            self.push_unit_notes(unit, &mut output);
            output.join("\n")
        })
    }

    fn push_unit_notes(&self, unit: &CompilationUnit, output: &mut Vec<String>) {
        if !unit.external_libraries.is_empty() {
            output.push(format!(
                "Libraries: {}",
                unit.external_libraries
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        for missing in &unit.missing {
            output.push(self.paint(
                format!("Warning: import '{}' in {} not found", missing.raw, missing.source_path),
                Color::Yellow,
            ));
        }
        for cycle in &unit.cycles {
            output.push(self.paint(
                format!("Warning: dependency cycle {}", cycle.join(" → ")),
                Color::Yellow,
            ));
        }
    }

    pub fn compile(&self, result: &CompilerResult) -> Result<String> {
        self.render(result, |result| match result {
            CompilerResult::Success(contract) => {
                let mut output = vec![format!(
                    "{} {}",
                    self.paint("✓ Compiled", Color::Green),
                    self.bold(&contract.contract_name)
                )];
                if let Some(version) = &contract.compiler_version {
                    output.push(format!("  Compiler: {}", version));
                }
                output.push(format!(
                    "  ABI entries: {} ({} functions, {} events)",
                    contract.abi.as_array().map_or(0, Vec::len),
                    contract.abi_entries("function").len(),
                    contract.abi_entries("event").len()
                ));
                output.push(format!(
                    "  Deployed size: {} bytes",
                    contract.deployed_bytecode_size
                ));
                for warning in &contract.warnings {
                    output.push(self.paint(format!("  Warning: {}", warning), Color::Yellow));
                }
                output.join("\n")
            }
            CompilerResult::Failure(failure) => {
                let mut output = vec![self.paint("✗ Compilation failed", Color::Red)];
                output.push(format!("  {}", failure.message));
                if failure.kind.is_some() {
                    output.push(self.dim(format!("  Compiler said: {}", failure.raw_message)));
                }
                output.join("\n")
            }
        })
    }

    pub fn explanation(&self, interpretation: &Interpretation) -> Result<String> {
        self.render(interpretation, |interpretation| match interpretation.kind {
            Some(kind) => format!(
                "{} {}",
                self.paint(format!("[{}]", kind), Color::Yellow),
                interpretation.message
            ),
            None => interpretation.message.clone(),
        })
    }
}

fn kind_suffix(kind: &ImportKind) -> String {
    match kind {
        ImportKind::Simple => String::new(),
        ImportKind::Named(symbols) => {
            let names: Vec<String> = symbols
                .iter()
                .map(|s| match &s.alias {
                    Some(alias) => format!("{} as {}", s.name, alias),
                    None => s.name.clone(),
                })
                .collect();
            format!(" {{{}}}", names.join(", "))
        }
        ImportKind::Aliased(alias) => format!(" as {}", alias),
        ImportKind::Wildcard(alias) => format!(" * as {}", alias),
    }
}
