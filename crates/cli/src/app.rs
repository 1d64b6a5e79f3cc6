use anyhow::{Context, Result, anyhow};
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{OutputFormatSetting, StudioConfig};
use crate::output::{
    GraphOutput, ImportRow, ImportStatus, ImportsReport, OutputFormatter, ResolveReport,
};
use compiler::{CompileRequest, CompilerClient, CompilerResult, ErrorInterpreter};
use project::{FileId, Project};
use resolver::{ImportTarget, ResolutionEngine, RootPolicy};

/// Standard exit codes for scripting and CI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,         // Command completed
    CompileFailure = 1,  // The compiler rejected the unit or could not be reached
    ResolutionError = 2, // Project could not be loaded or a file could not be resolved
    ConfigError = 3,     // Invalid configuration or command line
}

impl ExitCode {
    /// Convert to process exit code
    pub fn as_code(&self) -> i32 {
        *self as i32
    }

    /// Exit the process with this code
    pub fn exit(&self) -> ! {
        std::process::exit(self.as_code())
    }
}

/// A parsed command line, or the clap error to report
#[derive(Debug)]
pub struct Invocation {
    parsed: Result<ArgMatches, clap::Error>,
}

impl Invocation {
    /// Whether `--verbose` was given; false when parsing failed
    pub fn verbose(&self) -> bool {
        self.parsed
            .as_ref()
            .is_ok_and(|matches| matches.get_flag("verbose"))
    }
}

pub struct CliApp {
    config: StudioConfig,
    engine: ResolutionEngine,
    formatter: OutputFormatter,
}

impl CliApp {
    pub fn new() -> Result<Self> {
        Self::new_with_config(None)
    }

    pub fn new_with_config(config_file: Option<&Path>) -> Result<Self> {
        let config = StudioConfig::load_from_defaults_and_file(config_file)?;
        Self::from_config(config)
    }

    pub fn from_config(config: StudioConfig) -> Result<Self> {
        config.validate()?;

        let engine = ResolutionEngine::new(config.to_registry(), config.resolution.root_policy);
        let formatter = OutputFormatter::new(config.output.format, config.output.colors);

        Ok(Self {
            config,
            engine,
            formatter,
        })
    }

    pub fn command() -> Command {
        let entry = |help: &'static str| {
            Arg::new("file")
                .help(help)
                .required(true)
                .value_name("FILE")
        };

        Command::new("soliditystudio")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Resolve, inspect and compile multi-file Solidity projects")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("project")
                    .short('p')
                    .long("project")
                    .help("Project directory or JSON snapshot")
                    .value_name("PATH")
                    .default_value(".")
                    .global(true),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .help("Configuration file path (.soliditystudio.yml)")
                    .value_name("FILE")
                    .global(true),
            )
            .arg(
                Arg::new("format")
                    .short('f')
                    .long("format")
                    .help("Output format (defaults to the configured one)")
                    .value_parser(["console", "json"])
                    .global(true),
            )
            .arg(
                Arg::new("strict")
                    .long("strict")
                    .help("Fail imports that climb above the project root")
                    .action(ArgAction::SetTrue)
                    .global(true),
            )
            .arg(
                Arg::new("no-color")
                    .long("no-color")
                    .help("Disable colored console output")
                    .action(ArgAction::SetTrue)
                    .global(true),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Enable debug logging")
                    .action(ArgAction::SetTrue)
                    .global(true),
            )
            .subcommand(
                Command::new("imports")
                    .about("List the imports of a file and where each one resolves")
                    .arg(entry("Canonical path of the file inside the project")),
            )
            .subcommand(
                Command::new("resolve")
                    .about("Resolve an import path as written in a given file")
                    .arg(
                        Arg::new("from")
                            .help("Canonical path of the importing file")
                            .required(true)
                            .value_name("FROM"),
                    )
                    .arg(
                        Arg::new("import")
                            .help("Import path as written")
                            .required(true)
                            .value_name("IMPORT"),
                    ),
            )
            .subcommand(Command::new("graph").about("Show the project dependency graph"))
            .subcommand(
                Command::new("unit")
                    .about("Show the compilation unit of an entry file")
                    .arg(entry("Canonical path of the entry file"))
                    .arg(
                        Arg::new("request")
                            .long("request")
                            .help("Print the compiler service request instead")
                            .action(ArgAction::SetTrue),
                    ),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile an entry file through the compiler service")
                    .arg(entry("Canonical path of the entry file")),
            )
            .subcommand(
                Command::new("explain")
                    .about("Explain a raw compiler or deployment error message")
                    .arg(
                        Arg::new("message")
                            .help("Error message")
                            .required(true)
                            .num_args(1..)
                            .value_name("MESSAGE"),
                    ),
            )
            .subcommand(
                Command::new("init-config")
                    .about("Create a default configuration file in the current directory")
                    .arg(
                        Arg::new("force")
                            .long("force")
                            .help("Overwrite an existing configuration file")
                            .action(ArgAction::SetTrue),
                    ),
            )
    }

    /// Parse the command line once
    pub fn parse(args: Vec<String>) -> Invocation {
        Invocation {
            parsed: Self::command().try_get_matches_from(args),
        }
    }

    pub fn run() -> Result<()> {
        Self::run_invocation(Self::parse(std::env::args().collect()))
    }

    pub fn run_invocation(invocation: Invocation) -> Result<()> {
        let code = {
            let mut stdout = std::io::stdout().lock();
            let code = Self::execute_invocation(invocation, &mut stdout)?;
            stdout.flush()?;
            code
        };

        if code != ExitCode::Success {
            code.exit();
        }

        Ok(())
    }

    /// Parse arguments, run one command and report how it went
    pub fn execute<W: Write>(args: Vec<String>, out: &mut W) -> Result<ExitCode> {
        Self::execute_invocation(Self::parse(args), out)
    }

    pub fn execute_invocation<W: Write>(invocation: Invocation, out: &mut W) -> Result<ExitCode> {
        let matches = match invocation.parsed {
            Ok(matches) => matches,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                write!(out, "{}", e.render())?;
                return Ok(ExitCode::Success);
            }
            Err(e) if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                write!(out, "{}", e.render())?;
                return Ok(ExitCode::ConfigError);
            }
            Err(e) => {
                eprint!("{}", e.render());
                return Ok(ExitCode::ConfigError);
            }
        };

        if let Some(("init-config", sub)) = matches.subcommand() {
            return Self::handle_init_config(sub.get_flag("force"), out);
        }

        let config_file = matches.get_one::<String>("config").map(PathBuf::from);
        let app = match Self::configure(config_file.as_deref(), &matches) {
            Ok(app) => app,
            Err(e) => {
                eprintln!("Configuration error: {:#}", e);
                return Ok(ExitCode::ConfigError);
            }
        };

        app.dispatch(&matches, out)
    }

    /// Load the configuration and apply command-line overrides
    fn configure(config_file: Option<&Path>, matches: &ArgMatches) -> Result<Self> {
        let mut config = StudioConfig::load_from_defaults_and_file(config_file)?;

        if matches.get_flag("strict") {
            config.resolution.root_policy = RootPolicy::Strict;
        }
        if let Some(format) = matches.get_one::<String>("format") {
            config.output.format = format.parse::<OutputFormatSetting>()?;
        }
        if matches.get_flag("no-color") {
            config.output.colors = false;
        }

        Self::from_config(config)
    }

    fn dispatch<W: Write>(&self, matches: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let result = match matches.subcommand() {
            Some(("explain", sub)) => self.explain(sub, out),
            Some(("resolve", sub)) => self.resolve(sub, out),
            Some((name, sub)) => {
                let project = match self.load_project(matches) {
                    Ok(project) => project,
                    Err(e) => {
                        eprintln!("Error: {:#}", e);
                        return Ok(ExitCode::ResolutionError);
                    }
                };
                match name {
                    "imports" => self.imports(&project, sub, out),
                    "graph" => self.graph(&project, out),
                    "unit" => self.unit(&project, sub, out),
                    "compile" => self.compile(&project, sub, out),
                    other => Err(anyhow!("Unknown command: {}", other)),
                }
            }
            None => Err(anyhow!("No command given")),
        };

        result.or_else(|e| {
            eprintln!("Error: {:#}", e);
            Ok(ExitCode::ResolutionError)
        })
    }

    fn load_project(&self, matches: &ArgMatches) -> Result<Project> {
        let path = matches
            .get_one::<String>("project")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let project = if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            Project::from_snapshot(&path)
        } else {
            Project::load(&path)
        };

        project.with_context(|| format!("Failed to load project from {}", path.display()))
    }

    fn find_file(project: &Project, path: &str) -> Result<FileId> {
        let normalized = path.trim_start_matches("./");
        project
            .tree()
            .find_by_path(normalized)
            .ok_or_else(|| anyhow!("File '{}' is not part of the project", path))
    }

    fn entry_arg(sub: &ArgMatches) -> Result<&str> {
        sub.get_one::<String>("file")
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Missing file argument"))
    }

    fn imports<W: Write>(&self, project: &Project, sub: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let tree = project.tree();
        let id = Self::find_file(project, Self::entry_arg(sub)?)?;
        let file = tree.file(id)?;
        let graph = self.engine.build_dependency_graph(tree)?;

        // Same extractor as the graph, so records and edges line up one to one
        let records = self.engine.parse_imports(file);
        let imports = records
            .into_iter()
            .zip(graph.imports_of(id))
            .map(|(import, edge)| {
                let resolution = match &edge.target {
                    ImportTarget::File(target) => ImportStatus::Internal {
                        path: graph.path(*target).unwrap_or_default().to_string(),
                        ambiguous: graph
                            .ambiguous()
                            .iter()
                            .any(|a| a.source == id && a.raw == edge.raw),
                    },
                    ImportTarget::External(prefix) => ImportStatus::External {
                        library: self
                            .engine
                            .classify(&edge.raw)
                            .map(|info| info.name.clone())
                            .unwrap_or_else(|| prefix.clone()),
                        prefix: prefix.clone(),
                    },
                    ImportTarget::Unresolved => ImportStatus::Missing {
                        reason: graph
                            .missing()
                            .iter()
                            .find(|m| m.source == id && m.raw == edge.raw)
                            .and_then(|m| m.reason.clone()),
                    },
                };
                ImportRow {
                    path: import.path,
                    kind: import.kind,
                    line: import.line,
                    resolution,
                }
            })
            .collect();

        let report = ImportsReport {
            file: tree.canonical_path(id)?,
            imports,
        };
        writeln!(out, "{}", self.formatter.imports(&report)?)?;
        Ok(ExitCode::Success)
    }

    fn resolve<W: Write>(&self, sub: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let from = sub
            .get_one::<String>("from")
            .ok_or_else(|| anyhow!("Missing importing file"))?;
        let import = sub
            .get_one::<String>("import")
            .ok_or_else(|| anyhow!("Missing import path"))?;

        let report = ResolveReport {
            from: from.clone(),
            import: import.clone(),
            resolved: self.engine.resolve_import(from, import)?,
            library: self.engine.classify(import).map(|info| info.name.clone()),
        };
        writeln!(out, "{}", self.formatter.resolution(&report)?)?;
        Ok(ExitCode::Success)
    }

    fn graph<W: Write>(&self, project: &Project, out: &mut W) -> Result<ExitCode> {
        let graph = self.engine.build_dependency_graph(project.tree())?;

        let topological_order = graph.topological_order().ok().map(|order| {
            order
                .into_iter()
                .filter_map(|id| graph.path(id).map(str::to_string))
                .collect()
        });

        let output = GraphOutput {
            report: graph.report(),
            topological_order,
        };
        writeln!(out, "{}", self.formatter.graph(&output)?)?;
        Ok(ExitCode::Success)
    }

    fn unit<W: Write>(&self, project: &Project, sub: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let root = Self::find_file(project, Self::entry_arg(sub)?)?;
        let unit = self.engine.assemble_compilation_unit(root, project.tree())?;

        if sub.get_flag("request") {
            let request = CompileRequest::from_unit(&unit)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&request)?)?;
        } else {
            writeln!(out, "{}", self.formatter.unit(&unit)?)?;
        }
        Ok(ExitCode::Success)
    }

    fn compile<W: Write>(&self, project: &Project, sub: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let root = Self::find_file(project, Self::entry_arg(sub)?)?;
        let unit = self.engine.assemble_compilation_unit(root, project.tree())?;

        if self.formatter.format() == OutputFormatSetting::Console {
            writeln!(out, "{}", self.formatter.unit(&unit)?)?;
        }

        let client = CompilerClient::new(&self.config.to_client_config())?;
        let runtime = tokio::runtime::Runtime::new()?;
        let result = match runtime.block_on(client.compile_unit(&unit)) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Compiler service request failed: {}", e);
                CompilerResult::failure(e.to_string(), &ErrorInterpreter::new())
            }
        };

        writeln!(out, "{}", self.formatter.compile(&result)?)?;

        if result.is_success() {
            Ok(ExitCode::Success)
        } else {
            Ok(ExitCode::CompileFailure)
        }
    }

    fn explain<W: Write>(&self, sub: &ArgMatches, out: &mut W) -> Result<ExitCode> {
        let message = sub
            .get_many::<String>("message")
            .unwrap_or_default()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        let interpretation = ErrorInterpreter::new().interpret(&message);
        writeln!(out, "{}", self.formatter.explanation(&interpretation)?)?;
        Ok(ExitCode::Success)
    }

    fn handle_init_config<W: Write>(force: bool, out: &mut W) -> Result<ExitCode> {
        let config_path = PathBuf::from(".soliditystudio.yml");

        if config_path.exists() && !force {
            writeln!(
                out,
                "Configuration file already exists: {} (use --force to overwrite)",
                config_path.display()
            )?;
            return Ok(ExitCode::ConfigError);
        }

        StudioConfig::create_default_config_file(&config_path)?;
        writeln!(
            out,
            "Created default configuration file: {}",
            config_path.display()
        )?;
        writeln!(out, "\nEdit this file to customize Solidity Studio settings:")?;
        writeln!(out, "- Compiler service endpoint and timeout")?;
        writeln!(out, "- Root policy and known libraries")?;
        writeln!(out, "- Output preferences")?;

        Ok(ExitCode::Success)
    }
}
