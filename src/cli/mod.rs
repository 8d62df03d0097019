//! TL-013: CLI subcommands: init, validate, parse, resolve, synthesize, run.

use crate::core::config::{self, ProjectConfig};
use crate::core::error::Diagnostic;
use crate::core::registry::Registry;
use crate::core::types::{AmbiguityPolicy, OutputFormat, PoseDocument};
use crate::core::{parser, pipeline, synthesizer};
use clap::{Args, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tasklingo project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate the project config and container registry
    Validate {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Parse an instruction and print its commands
    Parse {
        /// Instruction file (`-` for stdin)
        input: PathBuf,
    },

    /// Parse and resolve an instruction, printing op-codes
    Resolve {
        /// Instruction file (`-` for stdin)
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        /// How to treat descriptors matching several containers
        #[arg(long, value_enum)]
        ambiguity: Option<AmbiguityArg>,
    },

    /// Synthesize a pose document from op-code lines
    Synthesize {
        /// Op-code file, one op per line (`-` for stdin)
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Full pipeline: instruction text to pose document
    Run {
        /// Instruction file (`-` for stdin)
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// How to treat descriptors matching several containers
        #[arg(long, value_enum)]
        ambiguity: Option<AmbiguityArg>,
    },
}

/// Config file and registry selection.
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectArgs {
    /// Path to tasklingo.yaml (default: ./tasklingo.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Container registry CSV (overrides config)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,
}

/// Document destination and encoding.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Output file (overrides config; stdout when neither is set)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Yaml,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Yaml => Self::Yaml,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityArg {
    FirstMatch,
    Unresolved,
}

impl From<AmbiguityArg> for AmbiguityPolicy {
    fn from(a: AmbiguityArg) -> Self {
        match a {
            AmbiguityArg::FirstMatch => Self::FirstMatch,
            AmbiguityArg::Unresolved => Self::Unresolved,
        }
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { project } => cmd_validate(&project),
        Commands::Parse { input } => cmd_parse(&input),
        Commands::Resolve {
            input,
            project,
            ambiguity,
        } => cmd_resolve(&input, &project, ambiguity),
        Commands::Synthesize {
            input,
            project,
            output,
        } => cmd_synthesize(&input, &project, &output),
        Commands::Run {
            input,
            project,
            output,
            ambiguity,
        } => cmd_run(&input, &project, &output, ambiguity),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(config::CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create dir {}: {}", path.display(), e))?;

    std::fs::write(&config_path, config::CONFIG_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;
    println!("Initialized tasklingo project at {}", path.display());
    println!("  Created: {}", config_path.display());

    let registry_path = path.join("container_assets.csv");
    if registry_path.exists() {
        println!("  Kept:    {}", registry_path.display());
    } else {
        std::fs::write(&registry_path, config::REGISTRY_TEMPLATE)
            .map_err(|e| format!("cannot write {}: {}", registry_path.display(), e))?;
        println!("  Created: {}", registry_path.display());
    }
    Ok(())
}

fn cmd_validate(project: &ProjectArgs) -> Result<(), String> {
    let (cfg, registry) = load_project(project)?;
    let active = registry.iter().filter(|c| c.is_active()).count();
    println!(
        "OK: {} containers ({} active), format {}",
        registry.len(),
        active,
        cfg.format
    );
    if active == 0 {
        eprintln!("  WARN: no active container; pour without a destination will fail");
    }
    Ok(())
}

fn cmd_parse(input: &Path) -> Result<(), String> {
    let text = read_input(input)?;
    let parsed = parser::parse_instruction(&text);
    for cmd in &parsed.commands {
        let params: Vec<String> = cmd
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!("{}({})", cmd.name, params.join(", "));
    }
    report_diagnostics(&parsed.diagnostics);
    Ok(())
}

fn cmd_resolve(
    input: &Path,
    project: &ProjectArgs,
    ambiguity: Option<AmbiguityArg>,
) -> Result<(), String> {
    let text = read_input(input)?;
    let (cfg, registry) = load_project(project)?;
    let policy = ambiguity.map_or(cfg.ambiguity, AmbiguityPolicy::from);

    let report = pipeline::translate(&text, &registry, policy);
    for line in &report.opcodes {
        println!("{}", line);
    }
    eprintln!("relevant containers: [{}]", report.relevant_ids.join(", "));
    report_diagnostics(&report.diagnostics);
    Ok(())
}

fn cmd_synthesize(input: &Path, project: &ProjectArgs, output: &OutputArgs) -> Result<(), String> {
    let text = read_input(input)?;
    let (cfg, registry) = load_project(project)?;

    let synthesis = synthesizer::synthesize_text(&text, &registry);
    emit_document(&synthesis.document, &cfg, output)?;
    report_diagnostics(&synthesis.diagnostics);
    Ok(())
}

fn cmd_run(
    input: &Path,
    project: &ProjectArgs,
    output: &OutputArgs,
    ambiguity: Option<AmbiguityArg>,
) -> Result<(), String> {
    let text = read_input(input)?;
    let (cfg, registry) = load_project(project)?;
    let policy = ambiguity.map_or(cfg.ambiguity, AmbiguityPolicy::from);

    let report = pipeline::run(&text, &registry, policy);
    emit_document(&report.document, &cfg, output)?;
    report_diagnostics(&report.diagnostics);
    Ok(())
}

/// Read instruction or op-code text from a file, or stdin for `-`.
fn read_input(input: &Path) -> Result<String, String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("cannot read stdin: {}", e))?;
        return Ok(text);
    }
    std::fs::read_to_string(input).map_err(|e| format!("cannot read {}: {}", input.display(), e))
}

/// Load the config (CLI paths win) and the registry it names.
fn load_project(project: &ProjectArgs) -> Result<(ProjectConfig, Registry), String> {
    let mut cfg = config::load_config(project.config.as_deref())?;
    if let Some(path) = &project.registry {
        cfg.registry = Some(path.clone());
    }
    let path = cfg.registry.as_deref().ok_or_else(|| {
        format!(
            "no container registry given (use --registry or set `registry` in {})",
            config::CONFIG_FILE
        )
    })?;
    let registry = Registry::load_csv(path).map_err(|e| e.to_string())?;
    Ok((cfg, registry))
}

/// Render the document and send it to the chosen destination.
fn emit_document(
    document: &PoseDocument,
    cfg: &ProjectConfig,
    output: &OutputArgs,
) -> Result<(), String> {
    let format = output.format.map_or(cfg.format, OutputFormat::from);
    let rendered = pipeline::render_document(document, format)?;
    match output.output.as_deref().or(cfg.output.as_deref()) {
        Some(path) => {
            pipeline::write_document(path, &rendered)?;
            println!(
                "Wrote {} ({} poses, {} errors) {}",
                path.display(),
                document.poses.len(),
                document.error_count(),
                pipeline::document_digest(&rendered)
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!("  WARN: {}", d);
    }
    if !diagnostics.is_empty() {
        eprintln!("{} diagnostic(s)", diagnostics.len());
    }
}
