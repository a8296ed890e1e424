//! Promptree CLI
//!
//! Usage:
//!   promptree [OPTIONS] <COMMAND>
//!
//! Commands:
//!   render <NAME>  Render a prompt to stdout
//!   list           List entry points in registration order
//!   meta <NAME>    Print the active variant's metadata as YAML
//!
//! Options:
//!   -r, --root <DIR>                 Prompts directory
//!   -c, --config <FILE>              Configuration file (TOML)
//!   -o, --override <NAME=VARIANT>    Select a variant (repeatable)
//!   -v, --verbose                    Debug logging
//!   -h, --help                       Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use promptree::{Context, OverrideTable, PromptConfig, PromptError, Registry};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG: &str = "promptree.toml";

#[derive(Parser)]
#[command(name = "promptree")]
#[command(about = "Render composable, versioned prompts")]
struct Cli {
    /// Prompts directory (takes precedence over the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Select a variant for a prompt, as NAME=VARIANT
    #[arg(short = 'o', long = "override", value_name = "NAME=VARIANT")]
    overrides: Vec<String>,

    /// Log resolution decisions to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a prompt to stdout
    Render {
        /// Dotted name, optionally pinned with @variant
        name: String,

        /// Context variable, as KEY=VALUE
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// YAML or JSON file with a mapping of context variables
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// List entry points in registration order
    List {
        /// Include internal fragments
        #[arg(long)]
        all: bool,
    },
    /// Print the active variant's metadata as YAML
    Meta {
        /// Dotted name
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let registry = match load_registry(&cli) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Render {
            name,
            vars,
            context,
        } => build_context(context.as_deref(), vars)
            .and_then(|ctx| registry.render(name, &ctx))
            .map(|text| println!("{}", text)),
        Command::List { all } => {
            for name in registry.names(*all) {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Meta { name } => registry.meta(name).and_then(|meta| {
            let yaml = serde_yaml::to_string(&meta)
                .map_err(|e| PromptError::Config(format!("cannot print metadata: {e}")))?;
            print!("{}", yaml);
            Ok(())
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", report(&registry, &e));
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn load_registry(cli: &Cli) -> Result<Registry, PromptError> {
    let config = match &cli.config {
        Some(path) => PromptConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            PromptConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => PromptConfig::default(),
    };

    let mut overrides = config.overrides.clone();
    let mut from_cli = OverrideTable::new();
    for assignment in &cli.overrides {
        from_cli.insert_assignment(assignment)?;
    }
    overrides.merge(from_cli);

    let root = cli.root.clone().or(config.root).ok_or_else(|| {
        PromptError::Config("no prompts directory: pass --root or set `root` in the config file".into())
    })?;
    promptree::load_dir(&root, overrides)
}

fn build_context(file: Option<&Path>, vars: &[String]) -> Result<Context, PromptError> {
    let mut ctx = match file {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| PromptError::io(path.display(), &e))?;
            let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
                PromptError::Config(format!("invalid context file '{}': {e}", path.display()))
            })?;
            if value.is_null() {
                Context::new()
            } else {
                Context::from_serialize(&value)?
            }
        }
        None => Context::new(),
    };

    for var in vars {
        let Some((key, value)) = var.split_once('=') else {
            return Err(PromptError::Config(format!(
                "variable '{var}' must look like KEY=VALUE"
            )));
        };
        ctx.insert(key.trim(), value);
    }
    Ok(ctx)
}

/// Source-annotated report for template syntax errors, plain message otherwise
fn report(registry: &Registry, err: &PromptError) -> String {
    let PromptError::TemplateSyntax { template, .. } = err else {
        return format!("Error: {}", err);
    };
    let source = registry.resolve(template).ok().and_then(|resolved| {
        let template_ref = resolved.prompt().template()?;
        registry.sources().template(template_ref).ok()
    });
    match source {
        Some(source) => err.format(&source.body, template),
        None => format!("Error: {}", err),
    }
}
