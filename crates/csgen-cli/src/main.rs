use clap::{ArgAction, Parser, Subcommand};
use csgen_build::GenConfig;
use csgen_clang::{translate_file, ClangParser, EmitOptions, OutputOptions};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Configuration file picked up from the working directory when `-c` is absent.
const DEFAULT_CONFIG: &str = "csgen.toml";

#[derive(Parser)]
#[command(name = "csgen")]
#[command(author, version, about = "Translate C function bodies to C#")]
struct Cli {
    /// Raise the log level (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate the functions of a C source file to C#
    Translate {
        /// C source file
        file: PathBuf,

        /// Output file path (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fail when any function could not be translated
        #[arg(long)]
        strict: bool,
    },

    /// Print the syntax tree of a C source file
    Dump {
        /// C source file
        file: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Translate {
            file,
            output,
            config,
            strict,
        } => {
            let config = load_config(config.as_deref())?;
            let report = translate_file(&file, config.clang_args(), emit_options(&config))?;
            let rendered = report.render(&output_options(&config));

            match output {
                Some(ref output_path) => {
                    std::fs::write(output_path, &rendered)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("Failed to write {}", output_path.display()))?;
                    info!(path = %output_path.display(), "wrote output");
                }
                None => print!("{}", rendered),
            }

            info!(
                functions = report.functions.len(),
                skipped = report.skipped.len(),
                failed = report.failures.len(),
                "translation finished"
            );

            if strict && !report.is_success() {
                let names: Vec<_> = report.failures.iter().map(|f| f.name.as_str()).collect();
                return Err(miette!(
                    "{} function(s) failed to translate: {}",
                    names.len(),
                    names.join(", ")
                ));
            }
        }

        Commands::Dump { file, config } => {
            let config = load_config(config.as_deref())?;
            let parser = ClangParser::new()?.with_args(config.clang_args());
            let tree = parser.parse_file(&file)?;

            let mut out = String::new();
            tree.translation_unit.dump(&mut out, 0);
            print!("{}", out);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GenConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                debug!("no configuration file, using defaults");
                return Ok(GenConfig::default());
            }
            default
        }
    };

    debug!(path = %path.display(), "loading configuration");
    GenConfig::from_file(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to load {}", path.display()))
}

/// Built-in skip set and renames, extended by the configuration.
fn emit_options(config: &GenConfig) -> EmitOptions {
    let mut options = EmitOptions::default();
    for name in &config.translate.skip {
        options = options.with_skip(name.as_str());
    }
    for (from, to) in &config.translate.renames {
        options = options.with_rename(from.as_str(), to.as_str());
    }
    if let Some(indent) = &config.output.indent {
        options = options.with_indent(indent.as_str());
    }
    options
}

fn output_options(config: &GenConfig) -> OutputOptions {
    OutputOptions {
        namespace: config.output.namespace.clone(),
        class: config.output.class.clone(),
    }
}
