use clap::{Args, Parser, Subcommand};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uapi_ast::DeclTree;
use uapi_build::{collect_overlays, BuildConfig, Target};
use uapi_clang::ClangParser;
use uapi_gen::{generate_header, Preamble};

#[derive(Parser)]
#[command(name = "builduapi")]
#[command(author, version, about = "Generate a renamed, layout-checked header from Linux UAPI headers")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    build: BuildArgs,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the declaration tree of a translation unit
    Dump {
        /// Translation unit to parse
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Translation unit including every header to convert
    input: Option<PathBuf>,

    /// Header file to generate
    output: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct SourceArgs {
    /// Original header directory (default: current directory)
    #[arg(short = 'i', long = "include")]
    original: Option<PathBuf>,

    /// Modified header directory overlaid onto the original headers
    #[arg(short, long)]
    modified: Option<PathBuf>,

    /// Target ABI: x86, x86_64 or x32
    #[arg(short, long)]
    target: Option<Target>,

    /// Configuration file (builduapi.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preprocessor definitions
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,
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
        Some(Commands::Dump { input, source }) => {
            let config = load_config(&source, Some(input), None)?;
            let tree = parse(&config)?;
            print!("{}", tree.dump());
        }
        None => {
            let BuildArgs {
                input,
                output,
                source,
            } = cli.build;
            let config = load_config(&source, input, output)?;
            build(&config)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration file, if any, overridden by command-line arguments.
fn load_config(
    source: &SourceArgs,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<BuildConfig> {
    let mut config = match &source.config {
        Some(path) => BuildConfig::from_file(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?,
        None => BuildConfig::default(),
    };

    if input.is_some() {
        config.input = input;
    }
    if output.is_some() {
        config.output = output;
    }
    if let Some(original) = &source.original {
        config.headers.original = Some(original.clone());
    }
    if let Some(modified) = &source.modified {
        config.headers.modified = Some(modified.clone());
    }
    if let Some(target) = source.target {
        config.compiler.target = target;
    }
    config.compiler.defines.extend(source.defines.iter().cloned());

    Ok(config)
}

fn parse(config: &BuildConfig) -> Result<DeclTree> {
    let input = config
        .input
        .as_deref()
        .ok_or_else(|| miette!("No input translation unit given"))?;

    let overlays = match &config.headers.modified {
        Some(modified) => collect_overlays(modified, &config.original_headers()).into_diagnostic()?,
        None => Vec::new(),
    };

    let parser = ClangParser::new()?;
    parser.parse_file(input, &config.clang_args(), &overlays)
}

fn build(config: &BuildConfig) -> Result<()> {
    let output = config
        .output
        .as_deref()
        .ok_or_else(|| miette!("No output header given"))?;
    ensure_output_directory(output)?;
    config.validate().into_diagnostic()?;

    let args = config.clang_args();
    info!("builduapi {}", args.join(" "));

    let tree = parse(config)?;

    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.display().to_string());
    let header = generate_header(&tree, Preamble::new(file_name, args))?;

    // Written only once generation succeeded
    std::fs::write(output, header)
        .map_err(|e| miette!("Failed to write {}: {}", output.display(), e))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn ensure_output_directory(output: &Path) -> Result<()> {
    let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if let Err(e) = std::fs::create_dir_all(parent) {
        warn!("Failed to create {}: {}", parent.display(), e);
    }
    if !parent.is_dir() {
        return Err(miette!(
            "Output file directory {} not found",
            parent.display()
        ));
    }
    Ok(())
}
