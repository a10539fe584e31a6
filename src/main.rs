use clap::{Parser, Subcommand};
use halide::config::{self, RuntimeEnv, SiteConfig};
use halide::fetch::ReqwestClient;
use halide::imaging::RustBackend;
use halide::pipeline::{self, BuildOptions};
use halide::{collection, content, output, schema, settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "halide")]
#[command(about = "Static site builder for photography portfolios")]
#[command(long_about = "\
Static site builder for photography portfolios

Projects are markdown files with YAML front matter; site settings live in a
single YAML document edited through the CMS.

Content structure:

  .
  ├── halide.toml                  # Build config (optional)
  ├── _data/
  │   └── settings.yaml            # Site metadata, theme, image formats
  ├── projects/
  │   ├── salt-flats.md            # One project per file
  │   └── ice.md
  └── assets/
      ├── icons/favicon.svg        # Copied to /favicon.svg
      └── uploads/                 # Images referenced from projects

Projects are ordered by `position`, then by date. Drafts and projects with
`permalink: false` are not published.

Run 'halide gen-config' to generate a documented halide.toml.")]
#[command(version)]
struct Cli {
    /// Project root (holds halide.toml)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory, relative to --root (overrides halide.toml)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site
    Build {
        /// Disable the image cache: re-encode every variant
        #[arg(long)]
        no_cache: bool,
    },
    /// Load and validate content, then print an inventory
    Check,
    /// Apply the CMS schema rules to every document
    Validate,
    /// Print the CMS schema as JSON
    Schema,
    /// Print a stock halide.toml with all options documented
    GenConfig,
    /// Show which runtime environment variables are set
    Env,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { no_cache } => {
            let config = load_config(&cli.root, cli.output)?;
            init_thread_pool(&config.build);
            let output_root = config.output_dir.clone();
            let options = BuildOptions {
                config,
                use_cache: !no_cache,
            };
            println!("==> Building {} → {}", cli.root.display(), output_root.display());
            let report = pipeline::build(
                &options,
                Arc::new(RustBackend::new()),
                Arc::new(ReqwestClient::new()?),
            )
            .await?;
            output::print_build_output(&report, &output_root);
            if !report.is_success() {
                return Err(format!("{} pages failed", report.failures.len()).into());
            }
        }
        Command::Check => {
            let config = load_config(&cli.root, cli.output)?;
            println!("==> Checking {}", config.input_dir.display());
            let settings = settings::load_settings(&config.input_dir)?;
            let projects = content::load_projects(&config.input_dir)?;
            let collection = collection::build_project_collection(&projects);
            output::print_check_output(&projects, &collection, &settings);
            println!("==> Content is valid");
        }
        Command::Validate => {
            let config = load_config(&cli.root, cli.output)?;
            let results = pipeline::validate_documents(&config.input_dir)?;
            output::print_validation_output(&results);
            let invalid = results.iter().filter(|(_, r)| r.is_err()).count();
            if invalid > 0 {
                return Err(format!("{invalid} documents violate the schema").into());
            }
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema::collections())?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Env => {
            let env = RuntimeEnv::from_env()?;
            output::print_env_output(env.branch(), &env.presence());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "halide=debug" } else { "halide=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load `halide.toml` under `root` and apply CLI overrides.
fn load_config(
    root: &std::path::Path,
    output: Option<PathBuf>,
) -> Result<SiteConfig, config::ConfigError> {
    let mut config = config::load_config(root)?;
    if let Some(output) = output {
        config.output_dir = root.join(output);
    }
    Ok(config)
}

/// Initialize the rayon thread pool based on build config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(build: &config::BuildConfig) {
    let threads = config::effective_threads(build);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
