//! webstep CLI - inspect bindings without a browser

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use webstep::binding::check_locator_bindings;
use webstep::error::{FixSuggestion, Result, WebStepError};
use webstep::{OfflineDriver, ScopedStore, WebConfig, WebContext};

#[derive(Parser)]
#[command(name = "webstep")]
#[command(about = "webstep - resolve and check web step bindings")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one bound name
    Resolve {
        /// Name to resolve
        name: String,

        /// Bindings file (YAML: scope -> key: value)
        #[arg(short, long)]
        bindings: Option<PathBuf>,

        /// Config file (default: ~/.config/webstep/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Expand placeholders in a piece of step text
    Interpolate {
        /// Text containing $name / ${name} placeholders
        text: String,

        /// Bindings file (YAML: scope -> key: value)
        #[arg(short, long)]
        bindings: Option<PathBuf>,

        /// Config file (default: ~/.config/webstep/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check every element locator in a bindings file
    Validate {
        /// Path to the bindings file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Resolve {
            name,
            bindings,
            config,
        } => resolve_name(&name, bindings.as_deref(), config.as_deref()).await,
        Commands::Interpolate {
            text,
            bindings,
            config,
        } => interpolate_text(&text, bindings.as_deref(), config.as_deref()).await,
        Commands::Validate { file } => validate_bindings(&file),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn offline_context(bindings: Option<&Path>, config: Option<&Path>) -> Result<WebContext> {
    let config = match config {
        Some(path) => WebConfig::load_from(path)?,
        None => WebConfig::load()?,
    }
    .with_env();

    let store = match bindings {
        Some(path) => ScopedStore::load_file(path)?,
        None => ScopedStore::new(),
    };

    Ok(WebContext::builder(Arc::new(OfflineDriver))
        .store(Arc::new(store))
        .config(config)
        .build())
}

async fn resolve_name(name: &str, bindings: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let ctx = offline_context(bindings, config)?;
    match ctx.resolve_bound_value(name).await {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => {
            print_scopes(&ctx);
            Err(e)
        }
    }
}

async fn interpolate_text(
    text: &str,
    bindings: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let ctx = offline_context(bindings, config)?;
    match ctx.interpolate(text).await {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => {
            print_scopes(&ctx);
            Err(e)
        }
    }
}

fn print_scopes(ctx: &WebContext) {
    eprintln!("{}", "Scopes:".cyan().bold());
    eprint!("{}", ctx.store().dump());
}

fn validate_bindings(file: &Path) -> Result<()> {
    let store = ScopedStore::load_file(file)?;
    let report = check_locator_bindings(&store);

    let mut invalid = 0;
    for (name, checked) in &report {
        match checked {
            Ok(strategy) => println!("  {} {} ({})", "✓".green(), name, strategy),
            Err(e) => {
                invalid += 1;
                println!("  {} {}: {}", "✗".red(), name, e);
            }
        }
    }

    if invalid > 0 {
        return Err(WebStepError::BindingsFile {
            path: file.display().to_string(),
            reason: format!("{} of {} element locators invalid", invalid, report.len()),
        });
    }

    println!(
        "{} {} element locators valid in '{}'",
        "✓".green(),
        report.len(),
        file.display()
    );
    Ok(())
}
