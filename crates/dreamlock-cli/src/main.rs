mod commands;
mod prompt;

use clap::{Parser, Subcommand};
use commands::{EXIT_FAILURE, EXIT_LOCK_ERROR, EXIT_OUTPUT_CONFLICT};
use dreamlock_runtime::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dreamlock",
    version,
    about = "Reconcile translator output into canonical, reproducible dream-lock files"
)]
struct Cli {
    /// Path to the config file (default: $DREAMLOCK_CONFIG or ~/.config/dreamlock/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Translate a source and write its dream-lock.json.
    Package {
        /// Source shortcut, URL, path, or existing dream-lock.json (default: current directory).
        #[arg(long)]
        source: Option<String>,
        /// Translator as `subsystem.kind.name` or bare name.
        #[arg(long)]
        translator: Option<String>,
        /// Output directory.
        #[arg(long, default_value = ".")]
        output: PathBuf,
        /// Record one combined hash instead of one hash per source.
        #[arg(long, default_value_t = false)]
        combined: bool,
        /// Translator-specific argument as `key=value` (repeatable).
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
        /// Replace existing output files.
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Also render a default.nix next to the lock.
        #[arg(long, default_value_t = false)]
        default_nix: bool,
        /// Never prompt; fail instead of asking.
        #[arg(long, default_value_t = false)]
        non_interactive: bool,
    },
    /// Validate a dream-lock.json and report whether it is canonical and acyclic.
    Check {
        /// Path to the lock file.
        #[arg(default_value = "dream-lock.json")]
        lock: PathBuf,
    },
    /// List translators for a source in selection order.
    Translators {
        /// Source shortcut, URL, or path (default: current directory).
        #[arg(long)]
        source: Option<String>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DREAMLOCK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Package {
            source,
            translator,
            output,
            combined,
            args,
            force,
            default_nix,
            non_interactive,
        } => commands::package::run(
            &config,
            &dreamlock_core::PackageRequest {
                source,
                translator,
                output,
                combined,
                extra_args: args,
                force,
                build_template: default_nix,
            },
            non_interactive,
            json_output,
        ),
        Commands::Check { lock } => commands::check::run(&lock, json_output),
        Commands::Translators { source } => {
            commands::translators::run(&config, source.as_deref(), json_output)
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("lock schema validation failed")
                || msg.starts_with("lock error:")
                || msg.starts_with("translator output error:")
            {
                EXIT_LOCK_ERROR
            } else if msg.starts_with("output directory") {
                EXIT_OUTPUT_CONFLICT
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

/// Read the config file, then apply `DREAMLOCK_*` environment overrides.
fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match std::env::var_os("DREAMLOCK_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => {
                let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
                Config::default_path(&home)
            }
        },
    };
    let mut config = Config::load(&path).map_err(|e| e.to_string())?;

    if let Ok(backend) = std::env::var("DREAMLOCK_BACKEND") {
        config.backend = backend;
    }
    if let Some(src) = std::env::var_os("DREAMLOCK_SRC") {
        config.framework_src = PathBuf::from(src);
    }
    if let Ok(names) = std::env::var("DREAMLOCK_FETCHER_NAMES") {
        config = config.with_fetcher_names(&names);
    }
    tracing::debug!(path = %path.display(), backend = %config.backend, "configuration loaded");
    Ok(config)
}
