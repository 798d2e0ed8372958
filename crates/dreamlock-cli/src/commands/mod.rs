pub mod check;
pub mod package;
pub mod translators;

use dreamlock_runtime::{select_backend, Backend, Config};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_LOCK_ERROR: u8 = 2;
pub const EXIT_OUTPUT_CONFLICT: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_compatible(compatible: bool) -> String {
    use console::Style;
    if compatible {
        Style::new().green().apply_to("compatible").to_string()
    } else {
        Style::new().dim().apply_to("incompatible").to_string()
    }
}

/// The configured backend, checked for availability.
pub fn open_backend(config: &Config) -> Result<Box<dyn Backend>, String> {
    let backend = select_backend(&config.backend, config).map_err(|e| e.to_string())?;
    if !backend.available() {
        return Err(format!(
            "backend '{}' is not available on this system",
            backend.name()
        ));
    }
    Ok(backend)
}

pub fn working_dir() -> Result<PathBuf, String> {
    std::env::current_dir().map_err(|e| format!("cannot determine working directory: {e}"))
}
