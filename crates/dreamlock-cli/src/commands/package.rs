use super::{json_pretty, open_backend, spin_fail, spin_ok, spinner, working_dir, EXIT_SUCCESS};
use crate::prompt::TerminalPrompter;
use dreamlock_core::{PackageRequest, Packager};
use dreamlock_runtime::Config;
use std::io::IsTerminal;

pub fn run(
    config: &Config,
    request: &PackageRequest,
    non_interactive: bool,
    json: bool,
) -> Result<u8, String> {
    let backend = open_backend(config)?;
    let prompter = TerminalPrompter;
    let interactive = !non_interactive && !json && std::io::stdin().is_terminal();

    let mut packager = Packager::new(backend.as_ref(), config, working_dir()?);
    if interactive {
        packager = packager.with_prompter(&prompter);
    }

    // Prompts and a spinner cannot share the terminal.
    let pb = if json || interactive {
        None
    } else {
        Some(spinner("packaging..."))
    };

    let report = match packager.package(request) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("packaged {}", r.main_package));
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "packaging failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("translator: {}", report.translator);
        println!("lock: {}", report.lock_path.display());
        if let Some(ref template) = report.template_path {
            println!("template: {}", template.display());
        }
        if let Some(ref hash) = report.combined_hash {
            println!("combined hash: {hash}");
        }
        for edge in &report.removed_edges {
            println!("cyclic dependency removed: {edge}");
        }
    }
    Ok(EXIT_SUCCESS)
}
