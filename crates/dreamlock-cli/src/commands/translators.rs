use super::{colorize_compatible, json_pretty, open_backend, working_dir, EXIT_SUCCESS};
use dreamlock_core::Packager;
use dreamlock_runtime::Config;

pub fn run(config: &Config, source: Option<&str>, json: bool) -> Result<u8, String> {
    let backend = open_backend(config)?;
    let candidates = Packager::new(backend.as_ref(), config, working_dir()?)
        .candidates(source)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&candidates)?);
        return Ok(EXIT_SUCCESS);
    }
    if candidates.is_empty() {
        println!("no translators available");
        return Ok(EXIT_SUCCESS);
    }
    for t in &candidates {
        println!("{:<40} {}", t.identity(), colorize_compatible(t.compatible));
        for (name, spec) in &t.extra_args {
            let default = spec
                .default
                .as_ref()
                .map(|d| format!(" [default: {d}]"))
                .unwrap_or_default();
            println!("    --arg {name}=...  {}{default}", spec.description);
        }
    }
    Ok(EXIT_SUCCESS)
}
