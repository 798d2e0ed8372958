use dialoguer::{Confirm, Input, Select};
use dreamlock_core::{ArgumentPrompter, CoreError};
use dreamlock_runtime::{ExtraArgSpec, TranslatorDescriptor};
use serde_json::Value;

/// Terminal prompts for the `package` command.
pub struct TerminalPrompter;

fn prompt_failed(e: dialoguer::Error) -> CoreError {
    CoreError::Prompt(e.to_string())
}

fn describe(name: &str, spec: &ExtraArgSpec) -> String {
    let mut text = name.to_owned();
    if !spec.description.is_empty() {
        text.push_str(&format!(" ({})", spec.description));
    }
    if !spec.examples.is_empty() {
        text.push_str(&format!(" e.g. {}", spec.examples.join(", ")));
    }
    text
}

impl ArgumentPrompter for TerminalPrompter {
    fn choose_translator(&self, candidates: &[TranslatorDescriptor]) -> Result<usize, CoreError> {
        let items: Vec<String> = candidates
            .iter()
            .map(|t| {
                if t.compatible {
                    t.identity()
                } else {
                    format!("{} (not compatible)", t.identity())
                }
            })
            .collect();
        Select::new()
            .with_prompt("translator")
            .items(&items)
            .default(0)
            .interact()
            .map_err(prompt_failed)
    }

    fn confirm_flag(&self, name: &str, spec: &ExtraArgSpec) -> Result<bool, CoreError> {
        let default = matches!(spec.default, Some(Value::Bool(true)));
        Confirm::new()
            .with_prompt(describe(name, spec))
            .default(default)
            .interact()
            .map_err(prompt_failed)
    }

    fn ask_value(&self, name: &str, spec: &ExtraArgSpec) -> Result<String, CoreError> {
        let mut input = Input::<String>::new()
            .with_prompt(describe(name, spec))
            .allow_empty(true);
        match &spec.default {
            Some(Value::String(s)) => input = input.default(s.clone()),
            Some(Value::Null) | None => {}
            Some(other) => input = input.default(other.to_string()),
        }
        input.interact_text().map_err(prompt_failed)
    }
}
