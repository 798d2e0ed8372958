use crate::CoreError;
use dreamlock_runtime::{ExtraArgSpec, TranslatorDescriptor};

/// Interactive answers for decisions the command line left open.
///
/// Passing no prompter means non-interactive mode: every open decision must
/// be settled by defaults or it is an error.
pub trait ArgumentPrompter {
    /// Index into `candidates` of the translator to use.
    fn choose_translator(&self, candidates: &[TranslatorDescriptor]) -> Result<usize, CoreError>;

    fn confirm_flag(&self, name: &str, spec: &ExtraArgSpec) -> Result<bool, CoreError>;

    /// May return an empty string; the caller asks again.
    fn ask_value(&self, name: &str, spec: &ExtraArgSpec) -> Result<String, CoreError>;
}
