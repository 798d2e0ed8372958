use crate::prompt::ArgumentPrompter;
use crate::CoreError;
use dreamlock_runtime::TranslatorDescriptor;
use tracing::{debug, info};

/// Order candidates by preference: compatible first, then `pure < ifd <
/// impure`, then identity.
pub fn sort_candidates(mut candidates: Vec<TranslatorDescriptor>) -> Vec<TranslatorDescriptor> {
    candidates.sort_by_cached_key(|t| (!t.compatible, t.kind, t.identity()));
    candidates
}

/// Pick one translator from `candidates` (already in preference order).
///
/// `requested` may be a full `subsystem.kind.name` or a bare name. With no
/// request the prompter chooses; without a prompter only an unambiguous
/// candidate list is accepted.
pub fn select_translator(
    candidates: &[TranslatorDescriptor],
    requested: Option<&str>,
    prompter: Option<&dyn ArgumentPrompter>,
) -> Result<TranslatorDescriptor, CoreError> {
    let identities = || candidates.iter().map(TranslatorDescriptor::identity).collect();

    let Some(requested) = requested else {
        return match (candidates, prompter) {
            ([], _) => Err(CoreError::TranslatorNotFound {
                requested: "<any>".to_owned(),
                candidates: Vec::new(),
            }),
            ([only], None) => Ok(only.clone()),
            (_, None) => Err(CoreError::AmbiguousTranslatorSelection {
                candidates: identities(),
            }),
            (_, Some(prompter)) => {
                let index = prompter.choose_translator(candidates)?;
                candidates.get(index).cloned().ok_or_else(|| {
                    CoreError::Prompt(format!("translator choice {index} out of range"))
                })
            }
        };
    };

    if let Some(exact) = candidates.iter().find(|t| t.identity() == requested) {
        info!("using translator {requested}");
        return Ok(exact.clone());
    }

    let by_name: Vec<&TranslatorDescriptor> =
        candidates.iter().filter(|t| t.name == requested).collect();
    match by_name.as_slice() {
        [one] => {
            debug!("translator '{requested}' resolved to {}", one.identity());
            Ok((*one).clone())
        }
        [] => Err(CoreError::TranslatorNotFound {
            requested: requested.to_owned(),
            candidates: identities(),
        }),
        many => Err(CoreError::AmbiguousTranslatorSelection {
            candidates: many.iter().map(|t| t.identity()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamlock_runtime::{ExtraArgSpec, TranslatorKind};
    use std::collections::BTreeMap;

    fn translator(subsystem: &str, kind: TranslatorKind, name: &str, compatible: bool) -> TranslatorDescriptor {
        TranslatorDescriptor {
            subsystem: subsystem.to_owned(),
            kind,
            name: name.to_owned(),
            compatible,
            extra_args: BTreeMap::new(),
        }
    }

    fn candidates() -> Vec<TranslatorDescriptor> {
        sort_candidates(vec![
            translator("python", TranslatorKind::Impure, "pip", true),
            translator("nodejs", TranslatorKind::Pure, "yarn-lock", false),
            translator("nodejs", TranslatorKind::Pure, "package-lock", true),
            translator("nodejs", TranslatorKind::Ifd, "package-lock", true),
        ])
    }

    struct PickSecond;

    impl ArgumentPrompter for PickSecond {
        fn choose_translator(&self, _: &[TranslatorDescriptor]) -> Result<usize, CoreError> {
            Ok(1)
        }
        fn confirm_flag(&self, _: &str, _: &ExtraArgSpec) -> Result<bool, CoreError> {
            Ok(false)
        }
        fn ask_value(&self, _: &str, _: &ExtraArgSpec) -> Result<String, CoreError> {
            Ok(String::new())
        }
    }

    #[test]
    fn ordering_prefers_compatible_then_purity() {
        let ids: Vec<String> = candidates().iter().map(TranslatorDescriptor::identity).collect();
        assert_eq!(
            ids,
            vec![
                "nodejs.pure.package-lock",
                "nodejs.ifd.package-lock",
                "python.impure.pip",
                "nodejs.pure.yarn-lock",
            ]
        );
    }

    #[test]
    fn select_by_identity() {
        let t = select_translator(&candidates(), Some("nodejs.ifd.package-lock"), None).unwrap();
        assert_eq!(t.kind, TranslatorKind::Ifd);
    }

    #[test]
    fn select_by_unique_name() {
        let t = select_translator(&candidates(), Some("pip"), None).unwrap();
        assert_eq!(t.identity(), "python.impure.pip");
    }

    #[test]
    fn ambiguous_bare_name() {
        let err = select_translator(&candidates(), Some("package-lock"), None).unwrap_err();
        let CoreError::AmbiguousTranslatorSelection { candidates } = err else {
            panic!("expected AmbiguousTranslatorSelection");
        };
        assert_eq!(candidates, vec!["nodejs.pure.package-lock", "nodejs.ifd.package-lock"]);
    }

    #[test]
    fn unknown_translator_lists_candidates() {
        let err = select_translator(&candidates(), Some("cargo-lock"), None).unwrap_err();
        let CoreError::TranslatorNotFound { requested, candidates } = err else {
            panic!("expected TranslatorNotFound");
        };
        assert_eq!(requested, "cargo-lock");
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn non_interactive_without_request() {
        let single = vec![translator("rust", TranslatorKind::Pure, "cargo-lock", true)];
        assert_eq!(
            select_translator(&single, None, None).unwrap().name,
            "cargo-lock"
        );
        assert!(matches!(
            select_translator(&candidates(), None, None),
            Err(CoreError::AmbiguousTranslatorSelection { .. })
        ));
        assert!(matches!(
            select_translator(&[], None, None),
            Err(CoreError::TranslatorNotFound { .. })
        ));
    }

    #[test]
    fn prompter_picks_when_interactive() {
        let t = select_translator(&candidates(), None, Some(&PickSecond)).unwrap();
        assert_eq!(t.identity(), "nodejs.ifd.package-lock");
    }
}
