use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How much a translator needs from its environment. Lower is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    Pure,
    Ifd,
    Impure,
}

impl fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pure => "pure",
            Self::Ifd => "ifd",
            Self::Impure => "impure",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraArgKind {
    Flag,
    Value,
}

/// Declared schema of one translator-specific argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraArgSpec {
    #[serde(rename = "type")]
    pub kind: ExtraArgKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// A resolved extra-argument value as handed to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraArgValue {
    Flag(bool),
    Value(String),
}

impl fmt::Display for ExtraArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Value(s) => f.write_str(s),
        }
    }
}

/// A translator as advertised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorDescriptor {
    pub subsystem: String,
    #[serde(rename = "type")]
    pub kind: TranslatorKind,
    pub name: String,
    #[serde(default)]
    pub compatible: bool,
    #[serde(default)]
    pub extra_args: BTreeMap<String, ExtraArgSpec>,
}

impl TranslatorDescriptor {
    /// Fully-qualified `subsystem.kind.name`.
    pub fn identity(&self) -> String {
        format!("{}.{}.{}", self.subsystem, self.kind, self.name)
    }
}

/// The JSON document a translator binary receives as its only argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorInput {
    pub input_files: Vec<PathBuf>,
    pub input_directories: Vec<PathBuf>,
    pub output_file: PathBuf,
    #[serde(flatten)]
    pub extra_args: BTreeMap<String, ExtraArgValue>,
}
