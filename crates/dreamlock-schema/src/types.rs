//! Newtype wrappers for package identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so the lock document
//! stays a plain JSON map keyed by name and version.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Opaque package identifier within one ecosystem namespace.
    PackageName
);

string_newtype!(
    /// Opaque package version. Only equality and lexical order are meaningful.
    PackageVersion
);

/// One resolvable unit of the dependency graph.
///
/// Serialized as a two-element array `["name", "version"]`. Ordering is
/// lexicographic by name, then version, which is the iteration order used
/// everywhere a deterministic traversal is required.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(
    from = "(PackageName, PackageVersion)",
    into = "(PackageName, PackageVersion)"
)]
pub struct NodeKey {
    pub name: PackageName,
    pub version: PackageVersion,
}

impl NodeKey {
    pub fn new(name: impl Into<PackageName>, version: impl Into<PackageVersion>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl From<(PackageName, PackageVersion)> for NodeKey {
    fn from((name, version): (PackageName, PackageVersion)) -> Self {
        Self { name, version }
    }
}

impl From<NodeKey> for (PackageName, PackageVersion) {
    fn from(key: NodeKey) -> Self {
        (key.name, key.version)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.version)
    }
}

/// `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: NodeKey,
    pub to: NodeKey,
}

impl DependencyEdge {
    pub fn new(from: NodeKey, to: NodeKey) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
