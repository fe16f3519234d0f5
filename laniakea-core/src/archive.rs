// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Archive domain entities
//!
//! A repository's suites, components and architectures are operator
//! configuration, not a fixed list baked into the archive tooling — an
//! archive run by this system can define its own suite and component
//! names. These types are therefore plain, serde-friendly structs keyed by
//! name rather than a closed set of enum variants.

use serde::{Deserialize, Serialize};

use crate::architectures::{Architecture, ALL};

/// A package archive: a named collection of suites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Unique name of the repository.
    pub name: String,
    /// Suites contained in this repository.
    pub suites: Vec<Suite>,
}

impl Repository {
    /// Look up a suite by name.
    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.name == name)
    }
}

/// A named slice of a repository, e.g. "unstable" or "testing".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    /// Name of the suite.
    pub name: String,
    /// Name of the repository this suite belongs to.
    pub repo: String,
    /// Architectures supported by this suite (excluding the implicit `all`).
    pub architectures: Vec<Architecture>,
    /// Components making up this suite.
    pub components: Vec<Component>,
    /// Name of the parent suite this suite overlays, if any.
    pub base_suite_name: Option<String>,
}

impl Suite {
    /// The first non-`all` architecture, used as the suite's native build architecture.
    pub fn primary_architecture(&self) -> Option<&Architecture> {
        self.architectures.iter().find(|a| !a.is_all())
    }

    /// All architectures this suite contains, including the implicit `all`.
    pub fn architectures_with_all(&self) -> Vec<Architecture> {
        let mut archs = self.architectures.clone();
        if !archs.iter().any(Architecture::is_all) {
            archs.push(Architecture::new(ALL).expect("'all' is always a valid architecture name"));
        }
        archs
    }

    /// Return whether this suite has the given component.
    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name == name)
    }
}

/// A subdivision of a suite, e.g. "main", "contrib", "non-free".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    /// Unique name of this component across the archive.
    pub name: String,
    /// Names of components this component depends on (e.g. "contrib" on "main").
    pub depends: Vec<String>,
}

impl Component {
    /// Construct a component with no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
        }
    }
}

impl TryFrom<&str> for Component {
    type Error = std::convert::Infallible;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Component::new(value))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::architectures::Architecture;

    fn arch(s: &str) -> Architecture {
        Architecture::new(s).unwrap()
    }

    #[test]
    fn primary_architecture_skips_all() {
        let suite = Suite {
            name: "unstable".into(),
            repo: "main-repo".into(),
            architectures: vec![arch("all"), arch("amd64"), arch("arm64")],
            components: vec![Component::new("main")],
            base_suite_name: None,
        };
        assert_eq!(suite.primary_architecture(), Some(&arch("amd64")));
    }

    #[test]
    fn architectures_with_all_is_idempotent() {
        let suite = Suite {
            name: "unstable".into(),
            repo: "main-repo".into(),
            architectures: vec![arch("amd64")],
            components: vec![],
            base_suite_name: None,
        };
        let archs = suite.architectures_with_all();
        assert_eq!(archs.iter().filter(|a| a.is_all()).count(), 1);
    }

    #[test]
    fn repository_suite_lookup() {
        let repo = Repository {
            name: "main-repo".into(),
            suites: vec![Suite {
                name: "unstable".into(),
                repo: "main-repo".into(),
                architectures: vec![],
                components: vec![],
                base_suite_name: None,
            }],
        };
        assert!(repo.suite("unstable").is_some());
        assert!(repo.suite("testing").is_none());
    }
}
