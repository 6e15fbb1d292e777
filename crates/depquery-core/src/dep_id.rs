//! Dependency identifiers.
//!
//! Every node in a dependency graph is keyed by a `DepId` that records where
//! the package came from (a registry, the local filesystem, a workspace, a git
//! repository or a remote tarball) together with the string needed to resolve
//! it again. The canonical string form joins the fields with `·`:
//!
//! | Kind        | Form                        |
//! |-------------|-----------------------------|
//! | registry    | `··name@1.0.0`              |
//! | named reg.  | `·alias·name@1.0.0`         |
//! | file        | `file·./path`               |
//! | workspace   | `workspace·packages/a`      |
//! | git         | `git·github:a/b·main`       |
//! | remote      | `remote·https://x/y.tgz`    |

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field separator of the canonical string form.
pub const DELIMITER: char = '·';

/// Provenance kind of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepIdKind {
    Registry,
    File,
    Workspace,
    Git,
    Remote,
}

impl DepIdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepIdKind::Registry => "registry",
            DepIdKind::File => "file",
            DepIdKind::Workspace => "workspace",
            DepIdKind::Git => "git",
            DepIdKind::Remote => "remote",
        }
    }
}

impl fmt::Display for DepIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepIdKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(DepIdKind::Registry),
            "file" => Ok(DepIdKind::File),
            "workspace" => Ok(DepIdKind::Workspace),
            "git" => Ok(DepIdKind::Git),
            "remote" => Ok(DepIdKind::Remote),
            other => Err(GraphError::invalid_dep_id(other, "unknown dependency kind")),
        }
    }
}

/// Identity of a node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DepId {
    /// Package resolved from a registry. An empty `registry` means the default one.
    Registry {
        registry: String,
        name: String,
        version: String,
    },
    /// Local directory or tarball.
    File { path: String },
    /// Workspace package inside the project.
    Workspace { path: String },
    /// Git repository at a committish.
    Git { repo: String, committish: String },
    /// Remote tarball URL.
    Remote { url: String },
}

impl DepId {
    /// Package from the default registry.
    pub fn registry(name: impl Into<String>, version: impl Into<String>) -> Self {
        DepId::Registry {
            registry: String::new(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Package from a named registry alias.
    pub fn named_registry(
        registry: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        DepId::Registry {
            registry: registry.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        DepId::File { path: path.into() }
    }

    pub fn workspace(path: impl Into<String>) -> Self {
        DepId::Workspace { path: path.into() }
    }

    pub fn git(repo: impl Into<String>, committish: impl Into<String>) -> Self {
        DepId::Git {
            repo: repo.into(),
            committish: committish.into(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        DepId::Remote { url: url.into() }
    }

    pub fn kind(&self) -> DepIdKind {
        match self {
            DepId::Registry { .. } => DepIdKind::Registry,
            DepId::File { .. } => DepIdKind::File,
            DepId::Workspace { .. } => DepIdKind::Workspace,
            DepId::Git { .. } => DepIdKind::Git,
            DepId::Remote { .. } => DepIdKind::Remote,
        }
    }

    /// Package name for registry ids.
    pub fn package_name(&self) -> Option<&str> {
        match self {
            DepId::Registry { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Resolved version for registry ids.
    pub fn package_version(&self) -> Option<&str> {
        match self {
            DepId::Registry { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Local path for file and workspace ids.
    pub fn path(&self) -> Option<&str> {
        match self {
            DepId::File { path } | DepId::Workspace { path } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = DELIMITER;
        match self {
            DepId::Registry {
                registry,
                name,
                version,
            } => write!(f, "{d}{registry}{d}{name}@{version}"),
            DepId::File { path } => write!(f, "file{d}{path}"),
            DepId::Workspace { path } => write!(f, "workspace{d}{path}"),
            DepId::Git { repo, committish } => write!(f, "git{d}{repo}{d}{committish}"),
            DepId::Remote { url } => write!(f, "remote{d}{url}"),
        }
    }
}

impl FromStr for DepId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(DELIMITER)
            .ok_or_else(|| GraphError::invalid_dep_id(s, "missing '·' separator"))?;

        match kind {
            "" => {
                let (registry, spec) = rest
                    .split_once(DELIMITER)
                    .ok_or_else(|| GraphError::invalid_dep_id(s, "missing registry field"))?;
                // Skip index 0 so scoped names (`@scope/name`) keep their leading `@`
                let at = spec
                    .char_indices()
                    .skip(1)
                    .filter(|(_, c)| *c == '@')
                    .map(|(i, _)| i)
                    .last()
                    .ok_or_else(|| GraphError::invalid_dep_id(s, "missing '@version'"))?;
                let (name, version) = (&spec[..at], &spec[at + 1..]);
                if name.is_empty() || version.is_empty() {
                    return Err(GraphError::invalid_dep_id(s, "empty name or version"));
                }
                Ok(DepId::named_registry(registry, name, version))
            }
            "file" => Ok(DepId::file(rest)),
            "workspace" => Ok(DepId::workspace(rest)),
            "remote" => Ok(DepId::remote(rest)),
            "git" => {
                let (repo, committish) = rest.split_once(DELIMITER).unwrap_or((rest, ""));
                Ok(DepId::git(repo, committish))
            }
            other => Err(GraphError::invalid_dep_id(
                s,
                format!("unknown dependency kind '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for DepId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DepId> for String {
    fn from(id: DepId) -> Self {
        id.to_string()
    }
}
