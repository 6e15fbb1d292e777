//! Registry and git host configuration used to interpret dependency provenance.

use crate::dep_id::DepId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Public npm registry.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Registry aliases and git host templates.
///
/// Git host templates expand `$1`, `$2`, ... with the `/`-separated segments
/// of a shorthand repository (`github:owner/repo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SpecOptions {
    /// Registry used by ids without an alias
    pub registry: String,

    /// Named registries (`alias -> url`)
    pub registries: BTreeMap<String, String>,

    /// Git host shorthand templates (`name -> url template`)
    pub git_hosts: BTreeMap<String, String>,
}

impl Default for SpecOptions {
    fn default() -> Self {
        let registries = BTreeMap::from([("npm".to_string(), DEFAULT_REGISTRY.to_string())]);
        let git_hosts = BTreeMap::from([
            (
                "github".to_string(),
                "https://github.com/$1/$2".to_string(),
            ),
            (
                "gitlab".to_string(),
                "https://gitlab.com/$1/$2".to_string(),
            ),
            (
                "bitbucket".to_string(),
                "https://bitbucket.org/$1/$2".to_string(),
            ),
            (
                "gist".to_string(),
                "https://gist.github.com/$1".to_string(),
            ),
        ]);
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            registries,
            git_hosts,
        }
    }
}

impl SpecOptions {
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, url: impl Into<String>) -> Self {
        self.registries.insert(alias.into(), url.into());
        self
    }

    /// Registry URL a registry id resolves against, always `/`-terminated.
    pub fn registry_url(&self, id: &DepId) -> Option<String> {
        let DepId::Registry { registry, .. } = id else {
            return None;
        };
        let url = if registry.is_empty() {
            self.registry.clone()
        } else {
            self.registries.get(registry)?.clone()
        };
        Some(if url.ends_with('/') {
            url
        } else {
            format!("{}/", url)
        })
    }

    /// Expand a git shorthand (`github:owner/repo`) through `git_hosts`.
    pub fn git_host_url(&self, repo: &str) -> Option<String> {
        let (host, path) = repo.split_once(':')?;
        let template = self.git_hosts.get(host)?;
        let mut expanded = template.clone();
        for (i, segment) in path.split('/').enumerate() {
            expanded = expanded.replace(&format!("${}", i + 1), segment);
        }
        Some(expanded)
    }

    /// Host name a dependency is fetched from.
    ///
    /// File and workspace dependencies have no host.
    pub fn hostname(&self, id: &DepId) -> Option<String> {
        match id {
            DepId::Registry { .. } => host_of(&self.registry_url(id)?),
            DepId::Git { repo, .. } => {
                if let Some(url) = self.git_host_url(repo) {
                    return host_of(&url);
                }
                let repo = repo.strip_prefix("git+").unwrap_or(repo);
                host_of(repo).or_else(|| scp_host(repo))
            }
            DepId::Remote { url } => host_of(url),
            DepId::File { .. } | DepId::Workspace { .. } => None,
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Host of an scp-like git address (`git@github.com:owner/repo.git`).
fn scp_host(repo: &str) -> Option<String> {
    let (user_host, _) = repo.split_once(':')?;
    let host = user_host.rsplit('@').next()?;
    (!host.is_empty()).then(|| host.to_string())
}
