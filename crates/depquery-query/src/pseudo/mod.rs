//! Pseudo-selector registry.
//!
//! Every `:verb` maps to a [`Verb`]; unknown verbs are a grammar error.
//! Handlers live in submodules grouped by what they look at:
//!
//! - [`structural`]: selection shape (`:root`, `:has`, `:not`, ...)
//! - [`relationship`]: dependency relationships (`:link`, `:overridden`)
//! - [`identity`]: package identity and provenance (`:type`, `:path`, ...)
//! - [`versioning`]: semver comparisons (`:semver`, `:prerelease`)
//! - [`remote`]: registry-backed filters (`:outdated`, `:published`)
//! - [`security`]: security archive filters (`:score`, `:cve`, `:shell`, ...)
//! - [`host`](crate::host): context switching (`:host`)

pub(crate) mod identity;
pub(crate) mod relationship;
pub(crate) mod remote;
pub(crate) mod security;
pub(crate) mod structural;
pub(crate) mod versioning;

use crate::ast::Ast;
use crate::class;
use crate::error::QueryError;
use crate::host;
use crate::state::ParserState;
use std::str::FromStr;
use tracing::debug;

/// A known pseudo-selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    // Structural
    Root,
    Scope,
    Project,
    Empty,
    Missing,
    Has,
    Is,
    Not,

    // Relationship
    /// `:dev`, `:prod`, `:optional`, `:peer`, `:workspace`
    Class(&'static str),
    Link,
    Overridden,

    // Identity
    Type,
    Spec,
    Registry,
    Hostname,
    Path,
    Attr,
    Private,
    Built,
    Scanned,

    // Versioning
    Semver,
    Prerelease,
    Outdated,
    Published,

    // Security
    /// Presence of one alert type
    Alert(&'static str),
    Score,
    Severity,
    Squat,
    License,
    Cve,
    Cwe,
    Malware,

    // Context
    Host,
}

/// Security verbs that only check for one alert type.
const ALERT_VERBS: &[(&str, &str)] = &[
    ("abandoned", "missingAuthor"),
    ("confused", "manifestConfusion"),
    ("debug", "debugAccess"),
    ("deprecated", "deprecated"),
    ("dynamic", "dynamicRequire"),
    ("entropic", "highEntropyStrings"),
    ("env", "envVars"),
    ("eval", "usesEval"),
    ("fs", "filesystemAccess"),
    ("minified", "minifiedFile"),
    ("native", "hasNativeCode"),
    ("network", "networkAccess"),
    ("obfuscated", "obfuscatedFile"),
    ("scripts", "installScripts"),
    ("shell", "shellAccess"),
    ("shrinkwrap", "shrinkwrap"),
    ("suspicious", "suspiciousStarActivity"),
    ("tracker", "telemetry"),
    ("trivial", "trivialPackage"),
    ("undesirable", "troll"),
    ("unknown", "newAuthor"),
    ("unmaintained", "unmaintained"),
    ("unpopular", "unpopularPackage"),
    ("unstable", "unstableOwnership"),
];

impl FromStr for Verb {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s {
            "root" => Verb::Root,
            "scope" => Verb::Scope,
            "project" => Verb::Project,
            "empty" => Verb::Empty,
            "missing" => Verb::Missing,
            "has" => Verb::Has,
            "is" => Verb::Is,
            "not" => Verb::Not,
            "dev" => Verb::Class("dev"),
            "prod" => Verb::Class("prod"),
            "optional" => Verb::Class("optional"),
            "peer" => Verb::Class("peer"),
            "workspace" => Verb::Class("workspace"),
            "link" => Verb::Link,
            "overridden" => Verb::Overridden,
            "type" => Verb::Type,
            "spec" => Verb::Spec,
            "registry" => Verb::Registry,
            "hostname" => Verb::Hostname,
            "path" => Verb::Path,
            "attr" => Verb::Attr,
            "private" => Verb::Private,
            "built" => Verb::Built,
            "scanned" => Verb::Scanned,
            "semver" | "v" => Verb::Semver,
            "prerelease" => Verb::Prerelease,
            "outdated" => Verb::Outdated,
            "published" => Verb::Published,
            "score" => Verb::Score,
            "severity" => Verb::Severity,
            "squat" => Verb::Squat,
            "license" => Verb::License,
            "cve" => Verb::Cve,
            "cwe" => Verb::Cwe,
            "malware" => Verb::Malware,
            "host" => Verb::Host,
            other => {
                return ALERT_VERBS
                    .iter()
                    .find(|(name, _)| *name == other)
                    .map(|(_, alert)| Verb::Alert(alert))
                    .ok_or_else(|| QueryError::UnknownPseudo(other.to_string()));
            }
        };
        Ok(verb)
    }
}

pub(crate) async fn pseudo(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let Ast::Pseudo { value, nodes } = state.current else {
        return Ok(());
    };
    let verb: Verb = value.parse()?;
    debug!("pseudo :{} ({:?}) with {} argument(s)", value, verb, nodes.len());

    match verb {
        Verb::Root => structural::root(state),
        Verb::Scope => structural::scope(state),
        Verb::Project => structural::project(state),
        Verb::Empty => structural::empty(state),
        Verb::Missing => structural::missing(state),
        Verb::Has => structural::has(state, nodes).await,
        Verb::Is => structural::is(state, nodes).await,
        Verb::Not => structural::not(state, nodes).await,
        Verb::Class(name) => class::apply(state, name).map_err(QueryError::UnknownClass),
        Verb::Link => relationship::link(state),
        Verb::Overridden => relationship::overridden(state),
        Verb::Type => identity::dep_type(state, nodes),
        Verb::Spec => identity::spec(state, nodes),
        Verb::Registry => identity::registry(state, nodes),
        Verb::Hostname => identity::hostname(state, nodes),
        Verb::Path => identity::path(state, nodes),
        Verb::Attr => identity::attr(state, nodes),
        Verb::Private => identity::private(state),
        Verb::Built => identity::built(state),
        Verb::Scanned => identity::scanned(state),
        Verb::Semver => versioning::semver(state, nodes),
        Verb::Prerelease => versioning::prerelease(state),
        Verb::Outdated => remote::outdated(state, nodes).await,
        Verb::Published => remote::published(state, nodes).await,
        Verb::Alert(alert) => security::alert(state, value, alert),
        Verb::Score => security::score(state, nodes),
        Verb::Severity => security::severity(state, nodes),
        Verb::Squat => security::squat(state, nodes),
        Verb::License => security::license(state, nodes),
        Verb::Cve => security::cve(state, nodes),
        Verb::Cwe => security::cwe(state, nodes),
        Verb::Malware => security::malware(state, nodes),
        Verb::Host => host::host(state, nodes).await,
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Plain text of one argument: the string or tag it holds, or its source.
pub(crate) fn arg_text(arg: &Ast) -> String {
    match arg.children() {
        [Ast::String { value }] | [Ast::Tag { value }] => value.clone(),
        _ => arg.source().unwrap_or_default().trim().to_string(),
    }
}

/// Text of the argument at `index`, if present and non-empty.
pub(crate) fn nth_arg(args: &[Ast], index: usize) -> Option<String> {
    args.get(index).map(arg_text).filter(|text| !text.is_empty())
}

/// Text of the first argument, required.
pub(crate) fn required_arg(pseudo: &str, args: &[Ast]) -> Result<String, QueryError> {
    nth_arg(args, 0).ok_or_else(|| QueryError::invalid_argument(pseudo, "missing argument"))
}

/// Comparison operator prefix of an argument (`>=0.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparator {
    /// Split a leading comparator off `input`; no prefix means `Eq`.
    pub(crate) fn split(input: &str) -> (Comparator, &str) {
        let input = input.trim();
        for (prefix, cmp) in [
            (">=", Comparator::Gte),
            ("<=", Comparator::Lte),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Eq),
        ] {
            if let Some(rest) = input.strip_prefix(prefix) {
                return (cmp, rest.trim());
            }
        }
        (Comparator::Eq, input)
    }

    pub(crate) fn compare<T: PartialOrd>(&self, value: &T, target: &T) -> bool {
        match self {
            Comparator::Eq => value == target,
            Comparator::Gt => value > target,
            Comparator::Gte => value >= target,
            Comparator::Lt => value < target,
            Comparator::Lte => value <= target,
        }
    }
}
