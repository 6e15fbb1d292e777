//! Registry-backed filters: `:outdated` and `:published`.
//!
//! Only registry packages that are neither private nor importers and carry a
//! parseable version are eligible; everything else is dropped. Lookups for
//! one invocation run concurrently and are joined before filtering. A node
//! whose metadata cannot be fetched is kept and a warning is logged.

use super::{nth_arg, required_arg, Comparator};
use crate::ast::Ast;
use crate::error::QueryError;
use crate::registry::{Packument, RemoteLookup};
use crate::state::ParserState;
use chrono::{DateTime, NaiveDate, Utc};
use depquery_core::range::{parse_range, parse_version, Range};
use depquery_core::{DepIdKind, NodeRef};
use futures::future::join_all;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which newer versions count for `:outdated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutdatedKind {
    Any,
    Major,
    Minor,
    Patch,
    /// A newer version satisfies a dependent's spec
    InRange,
    /// A newer version satisfies none of the dependents' specs
    OutOfRange,
}

impl FromStr for OutdatedKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(OutdatedKind::Any),
            "major" => Ok(OutdatedKind::Major),
            "minor" => Ok(OutdatedKind::Minor),
            "patch" => Ok(OutdatedKind::Patch),
            "in-range" => Ok(OutdatedKind::InRange),
            "out-of-range" => Ok(OutdatedKind::OutOfRange),
            other => Err(QueryError::invalid_argument(
                "outdated",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

/// Node eligible for a registry lookup.
struct Candidate {
    node: NodeRef,
    registry: String,
    name: String,
    version: Version,
}

/// Split the selected nodes into lookup candidates, dropping the rest.
fn candidates(state: &mut ParserState<'_>) -> Vec<Candidate> {
    let spec_options = Arc::clone(&state.env.spec_options);
    let mut eligible = Vec::new();
    state.retain_nodes(|node| {
        if node.kind() != DepIdKind::Registry || node.is_private() || node.importer {
            return false;
        }
        let version = node.version.as_deref().and_then(parse_version);
        let name = node.id.package_name().map(str::to_string);
        let registry = spec_options.registry_url(&node.id);
        match (version, name, registry) {
            (Some(version), Some(name), Some(registry)) => {
                eligible.push(Candidate {
                    node: node.clone(),
                    registry,
                    name,
                    version,
                });
                true
            }
            _ => false,
        }
    });
    state.remove_dangling_edges();
    eligible
}

/// Fetch one packument per distinct package, concurrently.
async fn fetch_all(
    state: &ParserState<'_>,
    candidates: &[Candidate],
    full: bool,
) -> Result<BTreeMap<(String, String), RemoteLookup<Arc<Packument>>>, QueryError> {
    let keys: BTreeSet<(String, String)> = candidates
        .iter()
        .map(|c| (c.registry.clone(), c.name.clone()))
        .collect();
    debug!("Fetching registry metadata for {} package(s)", keys.len());

    let env = Arc::clone(&state.env);
    let lookups = keys.iter().map(|(registry, name)| {
        env.registry.packument(registry, name, full, &env.signal)
    });
    let results = join_all(lookups).await;

    let mut fetched = BTreeMap::new();
    for (key, result) in keys.into_iter().zip(results) {
        fetched.insert(key, result?);
    }
    state.cancellable().await?;
    Ok(fetched)
}

/// Run `keep` for every candidate whose packument was fetched; keep the
/// node when the lookup failed.
async fn filter_remote(
    state: &mut ParserState<'_>,
    pseudo: &str,
    full: bool,
    mut keep: impl FnMut(&Candidate, &Packument) -> bool,
) -> Result<(), QueryError> {
    let candidates = candidates(state);
    if candidates.is_empty() {
        return Ok(());
    }
    let fetched = fetch_all(state, &candidates, full).await?;

    for candidate in &candidates {
        let key = (candidate.registry.clone(), candidate.name.clone());
        let matched = match fetched.get(&key) {
            Some(RemoteLookup::Fetched(packument)) => keep(candidate, packument),
            Some(RemoteLookup::Unavailable(e)) => {
                warn!(
                    ":{} could not check {}@{}, keeping it: {}",
                    pseudo, candidate.name, candidate.version, e
                );
                true
            }
            None => true,
        };
        if !matched {
            state.remove_node(&candidate.node);
        }
    }
    state.remove_dangling_edges();
    Ok(())
}

/// Stable versions strictly greater than `current`.
fn newer_versions(packument: &Packument, current: &Version) -> Vec<Version> {
    packument
        .version_strings()
        .filter_map(parse_version)
        .filter(|v| v.pre.is_empty() && v > current)
        .collect()
}

/// Ranges of the specs pointing at `node`.
fn dependent_ranges(node: &NodeRef) -> Vec<Range> {
    node.edges_in()
        .iter()
        .filter_map(|edge| parse_range(&edge.spec().bare_spec))
        .collect()
}

fn is_outdated(kind: OutdatedKind, candidate: &Candidate, packument: &Packument) -> bool {
    let current = &candidate.version;
    let newer = newer_versions(packument, current);
    match kind {
        OutdatedKind::Any => !newer.is_empty(),
        OutdatedKind::Major => newer.iter().any(|v| v.major > current.major),
        OutdatedKind::Minor => newer
            .iter()
            .any(|v| v.major == current.major && v.minor > current.minor),
        OutdatedKind::Patch => newer.iter().any(|v| {
            v.major == current.major && v.minor == current.minor && v.patch > current.patch
        }),
        OutdatedKind::InRange => {
            let ranges = dependent_ranges(&candidate.node);
            newer.iter().any(|v| ranges.iter().any(|r| r.matches(v)))
        }
        OutdatedKind::OutOfRange => {
            let ranges = dependent_ranges(&candidate.node);
            newer.iter().any(|v| !ranges.iter().any(|r| r.matches(v)))
        }
    }
}

/// `:outdated([any|major|minor|patch|in-range|out-of-range])`
pub(crate) async fn outdated(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let kind = match nth_arg(args, 0) {
        Some(kind) => kind.parse()?,
        None => OutdatedKind::Any,
    };
    filter_remote(state, "outdated", false, |candidate, packument| {
        is_outdated(kind, candidate, packument)
    })
    .await
}

/// Parse an RFC 3339 timestamp or a plain date (midnight UTC).
fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// `:published([cmp]<date>)`
pub(crate) async fn published(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let arg = required_arg("published", args)?;
    let (comparator, date) = Comparator::split(&arg);
    let explicit = arg.trim_start().starts_with(['<', '>', '=']);

    let target = if explicit {
        Some(parse_timestamp(date).ok_or_else(|| {
            QueryError::invalid_argument("published", format!("'{}' is not a date", date))
        })?)
    } else {
        None
    };
    let date = date.to_string();

    filter_remote(state, "published", true, |candidate, packument| {
        let Some(time) = packument.published(&candidate.version.to_string()) else {
            return false;
        };
        match target {
            // No comparator: prefix match on the timestamp
            None => time.starts_with(&date),
            Some(target) => {
                parse_timestamp(time).is_some_and(|time| match comparator {
                    Comparator::Eq => time.date_naive() == target.date_naive(),
                    cmp => cmp.compare(&time, &target),
                })
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryClient;
    use crate::state::QueryEnv;
    use crate::testing::{fixture_graph, frame, frame_with_env, names, run};
    use depquery_core::{DepId, DependencyGraph, DependencyType, Node, SpecOptions};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn packument(versions: &[&str]) -> Packument {
        serde_json::from_value(json!({
            "name": "a",
            "versions": versions.iter().map(|v| (v.to_string(), json!({}))).collect::<serde_json::Map<_, _>>(),
        }))
        .unwrap()
    }

    fn candidate(graph: &Arc<DependencyGraph>, name: &str, version: &str) -> Candidate {
        Candidate {
            node: graph.find(&DepId::registry(name, version)).unwrap(),
            registry: "https://registry.npmjs.org/".into(),
            name: name.into(),
            version: parse_version(version).unwrap(),
        }
    }

    fn env_for(server: &MockServer) -> Arc<QueryEnv> {
        Arc::new(QueryEnv {
            spec_options: Arc::new(SpecOptions::default().with_registry(server.uri())),
            host_contexts: None,
            registry: Arc::new(
                RegistryClient::default()
                    .with_retries(1)
                    .with_retry_delay(Duration::from_millis(1)),
            ),
            signal: CancellationToken::new(),
        })
    }

    /// root -> a@1.0.0 (^1.0.0), root -> b@2.0.0 (^2.0.0)
    fn small_graph() -> Arc<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).with_name("root").as_main_importer());
        graph.place_package(root, DependencyType::Prod, "^1.0.0", Node::new(DepId::registry("a", "1.0.0")));
        graph.place_package(root, DependencyType::Prod, "^2.0.0", Node::new(DepId::registry("b", "2.0.0")));
        Arc::new(graph)
    }

    #[test]
    fn test_outdated_kinds() {
        let graph = fixture_graph();
        let c = candidate(&graph, "c", "1.2.3");

        let patch_only = packument(&["1.2.3", "1.2.4"]);
        assert!(is_outdated(OutdatedKind::Any, &c, &patch_only));
        assert!(is_outdated(OutdatedKind::Patch, &c, &patch_only));
        assert!(!is_outdated(OutdatedKind::Minor, &c, &patch_only));
        assert!(!is_outdated(OutdatedKind::Major, &c, &patch_only));

        let minor = packument(&["1.2.3", "1.9.0"]);
        assert!(is_outdated(OutdatedKind::Minor, &c, &minor));
        assert!(!is_outdated(OutdatedKind::Major, &c, &minor));

        let major = packument(&["1.2.3", "2.0.0"]);
        assert!(is_outdated(OutdatedKind::Major, &c, &major));

        let prerelease_only = packument(&["1.2.3", "2.0.0-rc.1"]);
        assert!(!is_outdated(OutdatedKind::Any, &c, &prerelease_only));
    }

    #[test]
    fn test_outdated_ranges() {
        // c is required as ~1.2.0
        let graph = fixture_graph();
        let c = candidate(&graph, "c", "1.2.3");

        let in_range = packument(&["1.2.3", "1.2.9"]);
        assert!(is_outdated(OutdatedKind::InRange, &c, &in_range));
        assert!(!is_outdated(OutdatedKind::OutOfRange, &c, &in_range));

        let out_of_range = packument(&["1.2.3", "1.3.0"]);
        assert!(!is_outdated(OutdatedKind::InRange, &c, &out_of_range));
        assert!(is_outdated(OutdatedKind::OutOfRange, &c, &out_of_range));
    }

    #[test]
    fn test_parse_timestamp() {
        let date = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert!(parse_timestamp("2024-01-15T10:00:00.000Z").is_some());
        assert!(parse_timestamp("last week").is_none());
    }

    #[tokio::test]
    async fn test_outdated_against_registry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "a",
                "versions": { "1.0.0": {}, "1.1.0": {} }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "b",
                "versions": { "2.0.0": {} }
            })))
            .mount(&server)
            .await;

        let graph = small_graph();
        let result = run(":outdated", frame_with_env(&graph, None, env_for(&server)))
            .await
            .unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);

        let result = run(":outdated(major)", frame_with_env(&graph, None, env_for(&server)))
            .await
            .unwrap();
        assert!(result.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_metadata_keeps_node() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let graph = small_graph();
        let result = run(":outdated(major)", frame_with_env(&graph, None, env_for(&server)))
            .await
            .unwrap();
        assert_eq!(names(&result.nodes), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_published() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "a",
                "versions": { "1.0.0": {} },
                "time": { "1.0.0": "2023-06-01T12:00:00.000Z" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "b",
                "versions": { "2.0.0": {} },
                "time": { "2.0.0": "2024-02-10T08:30:00.000Z" }
            })))
            .mount(&server)
            .await;

        let graph = small_graph();
        for (query, expected) in [
            (":published(2024-02)", vec!["b"]),
            (":published(>=2024-01-01)", vec!["b"]),
            (":published(<2024-01-01)", vec!["a"]),
            (":published(=2023-06-01)", vec!["a"]),
            (":published(2022)", vec![]),
        ] {
            let result = run(query, frame_with_env(&graph, None, env_for(&server)))
                .await
                .unwrap();
            assert_eq!(names(&result.nodes), expected, "{query}");
        }

        let err = run(":published(>soon)", frame_with_env(&graph, None, env_for(&server)))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_ineligible_nodes_are_dropped() {
        // The root is a private file node: nothing to look up
        let graph = fixture_graph();
        let result = run(":root:outdated", frame(&graph, None)).await.unwrap();
        assert!(result.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let graph = fixture_graph();
        let err = run(":outdated(sideways)", frame(&graph, None)).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument { .. }));
    }
}
