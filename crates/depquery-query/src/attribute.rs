//! Attribute selectors over package manifests.
//!
//! `[key]`, `[key=value]` and friends look `key` up in each node's manifest.
//! `:attr(path, ..., [key=value])` descends through `path` first. Arrays met
//! on the way fan out, so `:attr(contributors, [name=bob])` checks the name
//! of every contributor.

use crate::ast::{Ast, AttributeSelector};
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::NodeRef;
use serde_json::Value;

/// Attribute comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `[attr]`
    Present,
    /// `=`
    Equals,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `~=` whitespace-separated word
    Word,
    /// `*=`
    Contains,
    /// `|=` exact or followed by `-`
    DashMatch,
}

impl Operator {
    pub fn parse(op: Option<&str>) -> Result<Self, QueryError> {
        match op {
            None => Ok(Operator::Present),
            Some("=") => Ok(Operator::Equals),
            Some("^=") => Ok(Operator::Prefix),
            Some("$=") => Ok(Operator::Suffix),
            Some("~=") => Ok(Operator::Word),
            Some("*=") => Ok(Operator::Contains),
            Some("|=") => Ok(Operator::DashMatch),
            Some(other) => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn matches(&self, value: &str, target: &str, insensitive: bool) -> bool {
        if *self == Operator::Present {
            return true;
        }
        let (value, target) = if insensitive {
            (value.to_lowercase(), target.to_lowercase())
        } else {
            (value.to_string(), target.to_string())
        };
        match self {
            Operator::Present => true,
            Operator::Equals => value == target,
            Operator::Prefix => value.starts_with(&target),
            Operator::Suffix => value.ends_with(&target),
            Operator::Word => value.split_whitespace().any(|word| word == target),
            Operator::Contains => value.contains(&target),
            Operator::DashMatch => {
                value == target
                    || value
                        .strip_prefix(&target)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// Resolve `path` then `key` inside `manifest`.
///
/// Returns every value found, arrays flattened to their elements, or `None`
/// when nothing resolves.
pub fn resolve_property(manifest: &Value, path: &[String], key: &str) -> Option<Vec<String>> {
    let mut current: Vec<&Value> = vec![manifest];
    for segment in path.iter().map(String::as_str).chain(std::iter::once(key)) {
        current = current
            .into_iter()
            .flat_map(fan_out)
            .filter_map(|value| value.get(segment))
            .collect();
        if current.is_empty() {
            return None;
        }
    }

    let values: Vec<String> = current
        .into_iter()
        .flat_map(fan_out)
        .filter_map(stringify)
        .collect();
    (!values.is_empty()).then_some(values)
}

fn fan_out(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Manifest values for a node, falling back to the node's own name/version.
fn node_values(node: &NodeRef, path: &[String], key: &str) -> Option<Vec<String>> {
    let resolved = node
        .manifest
        .as_ref()
        .and_then(|manifest| resolve_property(manifest, path, key));
    if resolved.is_some() || !path.is_empty() {
        return resolved;
    }
    match key {
        "name" if !node.name.is_empty() => Some(vec![node.name.clone()]),
        "version" => node.version.clone().map(|v| vec![v]),
        _ => None,
    }
}

pub(crate) fn attribute(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let Ast::Attribute(attr) = state.current else {
        return Ok(());
    };
    filter(state, &[], attr)
}

/// Keep nodes whose value at `path` + `attr.attribute` satisfies `attr`.
pub(crate) fn filter(
    state: &mut ParserState<'_>,
    path: &[String],
    attr: &AttributeSelector,
) -> Result<(), QueryError> {
    let operator = Operator::parse(attr.operator.as_deref())?;
    let target = attr.value.as_deref().unwrap_or_default();
    let key = attr.attribute.as_str();

    state.retain_nodes(|node| {
        node_values(node, path, key).is_some_and(|values| {
            values
                .iter()
                .any(|value| operator.matches(value, target, attr.insensitive))
        })
    });

    if path.is_empty() && key == "name" {
        state.retain_edges(|edge| operator.matches(edge.name(), target, attr.insensitive));
    } else {
        state.remove_dangling_edges();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_graph, frame, names, run};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_property() {
        let manifest = json!({
            "name": "a",
            "keywords": ["cli", "tool"],
            "engines": { "node": ">=18" },
            "contributors": [{ "name": "alice" }, { "name": "bob" }, { "email": "x" }],
            "nothing": null,
        });
        assert_eq!(resolve_property(&manifest, &[], "name"), Some(vec!["a".into()]));
        assert_eq!(
            resolve_property(&manifest, &[], "keywords"),
            Some(vec!["cli".into(), "tool".into()])
        );
        assert_eq!(
            resolve_property(&manifest, &path(&["engines"]), "node"),
            Some(vec![">=18".into()])
        );
        assert_eq!(
            resolve_property(&manifest, &path(&["contributors"]), "name"),
            Some(vec!["alice".into(), "bob".into()])
        );
        assert_eq!(resolve_property(&manifest, &[], "missing"), None);
        assert_eq!(resolve_property(&manifest, &[], "nothing"), None);
        assert_eq!(resolve_property(&manifest, &path(&["name"]), "x"), None);
    }

    #[test]
    fn test_operators() {
        assert!(Operator::Equals.matches("MIT", "MIT", false));
        assert!(!Operator::Equals.matches("MIT", "mit", false));
        assert!(Operator::Equals.matches("MIT", "mit", true));
        assert!(Operator::Prefix.matches("@x/y", "@x", false));
        assert!(Operator::Suffix.matches("lodash.merge", "merge", false));
        assert!(Operator::Word.matches("fast small parser", "small", false));
        assert!(!Operator::Word.matches("smaller", "small", false));
        assert!(Operator::Contains.matches("node-gyp rebuild", "gyp", false));
        assert!(Operator::DashMatch.matches("en", "en", false));
        assert!(Operator::DashMatch.matches("en-US", "en", false));
        assert!(!Operator::DashMatch.matches("english", "en", false));
        assert!(Operator::Present.matches("anything", "", false));
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(
            Operator::parse(Some("!=")),
            Err(QueryError::UnsupportedOperator("!=".into()))
        );
    }

    #[tokio::test]
    async fn test_attribute_selectors() {
        let graph = fixture_graph();
        let result = run("[license=MIT]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);

        let result = run("[keywords=tool]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);

        let result = run("[scripts]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);

        let result = run("[version=1.2.3]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["c"]);

        let result = run("[name^=\"@x\"]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["@x/y"]);

        let result = run("[name=A i]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);
    }

    #[tokio::test]
    async fn test_name_check_keeps_matching_edges() {
        let graph = fixture_graph();
        let result = run("[name=e]", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["e"]);
        assert_eq!(result.edges.len(), 2);
        assert!(result.edges.iter().all(|edge| edge.name() == "e"));
    }

    #[tokio::test]
    async fn test_unsupported_operator_fails_query() {
        let graph = fixture_graph();
        let err = run("[name!=a]", frame(&graph, None)).await.unwrap_err();
        assert_eq!(err, QueryError::UnsupportedOperator("!=".into()));
    }
}
