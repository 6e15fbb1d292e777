//! `:semver(<value>, <fn>, <source>)` and `:prerelease`.
//!
//! The value compared is the node's version unless a third argument points
//! somewhere else in the manifest: an attribute (`[engines]`), an
//! `:attr(...)` path, or a dotted path (`engines.node`).

use super::{arg_text, nth_arg, required_arg};
use crate::ast::Ast;
use crate::attribute::resolve_property;
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::range::{parse_range, parse_version};
use depquery_core::NodeRef;
use semver::Version;
use std::str::FromStr;

/// Comparison applied by `:semver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemverFn {
    Satisfies,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl FromStr for SemverFn {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "satisfies" => Ok(SemverFn::Satisfies),
            "gt" => Ok(SemverFn::Gt),
            "gte" => Ok(SemverFn::Gte),
            "lt" => Ok(SemverFn::Lt),
            "lte" => Ok(SemverFn::Lte),
            "eq" => Ok(SemverFn::Eq),
            "neq" => Ok(SemverFn::Neq),
            other => Err(QueryError::invalid_argument(
                "semver",
                format!("unknown comparison '{}'", other),
            )),
        }
    }
}

/// Where the compared value comes from.
#[derive(Debug, Clone)]
enum Source {
    Version,
    Property { path: Vec<String>, key: String },
}

impl Source {
    fn parse(arg: Option<&Ast>) -> Result<Self, QueryError> {
        let Some(arg) = arg else {
            return Ok(Source::Version);
        };
        match arg.children() {
            [Ast::Attribute(attr)] => Ok(Source::Property {
                path: Vec::new(),
                key: attr.attribute.clone(),
            }),
            [Ast::Pseudo { value, nodes }] if value == "attr" => {
                let Some((last, path)) = nodes.split_last() else {
                    return Err(QueryError::invalid_argument("semver", "empty :attr() source"));
                };
                let [Ast::Attribute(attr)] = last.children() else {
                    return Err(QueryError::invalid_argument(
                        "semver",
                        ":attr() source must end with an attribute selector",
                    ));
                };
                Ok(Source::Property {
                    path: path.iter().map(arg_text).collect(),
                    key: attr.attribute.clone(),
                })
            }
            _ => {
                let text = arg_text(arg);
                let mut segments: Vec<String> = text
                    .split('.')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                let Some(key) = segments.pop() else {
                    return Err(QueryError::invalid_argument("semver", "empty source"));
                };
                Ok(Source::Property {
                    path: segments,
                    key,
                })
            }
        }
    }

    fn values(&self, node: &NodeRef) -> Vec<String> {
        match self {
            Source::Version => node.version.clone().into_iter().collect(),
            Source::Property { path, key } => node
                .manifest
                .as_ref()
                .and_then(|manifest| resolve_property(manifest, path, key))
                .unwrap_or_default(),
        }
    }
}

/// A version, or the lowest version a range admits.
fn lowest(input: &str) -> Option<Version> {
    parse_version(input).or_else(|| parse_range(input)?.min_version())
}

fn is_version(input: &str) -> bool {
    parse_version(input).is_some()
}

/// Compare one node-side value against the selector argument.
fn compare(function: SemverFn, value: &str, arg: &str) -> bool {
    if function == SemverFn::Satisfies {
        let (version, range) = match (is_version(value), is_version(arg)) {
            (true, _) => (parse_version(value), parse_range(arg)),
            // Node holds a range: ask whether it admits the fixed argument
            (false, true) => (parse_version(arg), parse_range(value)),
            (false, false) => (lowest(value), parse_range(arg)),
        };
        return version
            .zip(range)
            .is_some_and(|(version, range)| range.matches(&version));
    }

    let (Some(value), Some(arg)) = (lowest(value), lowest(arg)) else {
        return false;
    };
    match function {
        SemverFn::Gt => value > arg,
        SemverFn::Gte => value >= arg,
        SemverFn::Lt => value < arg,
        SemverFn::Lte => value <= arg,
        SemverFn::Eq => value == arg,
        SemverFn::Neq => value != arg,
        SemverFn::Satisfies => false,
    }
}

pub(crate) fn semver(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let value = required_arg("semver", args)?;
    if lowest(&value).is_none() && parse_range(&value).is_none() {
        return Err(QueryError::invalid_argument(
            "semver",
            format!("'{}' is not a version or range", value),
        ));
    }
    let function = match nth_arg(args, 1) {
        Some(name) => name.parse()?,
        None => SemverFn::Satisfies,
    };
    let source = Source::parse(args.get(2))?;

    state.retain_nodes(|node| {
        source
            .values(node)
            .iter()
            .any(|candidate| compare(function, candidate, &value))
    });
    state.remove_dangling_edges();
    Ok(())
}

pub(crate) fn prerelease(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_nodes(|node| {
        node.version
            .as_deref()
            .and_then(parse_version)
            .is_some_and(|v| !v.pre.is_empty())
    });
    state.remove_dangling_edges();
    Ok(())
}
