//! Identity and provenance filters.

use super::{arg_text, required_arg};
use crate::ast::Ast;
use crate::attribute;
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::{BuildState, DepIdKind};
use globset::Glob;

/// `:type(registry|file|workspace|git|remote)`
pub(crate) fn dep_type(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let kind: DepIdKind = required_arg("type", args)?
        .parse()
        .map_err(|e: depquery_core::GraphError| QueryError::invalid_argument("type", e.to_string()))?;
    state.retain_nodes(|node| node.kind() == kind);
    state.remove_dangling_edges();
    Ok(())
}

/// `:spec(<bare spec>)` matches edges by the specifier their dependent wrote.
pub(crate) fn spec(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let spec = required_arg("spec", args)?;
    state.retain_edges(|edge| edge.spec().bare_spec == spec);
    state.remove_unlinked_nodes();
    Ok(())
}

/// `:registry(<alias or url>)`
pub(crate) fn registry(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let arg = required_arg("registry", args)?;
    let options = state.env.spec_options.clone();
    let wanted = options.registries.get(&arg).cloned().unwrap_or(arg);
    let wanted = normalize_url(&wanted);

    state.retain_nodes(|node| {
        options
            .registry_url(&node.id)
            .is_some_and(|url| normalize_url(&url) == wanted)
    });
    state.remove_dangling_edges();
    Ok(())
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

/// `:hostname(<host>)`
pub(crate) fn hostname(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let host = required_arg("hostname", args)?.to_lowercase();
    let options = state.env.spec_options.clone();
    state.retain_nodes(|node| {
        options
            .hostname(&node.id)
            .is_some_and(|h| h.to_lowercase() == host)
    });
    state.remove_dangling_edges();
    Ok(())
}

/// `:path(<glob>)` matches install locations.
pub(crate) fn path(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let pattern = required_arg("path", args)?;
    let matcher = Glob::new(&pattern)
        .map_err(|e| QueryError::invalid_argument("path", e.to_string()))?
        .compile_matcher();

    state.retain_nodes(|node| {
        let location = if node.location.is_empty() {
            node.id.path()
        } else {
            Some(node.location.as_str())
        };
        location.is_some_and(|location| matcher.is_match(location))
    });
    state.remove_dangling_edges();
    Ok(())
}

/// `:attr(<path>..., [<key><op><value>])`
pub(crate) fn attr(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let Some((last, path)) = args.split_last() else {
        return Err(QueryError::invalid_argument("attr", "missing attribute selector"));
    };
    let [Ast::Attribute(selector)] = last.children() else {
        return Err(QueryError::invalid_argument(
            "attr",
            "last argument must be an attribute selector",
        ));
    };
    let path: Vec<String> = path.iter().map(arg_text).collect();
    attribute::filter(state, &path, selector)
}

pub(crate) fn private(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_nodes(|node| node.is_private());
    state.remove_dangling_edges();
    Ok(())
}

pub(crate) fn built(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_nodes(|node| node.build_state == BuildState::Built);
    state.remove_dangling_edges();
    Ok(())
}

/// Nodes the security archive has a report for.
pub(crate) fn scanned(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let archive = state.security_archive("scanned")?;
    state.retain_nodes(|node| archive.get(&node.id).is_some());
    state.remove_dangling_edges();
    Ok(())
}
