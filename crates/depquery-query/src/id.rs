//! `#name` and `#name@range` selectors.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::range;

pub(crate) fn id(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let Ast::Identifier { value } = state.current else {
        return Ok(());
    };
    let (name, range) = split_name_range(value);

    state.retain_nodes(|node| {
        node.name == name
            && range.is_none_or(|r| {
                node.version
                    .as_deref()
                    .is_some_and(|v| range::satisfies(v, r))
            })
    });
    // Missing edges still carry the requested name
    state.retain_edges(|edge| edge.name() == name);
    Ok(())
}

/// `@scope/name@^1` -> (`@scope/name`, `Some("^1")`)
fn split_name_range(value: &str) -> (&str, Option<&str>) {
    match value.rfind('@') {
        Some(at) if at > 0 => (&value[..at], Some(&value[at + 1..])),
        _ => (value, None),
    }
}
