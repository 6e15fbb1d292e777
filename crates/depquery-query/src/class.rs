//! `.class` selectors, shared with their `:pseudo` spellings.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::DependencyType;

pub(crate) fn class(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let Ast::Class { value } = state.current else {
        return Ok(());
    };
    apply(state, value).map_err(|_| QueryError::UnknownClass(value.clone()))
}

/// Apply the named class filter; `Err` carries the unknown name.
pub(crate) fn apply(state: &mut ParserState<'_>, name: &str) -> Result<(), String> {
    match name {
        "prod" => prod(state),
        "dev" => {
            state.retain_nodes(|node| node.dev);
            state.remove_dangling_edges();
        }
        "optional" => {
            state.retain_nodes(|node| node.optional);
            state.remove_dangling_edges();
        }
        "peer" => {
            state.retain_edges(|edge| edge.dep_type().is_peer());
            state.remove_unlinked_nodes();
        }
        "workspace" => {
            state.retain_nodes(|node| node.importer && !node.main_importer);
            state.remove_dangling_edges();
        }
        other => return Err(other.to_string()),
    }
    Ok(())
}

/// Edges declared as prod by a package that is not itself a dev dependency.
fn prod(state: &mut ParserState<'_>) {
    state.retain_edges(|edge| edge.dep_type() == DependencyType::Prod && !edge.from().dev);
    state.remove_unlinked_nodes();
}
