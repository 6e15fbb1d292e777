//! `:link` and `:overridden`.
//!
//! `:dev`, `:prod`, `:optional`, `:peer` and `:workspace` share the class
//! handlers in [`crate::class`].

use crate::error::QueryError;
use crate::state::ParserState;
use depquery_core::DepIdKind;

const TARBALL_SUFFIXES: &[&str] = &[".tgz", ".tar.gz", ".tar"];

/// Local directory dependencies installed as symlinks.
pub(crate) fn link(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_nodes(|node| {
        node.kind() == DepIdKind::File
            && !node.importer
            && node
                .id
                .path()
                .is_some_and(|path| !TARBALL_SUFFIXES.iter().any(|ext| path.ends_with(ext)))
    });
    state.remove_dangling_edges();
    Ok(())
}

/// Dependencies whose spec was replaced by an override.
pub(crate) fn overridden(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_edges(|edge| edge.spec().overridden);
    state.remove_unlinked_nodes();
    Ok(())
}
