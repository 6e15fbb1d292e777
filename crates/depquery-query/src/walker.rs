//! Recursive AST evaluator.
//!
//! `walk` dispatches the current node to its handler, then walks the node's
//! children left to right (pseudo-selectors evaluate their own arguments).
//! Each child sees the selection left by the previous one, which is how
//! compound selectors and combinator chains narrow `partial`. Once a
//! `Selector` clause is fully walked, whatever remains in `partial` is copied
//! into `collect`.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::ParserState;
use crate::{attribute, class, combinator, id, pseudo};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, trace};

/// Evaluate `state.current` and its subtree.
pub fn walk<'a>(mut state: ParserState<'a>) -> BoxFuture<'a, Result<ParserState<'a>, QueryError>> {
    async move {
        state.cancellable().await?;
        let current = state.current;
        trace!("walk {} '{}'", current.kind(), current);

        // `:host` swaps the context for the rest of its clause only
        let clause_context = matches!(current, Ast::Selector { .. }).then(|| {
            (
                state.initial.clone(),
                state.importers.clone(),
                state.security_archive.clone(),
            )
        });

        match dispatch(&mut state).await {
            Ok(()) => {}
            Err(err) if state.loose && err.is_grammar() => {
                debug!("Skipping '{}' in loose mode: {}", current, err);
                state.partial.clear();
            }
            Err(err) => return Err(err),
        }

        if !matches!(current, Ast::Pseudo { .. }) {
            let children = current.children();
            if !children.is_empty() {
                let (prev, next) = (state.prev, state.next);
                for (i, child) in children.iter().enumerate() {
                    state.current = child;
                    state.prev = i.checked_sub(1).map(|p| &children[p]);
                    state.next = children.get(i + 1);
                    state = walk(state).await?;
                }
                state.current = current;
                state.prev = prev;
                state.next = next;
            }
        }

        if let Some((initial, importers, security_archive)) = clause_context {
            let partial = std::mem::take(&mut state.partial);
            state.collect.extend(&partial);
            state.initial = initial;
            state.importers = importers;
            state.security_archive = security_archive;
        }

        Ok(state)
    }
    .boxed()
}

async fn dispatch(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    match state.current {
        Ast::Root { .. } | Ast::Comment { .. } | Ast::Nesting | Ast::Universal => Ok(()),
        Ast::Selector { .. } => {
            selector(state);
            Ok(())
        }
        Ast::Tag { value } => Err(QueryError::unsupported_selector("tag", value.as_str())),
        Ast::String { value } => Err(QueryError::unsupported_selector("string", value.as_str())),
        Ast::Identifier { .. } => id::id(state),
        Ast::Class { .. } => class::class(state),
        Ast::Attribute(_) => attribute::attribute(state),
        Ast::Combinator { .. } => combinator::combinator(state).await,
        Ast::Pseudo { .. } => pseudo::pseudo(state).await,
    }
}

/// Each clause starts over from the selection fixed for this frame.
fn selector(state: &mut ParserState<'_>) {
    state.partial = state.initial.clone();
}
