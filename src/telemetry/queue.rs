//! Queue transition span helpers.

use tracing::Span;

use crate::model::item::ItemId;

/// Start a span for one queue transition.
///
/// `queue.outcome` is declared empty and filled by [`record_transition`].
pub fn start_transition_span(event: &'static str, id: &ItemId, actor: &str) -> Span {
    tracing::info_span!(
        "queue.transition",
        "queue.event" = event,
        "item.id" = %id,
        "queue.actor" = actor,
        "queue.outcome" = tracing::field::Empty,
    )
}

/// Record the outcome of a transition on its span.
pub fn record_transition(span: &Span, outcome: &str) {
    span.record("queue.outcome", outcome);
    span.in_scope(|| {
        tracing::debug!(outcome, "transition");
    });
}
