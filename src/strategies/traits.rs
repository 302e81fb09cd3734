// src/strategies/traits.rs
use crate::core::session::Session;
use crate::types::{Decision, Position};

/// A rebalancing rule: a pure function of the observed session state and the
/// current position. Implementations never perform I/O and never mutate the
/// session; the engine applies whatever the returned decision says.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, session: &Session, position: &Position) -> Decision;
}
