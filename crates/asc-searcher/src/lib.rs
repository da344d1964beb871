//! # asc-searcher
//!
//! Adaptive hyperparameter search scheduling for Ascent.
//!
//! Implements asynchronous successive halving (ASHA) brackets, an adaptive
//! driver that multiplexes several brackets under a shared training budget,
//! and the random sampling used to seed new trials.
//!
//! The searcher is passive and event-driven: the orchestrator calls
//! [`SearchMethod::initial_operations`] once, then reports every completed
//! validation or early exit, and executes the batch of operations each call
//! returns.

mod adaptive;
mod bracket;
mod method;
mod random;
mod rung;
mod sampler;

pub use adaptive::AdaptiveSearch;
pub use bracket::{AshaBracket, EXITED_METRIC};
pub use method::{SearchContext, SearchMethod};
pub use random::RandomSearch;
pub use rung::Rung;
pub use sampler::{RandomSampler, Sampler};
