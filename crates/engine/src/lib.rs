//! The round engine: orchestrated collection, threshold evaluation, and
//! decision delivery.
//!
//! - [`sink`] — deduplicating, retrying forwarder from evaluator to store
//! - [`round`] — the [`Engine`](round::Engine) driving one collection round
//!   end to end

pub mod round;
pub mod sink;

pub use round::{DomainOutcome, Engine, RoundSummary};
pub use sink::{Ack, DecisionSink, SinkConfig, SinkStats};
