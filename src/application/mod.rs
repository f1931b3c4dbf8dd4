//! Application layer: the two pipeline stages.
//!
//! `ingest` authenticates, decodes and stores inbound webhooks. `processor` reacts to the
//! store's change feed and moves round-ups into the savings goal.

pub mod ingest;
pub mod processor;
pub mod signature;
