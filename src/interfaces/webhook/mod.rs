//! Inbound webhook decoding.

pub mod parser;
pub mod schema;

pub use parser::PayloadParser;
