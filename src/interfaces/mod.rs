pub mod http;
pub mod starling;
pub mod webhook;
