//! JSON-RPC 2.0 framing for the `answer` operation, over stdio and
//! (optionally) HTTP.

#[cfg(feature = "http")]
pub mod http;
pub mod stdio;
pub mod types;
