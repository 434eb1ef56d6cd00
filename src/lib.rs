//! Match free-text symptom descriptions against a disease catalog by
//! embedding similarity.
//!
//! - `catalog`: the disease table and its precomputed embedding matrix
//! - `embed`: the text-to-vector capability and cosine similarity
//! - `search`: query normalization, ranking and the shared `Diagnoser`
//! - `server`: the HTTP surface

pub mod catalog;
pub mod config;
pub mod embed;
pub mod search;
pub mod server;
