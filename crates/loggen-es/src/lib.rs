//! Elasticsearch bulk delivery for generated events.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

pub mod client;

pub use client::{ElasticConfig, ElasticSink};
