//! # DenseEdia
//!
//! The application layer of the DenseEdia knowledge base: the HTTP API,
//! the command-line interface and their shared configuration. All store
//! semantics live in `denseedia-core`.

pub mod api;
pub mod cli;
pub mod config;
