//! Tiny Llama API
//!
//! Serves a locally hosted language model over HTTP: model status reporting
//! and bounded text generation.

pub mod api;
pub mod app;
pub mod i18n;
pub mod inference;
pub mod storage;
pub mod types;
