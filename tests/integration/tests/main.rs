//! End-to-end integration tests.
//!
//! These tests run the gateway on an ephemeral port against an in-memory
//! directory and exercise it over HTTP.

mod common;
mod health;
mod lifecycle;
mod records;
