//! Shared test utilities for filevault integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an on-disk SQLite store, an in-memory queue and a
//!   `FileLibrary` inside a temp directory
//! - `RecordingStore`, a result store wrapper that logs lookup order

pub mod harness;

pub use harness::{RecordingStore, TestHarness};
