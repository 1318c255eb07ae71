//! Error types for the search adapter.
//!
//! This module provides a unified error type for all adapter operations.

mod search_adapter_error;

pub use search_adapter_error::SearchAdapterError;
