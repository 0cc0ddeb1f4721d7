//! Integration tests for Layer 3: Engine
//!
//! Tests for the lifecycle pipelines, query dedup, and relation loading.

mod lifecycle;
