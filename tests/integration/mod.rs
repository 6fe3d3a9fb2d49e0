//! Integration Tests Module
//!
//! End-to-end tests for the reasoning loop, the cross-source merge and the
//! audit pipeline. Backends are replaced by a scripted provider.

// Scripted backend shared by the suites below
mod support;

// Reasoning loop: rounds, fallback, threshold, merge-by-similarity
mod engine_test;

// Rule-based / loop finding reconciliation
mod merge_test;

// Full audit runs over files on disk
mod pipeline_test;
