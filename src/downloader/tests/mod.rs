//! Integration-style tests for the pipeline state machine and the batch
//! orchestrator, driven through the MediaDownloader facade over mocks.

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]
