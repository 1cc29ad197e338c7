//! Test helper utilities shared by the elisio-ui integration tests

#![allow(dead_code)]

pub mod mock_server;

pub use mock_server::{MockServer, RecordedRequest, MOCK_CSRF_TOKEN};
