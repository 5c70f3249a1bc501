//! Shared helpers for integration tests. Each test binary uses a subset.
#![allow(dead_code)]

pub mod fakes;
pub mod stub_server;
