//! Shared test utilities for the tds-ogc-scan workspace.
//!
//! This crate provides common testing infrastructure including:
//! - THREDDS catalogue and OGC response XML fixtures
//! - An in-process HTTP stub server that records every request
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, StubServer};
//! ```

pub mod fixtures;
pub mod stub_server;

pub use stub_server::{StubResponse, StubServer};

/// Assert that a probe counter has the expected `(attempted, succeeded)` pair.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_counter;
///
/// assert_counter!(stats.wms_get_capabilities, (2, 2));
/// ```
#[macro_export]
macro_rules! assert_counter {
    ($counter:expr, ($attempted:expr, $succeeded:expr)) => {{
        let counter = &$counter;
        if counter.attempted != $attempted || counter.succeeded != $succeeded {
            panic!(
                "assertion failed: `{}` is ({}, {}), expected ({}, {})",
                stringify!($counter),
                counter.attempted,
                counter.succeeded,
                $attempted,
                $succeeded
            );
        }
    }};
}
