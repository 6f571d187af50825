pub mod build;
pub mod config;
pub mod index;
pub mod layout;
pub mod listener;
pub mod metadata;
pub mod policies;
pub mod repository;
pub mod scanner;

/// Test utilities for unit and integration testing.
/// Only available with cfg(test) or feature "testing".
#[cfg(any(test, feature = "testing"))]
pub mod testing;
