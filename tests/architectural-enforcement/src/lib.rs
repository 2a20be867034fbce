//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural
//! principles for the switchboard workspace:
//! - No blocking calls inside production async code
//! - The backend client boundary stays the only suspension point
//!
//! These tests are designed to catch violations early in the development
//! cycle.

#![allow(dead_code)]

pub fn placeholder() {
    // Placeholder to make this a valid library
}
