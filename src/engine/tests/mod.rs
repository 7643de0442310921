//! Tests for the execution engine
//!
//! Organized by feature area

mod capability_tests;
mod control_tests;
mod error_tests;
mod helpers;
