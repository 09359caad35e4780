//! Shared test infrastructure for snmp-bridge.
//!
//! Provides a scripted engine and an in-process bridge on loopback.

// Allow dead code and unused imports since not all test files use all utilities
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod bridge;
pub mod engine;

pub use bridge::TestBridge;
pub use engine::{Action, Call, ScriptedEngine, payload};

/// Address of the simulated manager used by mock-socket tests.
pub const MANAGER: &str = "10.0.0.5:40000";
