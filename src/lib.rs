//! Promptlab - Analysis core for LLM prompt experiments.
//!
//! This crate implements the pluggable analysis-module subsystem used to
//! evaluate prompt test runs: a registry of analysis modules, an execution
//! service with a bounded worker pool, and the built-in latency/tokens
//! performance module.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
