//! AI Dispatch binary support.
//!
//! Command-line parsing, process wiring and chat notifications for the
//! `ai-dispatch` executable.

pub mod app;
pub mod cli;
pub mod notify;
