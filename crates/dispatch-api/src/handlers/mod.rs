//! API request handlers.

pub mod health;
pub mod hooks;
pub mod webhook;

pub use health::*;
pub use hooks::*;
pub use webhook::*;
