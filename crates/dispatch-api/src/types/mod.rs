//! Request and response types.

pub mod responses;
pub mod webhook;

pub use responses::*;
pub use webhook::*;
