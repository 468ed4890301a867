//! Route handlers.

pub mod stats;
pub mod tag;
pub mod ws;
