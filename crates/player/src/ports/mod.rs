//! Port traits for external dependencies.

pub mod outbound;
