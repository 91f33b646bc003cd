//! Cross-cutting concerns: configuration, errors, time source and the show journal.

pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
