//! Observability utilities.

pub mod logging;
