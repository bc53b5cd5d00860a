//! CLI library components for the abstinence calculator.

pub mod logging;
