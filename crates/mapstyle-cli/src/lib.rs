//! CLI library components for the mapstyle composer.

pub mod commands;
pub mod logging;
pub mod render;
