//! CLI commands

pub mod apply;
pub mod delete;
pub mod health;
pub mod namespace;
pub mod nodes;
pub mod releases;
pub mod sources;
pub mod status;
pub mod suspend;
pub mod wait;
