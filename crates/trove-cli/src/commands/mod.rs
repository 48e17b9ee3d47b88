//! Command handlers, one module per command group

pub mod book;
pub mod check;
pub mod config;
pub mod import;
pub mod series;
pub mod status;
pub mod tags;
