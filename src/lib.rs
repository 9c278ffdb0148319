pub mod cli;
pub mod commands;
pub mod config;
pub mod presenter;
pub mod save;
pub mod shell;
pub mod transport;
pub mod wizard;
