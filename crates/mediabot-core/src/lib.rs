pub mod access;
pub mod commands;
pub mod config;
pub mod control;
pub mod errors;
pub mod mode;
pub mod platform;
pub mod player;
pub mod processor;
pub mod services;
pub mod stations;
pub mod streamer;
pub mod track;
pub mod translator;
pub mod transport;
pub mod workers;

pub use errors::{Error, Result};
