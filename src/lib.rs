//! church-books keeps a church's financial records: offerings and other income, members' tithes
//! and expenses. It summarizes them for a dashboard and asks a text-generation model for
//! quarterly reports and trend analyses.

pub mod aggregate;
pub mod api;
pub mod args;
pub mod commands;
mod config;
pub mod currency;
mod db;
mod error;
pub mod model;
pub mod report;
mod utils;

#[cfg(test)]
mod test;

pub use config::{Backend, Config, GeneratorSettings, InitOptions, StoreSettings};
pub use error::{error_type, Error, ErrorType, IntoResult, Result};
