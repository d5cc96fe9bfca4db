// src/lib.rs

pub mod config;
pub mod db;
pub mod repositories;
pub mod upstream;
pub mod services;

pub use config::AppConfig;
pub use db::Database;
pub use voucherbot_common::error::Error;
