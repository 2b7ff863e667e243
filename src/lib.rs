pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
