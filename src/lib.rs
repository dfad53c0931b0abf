pub mod cli;
pub mod config;
pub mod db;
pub mod filter;
pub mod model;
pub mod report;
pub mod service;
pub mod stats;
