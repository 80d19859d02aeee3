pub mod classify;
pub mod columns;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod details;
pub mod error;
pub mod extract;
pub mod feature;
pub mod scope;
pub mod server;
pub mod stats;
pub mod types;
