pub mod config;
pub mod files;
pub mod history;
pub mod repo;
