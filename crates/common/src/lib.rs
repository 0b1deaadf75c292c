//! Shared types, errors, configuration and infrastructure for Herald.

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod redis_pool;
pub mod types;
