//! Taco Bell API module
//!
//! Contains query/record types, response narrowing, and the client for the
//! Taco Bell web services.

pub mod client;
pub mod menu;
pub mod stores;
pub mod types;
