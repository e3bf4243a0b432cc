//! Taco Bell MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing Taco Bell store search and
//! menu lookup as tools.

pub mod config;
pub mod error;
pub mod mcp;
pub mod tacobell;

pub use config::Config;
pub use error::{Result, TacoBellMcpError};
