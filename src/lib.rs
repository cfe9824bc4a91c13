pub mod agent;
pub mod auth;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
