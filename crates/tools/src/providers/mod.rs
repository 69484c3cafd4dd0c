//! Built-in in-process tool providers.
//!
//! These cover local development and tests without any external MCP
//! processes: a key-value memory server and a deterministic web-search
//! stub. Real deployments register external providers alongside or
//! instead of these.

pub mod memory_store;
pub mod web_search;
