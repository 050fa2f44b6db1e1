//! Task dependency service library.
//!
//! Guards a directed precedence graph over tasks: edge creation is validated
//! against cycles, edges are soft-deleted, and chain/eligibility queries are
//! answered from the live edge set.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod http;
pub mod types;
