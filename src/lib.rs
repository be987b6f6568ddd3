//! myprofiler - top for MySQL queries
//!
//! Repeatedly samples the statements a server is executing, strips their
//! literals, and keeps a ranked frequency summary of the resulting shapes.
//! No agent, no persistent storage: one server, one process, in memory.

pub mod cli;
pub mod config;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reporters;
pub mod source;
pub mod summary;
