//! Runtime execution modes.
//!
//! - `exec`: one free-mode request, reply on stdout
//! - `repl`: line-based interactive practice for free and scenario modes

pub mod exec;
pub mod repl;
mod transport;
