// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod record;
pub mod specs;

pub mod csv;
pub mod file;
pub mod publish;
pub mod runner;
pub mod schedule;
pub mod sink;
