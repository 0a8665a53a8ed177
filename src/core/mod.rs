// src/core/mod.rs

pub mod net;
pub mod sanitize;
pub mod text;

pub use net::{Fetch, HttpFetcher};
pub use sanitize::{sanitize, sanitize_str, RawValue};
