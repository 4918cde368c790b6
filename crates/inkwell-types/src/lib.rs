//! Types shared by the Inkwell server, client and storage crates.

pub mod api;
pub mod generation;
pub mod models;
