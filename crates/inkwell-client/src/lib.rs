//! Client for the inkwell API and the generate → read → save workflow built
//! on it.

pub mod client;
pub mod error;
pub mod studio;

pub use client::{GenerationConsumer, InkwellClient};
pub use error::ClientError;
pub use studio::{SaveOptions, SaveOutcome, Studio};
