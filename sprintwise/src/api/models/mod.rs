//! API request and response data models.
//!
//! These define the public wire contract. Field names are camelCase on the wire to match what
//! the web client sends.

pub mod generation;
pub mod health;
pub mod uploads;
