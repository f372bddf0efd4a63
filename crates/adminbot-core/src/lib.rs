//! Core domain + application logic for the admin bot.
//!
//! This crate is framework-agnostic. Telegram lives behind the messaging port
//! implemented in `adminbot-telegram`; the polling loop behind [`lifecycle::ServingLoop`].

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod lifecycle;
pub mod logging;
pub mod messaging;
pub mod restart;
pub mod security;
pub mod update;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
