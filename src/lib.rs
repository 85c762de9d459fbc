//! Client for the admin console's assistant chat API.
//!
//! The core is [`chat`]: one chat request streamed back either over a GET
//! event stream or, for long messages, over a POST with a newline-delimited
//! JSON body. [`api`] wraps the surrounding REST endpoints.

pub mod api;
pub mod app;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod config;
pub mod ndjson;
pub mod notify;
pub mod sse;
