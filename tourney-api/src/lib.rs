//! Wire types shared by the tourney handlers and their callers.
//!
//! The handlers speak a serverless-style event contract: an [`Event`] goes in, an
//! [`EventResponse`] comes out. Request and response bodies are JSON strings whose shapes are
//! defined in [`auth`] and [`tournaments`].
pub mod auth;
pub mod datetime;
pub mod event;
pub mod id;
pub mod payload;
pub mod tournaments;

pub use event::{Event, EventResponse};
pub use payload::{ErrorResponse, PayloadError};
