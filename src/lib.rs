//! Relay of SMS messages between the HTTP API and the owner's phone.
//!
//! Message status follows a guarded state machine (see [`domain::models::Message`]);
//! every change is announced on the event bus, and delayed dispatch on the bus is
//! the only timer used to detect expired messages.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
