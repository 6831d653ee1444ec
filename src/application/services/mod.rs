pub mod event_bus;
pub mod expiration;
pub mod heartbeats;
pub mod jwt;
pub mod messages;
