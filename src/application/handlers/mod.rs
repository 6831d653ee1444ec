pub mod message_listener;
