pub mod http;
pub mod models;
