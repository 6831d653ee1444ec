use chrono::{DateTime, Utc};
use poem_openapi::Object;

use crate::presentation::models::MessageEventKind;

#[derive(Object, Debug)]
pub struct SendMessageRequestDto {
    /// Phone number of the owner's device, in E.164 format.
    #[oai(validator(pattern = r"^\+[1-9][0-9]{1,14}$"))]
    pub from: String,
    #[oai(validator(pattern = r"^\+[1-9][0-9]{1,14}$"))]
    pub to: String,
    #[oai(validator(min_length = 1, max_length = 2048))]
    pub content: String,
}

#[derive(Object, Debug)]
pub struct ReceiveMessageRequestDto {
    #[oai(validator(pattern = r"^\+?[0-9A-Za-z ]{1,32}$"))]
    pub from: String,
    /// Phone number of the owner's device, in E.164 format.
    #[oai(validator(pattern = r"^\+[1-9][0-9]{1,14}$"))]
    pub to: String,
    #[oai(validator(min_length = 1, max_length = 2048))]
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Object, Debug)]
pub struct StoreEventRequestDto {
    pub event_name: MessageEventKind,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Object, Debug)]
pub struct StoreHeartbeatRequestDto {
    #[oai(validator(pattern = r"^\+[1-9][0-9]{1,14}$"))]
    pub owner: String,
    #[oai(default)]
    pub quantity: u32,
}
