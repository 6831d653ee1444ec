use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::infrastructure::messaging::jetstream::JetstreamConfig;

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: Option<String>,
    pub jetstream: JetstreamConfig,
    pub jwt_secret: String,
    pub jwt_expiration: Duration,
    pub event_source: String,
    pub message_expiration: Duration,
    pub log_level: String,
}

impl Config {
    pub fn try_parse() -> Result<Config, &'static str> {
        let _ = dotenv();

        Ok(Config {
            port: var("PORT")
                .map_err(|_| "An error occured while getting PORT env param")?
                .parse::<u16>()
                .map_err(|_| "An error occured while parsing PORT env param")?,
            scheme: var("SCHEME").map_err(|_| "An error occured while getting SCHEME env param")?,
            host: var("HOST").map_err(|_| "An error occured while getting HOST env param")?,
            database_url: var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jetstream: JetstreamConfig {
                url: var_or("NATS_URL", "nats://localhost:4222"),
                stream: var_or("NATS_STREAM", "SMS_EVENTS"),
                subject: var_or("NATS_SUBJECT", "sms.events"),
                durable: var_or("NATS_DURABLE", "sms-gateway"),
                pull_batch: parse_or("NATS_PULL_BATCH", 10)
                    .map_err(|_| "An error occured while parsing NATS_PULL_BATCH env param")?,
                ack_wait_seconds: parse_or("NATS_ACK_WAIT_SECONDS", 30)
                    .map_err(|_| "An error occured while parsing NATS_ACK_WAIT_SECONDS env param")?,
                max_deliver: parse_or("NATS_MAX_DELIVER", 10)
                    .map_err(|_| "An error occured while parsing NATS_MAX_DELIVER env param")?,
            },
            jwt_secret: var("JWT_SECRET")
                .map_err(|_| "An error occured while getting JWT_SECRET env param")?,
            jwt_expiration: Duration::from_secs(
                parse_or("JWT_EXPIRATION_SECONDS", 86_400).map_err(|_| {
                    "An error occured while parsing JWT_EXPIRATION_SECONDS env param"
                })?,
            ),
            event_source: var_or("EVENT_SOURCE", "sms-gateway"),
            message_expiration: Duration::from_secs(
                parse_or("MESSAGE_EXPIRATION_SECONDS", 600).map_err(|_| {
                    "An error occured while parsing MESSAGE_EXPIRATION_SECONDS env param"
                })?,
            ),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match var(name) {
        Ok(value) => value.parse::<T>(),
        Err(_) => Ok(default),
    }
}
