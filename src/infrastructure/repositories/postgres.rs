use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use sqlx::{Pool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Heartbeat, Message, MessageStatus, MessageType},
    repositories::{HeartbeatRepository, IndexParams, MessageRepository},
};

pub type PgPool = Pool<Postgres>;

const MESSAGE_COLUMNS: &str = r#"
    id, user_id, owner, contact, content, message_type, status,
    request_received_at, created_at, updated_at, order_timestamp,
    last_attempted_at, sent_at, received_at, send_duration_ns, error_message, version
"#;

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn store(&self, message: &Message) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, user_id, owner, contact, content, message_type, status,
                request_received_at, created_at, updated_at, order_timestamp,
                last_attempted_at, sent_at, received_at, send_duration_ns, error_message,
                version
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            "#,
        )
        .bind(message.id)
        .bind(message.user_id)
        .bind(&message.owner)
        .bind(&message.contact)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.status().as_str())
        .bind(message.request_received_at)
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(message.order_timestamp)
        .bind(message.last_attempted_at)
        .bind(message.sent_at)
        .bind(message.received_at)
        .bind(message.send_duration.and_then(|d| d.num_nanoseconds()))
        .bind(&message.error_message)
        .bind(message.version())
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::AlreadyExists(format!("message [{}]", message.id))
            }
            other => storage_error(other),
        })?;
        Ok(())
    }

    async fn update(&self, message: &Message) -> Result<(), DomainError> {
        // only the write derived from the stored version wins
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = $3,
                updated_at = $4,
                order_timestamp = $5,
                last_attempted_at = $6,
                sent_at = $7,
                received_at = $8,
                send_duration_ns = $9,
                error_message = $10,
                version = $11
            WHERE user_id = $1 AND id = $2 AND version = $11 - 1
            "#,
        )
        .bind(message.user_id)
        .bind(message.id)
        .bind(message.status().as_str())
        .bind(message.updated_at)
        .bind(message.order_timestamp)
        .bind(message.last_attempted_at)
        .bind(message.sent_at)
        .bind(message.received_at)
        .bind(message.send_duration.and_then(|d| d.num_nanoseconds()))
        .bind(&message.error_message)
        .bind(message.version())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM messages WHERE user_id = $1 AND id = $2)",
        )
        .bind(message.user_id)
        .bind(message.id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        if exists {
            Err(DomainError::Conflict(format!(
                "message [{}] changed after version {} was loaded",
                message.id,
                message.version() - 1
            )))
        } else {
            Err(not_found(message.user_id, message.id))
        }
    }

    async fn load(&self, user_id: Uuid, message_id: Uuid) -> Result<Message, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found(user_id, message_id))?;

        Message::try_from(row).map_err(DomainError::Repository)
    }

    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        contact: &str,
        params: &IndexParams,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE user_id = $1
              AND owner = $2
              AND contact = $3
              AND ($4::text IS NULL OR strpos(lower(content), lower($4)) > 0)
            ORDER BY order_timestamp DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(user_id)
        .bind(owner)
        .bind(contact)
        .bind(&params.query)
        .bind(params.limit as i64)
        .bind(params.skip as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter()
            .map(|row| Message::try_from(row).map_err(DomainError::Repository))
            .collect()
    }

    async fn get_outstanding(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, DomainError> {
        // claiming happens in one statement so concurrent pollers can not both win
        let row = sqlx::query(&format!(
            r#"
            UPDATE messages
            SET status = 'sending',
                updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond'),
                version = version + 1
            WHERE user_id = $1
              AND id = $2
              AND status IN ('pending', 'sending')
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(message_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found(user_id, message_id))?;

        Message::try_from(row).map_err(DomainError::Repository)
    }
}

#[derive(Clone)]
pub struct PostgresHeartbeatRepository {
    pool: PgPool,
}

impl PostgresHeartbeatRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl HeartbeatRepository for PostgresHeartbeatRepository {
    async fn store(&self, heartbeat: &Heartbeat) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO heartbeats (id, user_id, owner, timestamp, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(heartbeat.id)
        .bind(heartbeat.user_id)
        .bind(&heartbeat.owner)
        .bind(heartbeat.timestamp)
        .bind(heartbeat.quantity as i32)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        params: &IndexParams,
    ) -> Result<Vec<Heartbeat>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, owner, timestamp, quantity
            FROM heartbeats
            WHERE user_id = $1 AND owner = $2
            ORDER BY timestamp DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(owner)
        .bind(params.limit as i64)
        .bind(params.skip as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(Heartbeat {
                    id: row.try_get("id").map_err(storage_error)?,
                    user_id: row.try_get("user_id").map_err(storage_error)?,
                    owner: row.try_get("owner").map_err(storage_error)?,
                    timestamp: row.try_get("timestamp").map_err(storage_error)?,
                    quantity: row.try_get::<i32, _>("quantity").map_err(storage_error)? as u32,
                })
            })
            .collect()
    }
}

impl TryFrom<PgRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        let type_str: String = row.try_get("message_type")?;
        let message_type = MessageType::from_str(&type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown message type {type_str}"))?;
        let status_str: String = row.try_get("status")?;
        let status = MessageStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown message status {status_str}"))?;
        let send_duration: Option<i64> = row.try_get("send_duration_ns")?;

        Ok(Message {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            owner: row.try_get("owner")?,
            contact: row.try_get("contact")?,
            content: row.try_get("content")?,
            message_type,
            status,
            request_received_at: row.try_get("request_received_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            order_timestamp: row.try_get("order_timestamp")?,
            last_attempted_at: row.try_get("last_attempted_at")?,
            sent_at: row.try_get("sent_at")?,
            received_at: row.try_get("received_at")?,
            send_duration: send_duration.map(TimeDelta::nanoseconds),
            error_message: row.try_get("error_message")?,
            version: row.try_get("version")?,
        })
    }
}

fn not_found(user_id: Uuid, message_id: Uuid) -> DomainError {
    DomainError::NotFound(format!("message [{message_id}] of user [{user_id}]"))
}

fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::Repository(err.into())
}
