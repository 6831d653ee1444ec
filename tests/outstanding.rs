mod common;

use chrono::Utc;
use uuid::Uuid;

use common::{Harness, SOURCE};
use sms_gateway::{
    application::services::messages::GetOutstandingParams,
    domain::{
        events::{EventPayload, EventType},
        models::{Message, MessageStatus},
    },
};

fn outstanding(message: &Message) -> GetOutstandingParams {
    GetOutstandingParams {
        user_id: message.user_id,
        message_id: message.id,
        timestamp: Utc::now(),
        source: SOURCE.to_string(),
    }
}

#[tokio::test]
async fn pending_message_is_claimed_and_announced() {
    let harness = Harness::new();
    let message = harness.message_with_status(MessageStatus::Pending).await;
    let params = outstanding(&message);
    let timestamp = params.timestamp;

    let claimed = harness.messages.get_outstanding(params).await.unwrap();
    assert_eq!(claimed.status(), MessageStatus::Sending);
    assert!(claimed.updated_at > message.updated_at);
    assert_eq!(harness.load(&message).await, claimed);

    let dispatched = harness.dispatcher.of_type(EventType::MessagePhoneSending);
    assert_eq!(dispatched.len(), 1);
    match dispatched[0].event.payload().unwrap() {
        EventPayload::MessagePhoneSending(payload) => {
            assert_eq!(payload.id, message.id);
            assert_eq!(payload.timestamp, timestamp);
            assert_eq!(payload.content, message.content);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn sending_message_can_be_polled_again() {
    let harness = Harness::new();
    let message = harness.message_with_status(MessageStatus::Sending).await;

    let claimed = harness.messages.get_outstanding(outstanding(&message)).await.unwrap();
    assert_eq!(claimed.status(), MessageStatus::Sending);
    assert_eq!(harness.dispatcher.count(), 1);
}

#[tokio::test]
async fn resolved_or_unknown_messages_are_not_outstanding() {
    let harness = Harness::new();

    for status in [MessageStatus::Sent, MessageStatus::Delivered, MessageStatus::Failed] {
        let message = harness.message_with_status(status).await;
        let err = harness
            .messages
            .get_outstanding(outstanding(&message))
            .await
            .expect_err("resolved messages are not outstanding");
        assert!(err.is_not_found(), "status {status}");
        assert_eq!(harness.load(&message).await, message);
    }

    let err = harness
        .messages
        .get_outstanding(GetOutstandingParams {
            user_id: harness.user_id,
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: SOURCE.to_string(),
        })
        .await
        .expect_err("unknown message");
    assert!(err.is_not_found());
    assert_eq!(harness.dispatcher.count(), 0);
}

#[tokio::test]
async fn failed_notification_is_reported() {
    let harness = Harness::new();
    let message = harness.message_with_status(MessageStatus::Pending).await;
    harness.dispatcher.set_failing(true);

    let err = harness
        .messages
        .get_outstanding(outstanding(&message))
        .await
        .expect_err("the phone was not notified");
    assert!(!err.is_permanent());
    assert_eq!(harness.dispatcher.count(), 0);
}
