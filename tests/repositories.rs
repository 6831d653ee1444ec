mod common;

use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use common::{CONTACT, OWNER};
use sms_gateway::{
    domain::{
        models::{Message, MessageStatus},
        repositories::{IndexParams, MessageRepository},
    },
    infrastructure::repositories::in_memory::InMemoryMessageRepository,
};

fn message(user_id: Uuid, content: &str, minutes_ago: i64) -> Message {
    Message::outbound(
        Uuid::new_v4(),
        user_id,
        OWNER.to_string(),
        CONTACT.to_string(),
        content.to_string(),
        Utc::now() - TimeDelta::minutes(minutes_ago),
    )
}

#[tokio::test]
async fn store_rejects_duplicate_ids() {
    let repository = InMemoryMessageRepository::new();
    let message = message(Uuid::new_v4(), "hi", 0);

    repository.store(&message).await.unwrap();
    let err = repository.store(&message).await.expect_err("id is taken");

    assert!(err.is_permanent());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn update_requires_an_existing_record() {
    let repository = InMemoryMessageRepository::new();
    let message = message(Uuid::new_v4(), "hi", 0);

    let err = repository.update(&message).await.expect_err("nothing to update");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn load_is_scoped_to_the_tenant() {
    let repository = InMemoryMessageRepository::new();
    let message = message(Uuid::new_v4(), "hi", 0);
    repository.store(&message).await.unwrap();

    assert_eq!(repository.load(message.user_id, message.id).await.unwrap(), message);
    let err = repository
        .load(Uuid::new_v4(), message.id)
        .await
        .expect_err("another tenant");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn index_filters_and_orders_by_activity() {
    let repository = InMemoryMessageRepository::new();
    let user_id = Uuid::new_v4();

    let oldest = message(user_id, "Lunch tomorrow?", 30);
    let middle = message(user_id, "Running late", 20);
    let newest = message(user_id, "lunch is on me", 10);
    let elsewhere = Message::outbound(
        Uuid::new_v4(),
        user_id,
        OWNER.to_string(),
        "+18005550111".to_string(),
        "lunch".to_string(),
        Utc::now(),
    );
    for m in [&oldest, &middle, &newest, &elsewhere] {
        repository.store(m).await.unwrap();
    }

    let all = repository
        .index(user_id, OWNER, CONTACT, &IndexParams::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = all.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

    let lunch = repository
        .index(
            user_id,
            OWNER,
            CONTACT,
            &IndexParams::new(None, None, Some("LUNCH".to_string())),
        )
        .await
        .unwrap();
    let ids: Vec<Uuid> = lunch.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![newest.id, oldest.id]);

    let page = repository
        .index(user_id, OWNER, CONTACT, &IndexParams::new(Some(1), Some(1), None))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, middle.id);
}

#[tokio::test]
async fn outstanding_claims_only_unresolved_messages() {
    let repository = InMemoryMessageRepository::new();
    let pending = message(Uuid::new_v4(), "hi", 0);
    repository.store(&pending).await.unwrap();

    let claimed = repository.get_outstanding(pending.user_id, pending.id).await.unwrap();
    assert_eq!(claimed.status(), MessageStatus::Sending);
    assert_eq!(
        repository.load(pending.user_id, pending.id).await.unwrap(),
        claimed
    );

    let sent = claimed.mark_sent(Utc::now()).unwrap();
    repository.update(&sent).await.unwrap();
    let err = repository
        .get_outstanding(pending.user_id, pending.id)
        .await
        .expect_err("sent messages are not outstanding");
    assert!(err.is_not_found());
    assert_eq!(repository.load(pending.user_id, pending.id).await.unwrap(), sent);
}

#[tokio::test]
async fn stale_snapshot_does_not_overwrite_a_newer_status() {
    let repository = InMemoryMessageRepository::new();
    let pending = message(Uuid::new_v4(), "hi", 0);
    repository.store(&pending).await.unwrap();
    repository.get_outstanding(pending.user_id, pending.id).await.unwrap();

    // two handlers load the same sending message
    let seen_by_worker = repository.load(pending.user_id, pending.id).await.unwrap();
    let seen_by_phone = repository.load(pending.user_id, pending.id).await.unwrap();

    let sent = seen_by_phone.mark_sent(Utc::now()).unwrap();
    repository.update(&sent).await.unwrap();

    let attempt = seen_by_worker.register_send_attempt(Utc::now()).unwrap();
    let err = repository
        .update(&attempt)
        .await
        .expect_err("the stored message moved on");

    assert!(err.is_conflict());
    assert!(!err.is_permanent());
    let stored = repository.load(pending.user_id, pending.id).await.unwrap();
    assert_eq!(stored.status(), MessageStatus::Sent);
    assert_eq!(stored, sent);
}

#[tokio::test]
async fn update_applies_consecutive_transitions() {
    let repository = InMemoryMessageRepository::new();
    let pending = message(Uuid::new_v4(), "hi", 0);
    repository.store(&pending).await.unwrap();

    let failed = pending.mark_failed(Utc::now(), None).unwrap();
    repository.update(&failed).await.unwrap();
    let failed_again = failed.mark_failed(Utc::now(), Some("radio off")).unwrap();
    repository.update(&failed_again).await.unwrap();

    let stored = repository.load(pending.user_id, pending.id).await.unwrap();
    assert_eq!(stored.version(), 2);
    assert_eq!(stored.error_message.as_deref(), Some("radio off"));
}

#[tokio::test]
async fn query_matches_literal_text() {
    let repository = InMemoryMessageRepository::new();
    let user_id = Uuid::new_v4();
    let discount = message(user_id, "50% off today", 2);
    let plain = message(user_id, "500 points left", 1);
    let underscore = message(user_id, "file_name.txt", 0);
    for m in [&discount, &plain, &underscore] {
        repository.store(m).await.unwrap();
    }

    let search = |query: &str| IndexParams::new(None, None, Some(query.to_string()));

    let percent = repository
        .index(user_id, OWNER, CONTACT, &search("50%"))
        .await
        .unwrap();
    assert_eq!(percent.iter().map(|m| m.id).collect::<Vec<_>>(), vec![discount.id]);

    let wildcard = repository
        .index(user_id, OWNER, CONTACT, &search("e_n"))
        .await
        .unwrap();
    assert_eq!(wildcard.iter().map(|m| m.id).collect::<Vec<_>>(), vec![underscore.id]);
}

#[test]
fn index_params_are_clamped() {
    let params = IndexParams::new(None, Some(10_000), Some("   ".to_string()));

    assert_eq!(params.skip, 0);
    assert_eq!(params.limit, IndexParams::MAX_LIMIT);
    assert_eq!(params.query, None);
    assert_eq!(IndexParams::new(None, None, None).limit, 50);
}
