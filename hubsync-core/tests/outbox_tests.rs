mod support;

use hubsync_core::outbox::ActionQueue;
use hubsync_core::types::*;
use std::sync::atomic::Ordering;
use support::*;

fn company_event(id: &str) -> ActionEvent {
    ActionEvent {
        action_name: "Company Created".into(),
        action_date: ts(100),
        include_in_analytics: false,
        identity: None,
        properties: EventProperties::Company(CompanyProperties {
            company_id: id.into(),
            company_domain: None,
            company_industry: None,
        }),
    }
}

#[test]
fn push_only_buffers() {
    let mut queue = ActionQueue::new();
    queue.push(company_event("1"));
    queue.push(company_event("2"));
    queue.push(company_event("3"));

    assert_eq!(queue.pending_count(), 3);
    assert_eq!(queue.pending()[2], company_event("3"));
}

#[test]
fn take_pending_resets_buffer() {
    let mut queue = ActionQueue::new();
    queue.push(company_event("1"));

    let taken = queue.take_pending();
    assert_eq!(taken.len(), 1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn drain_submits_one_batch_in_order() {
    let sink = RecordingSink::new();
    let mut queue = ActionQueue::new();
    for id in ["a", "b", "c"] {
        queue.push(company_event(id));
    }

    let delivered = queue.drain(sink.as_ref(), "key-1").await.unwrap();

    assert_eq!(delivered, 3);
    assert!(queue.is_empty());
    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, "key-1");
    assert_eq!(batches[0].1, vec![company_event("a"), company_event("b"), company_event("c")]);
}

#[tokio::test]
async fn empty_queue_is_not_submitted() {
    let sink = RecordingSink::new();
    let mut queue = ActionQueue::new();

    assert_eq!(queue.drain(sink.as_ref(), "key-1").await.unwrap(), 0);
    assert_eq!(sink.submit_count(), 0);
}

#[tokio::test]
async fn second_drain_sends_nothing() {
    let sink = RecordingSink::new();
    let mut queue = ActionQueue::new();
    queue.push(company_event("1"));

    queue.drain(sink.as_ref(), "key-1").await.unwrap();
    queue.drain(sink.as_ref(), "key-1").await.unwrap();

    assert_eq!(sink.submit_count(), 1);
}

#[tokio::test]
async fn rejected_batch_stays_queued() {
    let sink = RecordingSink::new();
    sink.reject.store(true, Ordering::SeqCst);
    let mut queue = ActionQueue::new();
    queue.push(company_event("a"));
    queue.push(company_event("b"));

    assert!(queue.drain(sink.as_ref(), "key-1").await.is_err());
    assert_eq!(queue.pending_count(), 2);

    sink.reject.store(false, Ordering::SeqCst);
    assert_eq!(queue.drain(sink.as_ref(), "key-1").await.unwrap(), 2);
    assert!(queue.is_empty());
}
