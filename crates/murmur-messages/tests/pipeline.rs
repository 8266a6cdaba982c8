//! Processor dispatch: drops, batching and undo

use assert_matches::assert_matches;
use murmur_core::{
    Authentication, Destination, Distribution, PolicySet, Resolution, SuspensionConfig,
};
use murmur_messages::{
    AuthenticationValue, BatchConfiguration, Community, DestinationValue, DistributionValue,
    EffectiveResolution, MessageCallbacks, MessageDefinition, MessageError, MessageInstance,
    MessageProcessor, PolicyValues, ResolutionValue, Verdict,
};
use murmur_testkit::{
    accept_all, candidate, member, test_community, vote_definition, vote_message, vote_policies,
    ManualScheduler, MemoryStore, RecordingSink,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn processor(community: &Arc<Community>, scheduler: &Arc<ManualScheduler>) -> Arc<MessageProcessor> {
    murmur_testkit::init_test_tracing();
    MessageProcessor::new(
        community.clone(),
        scheduler.clone(),
        Arc::new(RecordingSink::new()),
        SuspensionConfig::default(),
    )
}

/// Callbacks recording each apply call as the list of global times it got.
fn recording(log: &Arc<Mutex<Vec<(String, Vec<u64>)>>>, label: &str) -> MessageCallbacks {
    let log = log.clone();
    let label = label.to_string();
    MessageCallbacks::new(
        |message| {
            if message.payload() == b"spam" {
                Verdict::reject("spam")
            } else {
                Verdict::Proceed
            }
        },
        move |messages| {
            let times = messages
                .iter()
                .filter_map(|m| m.distribution().global_time())
                .collect();
            log.lock().push((label.clone(), times));
        },
    )
}

fn bytes(community: &Community, definition: &Arc<MessageDefinition>, global_time: u64) -> Vec<u8> {
    vote_message(community, definition, global_time)
        .packet()
        .unwrap()
        .to_vec()
}

#[test]
fn test_unbatched_messages_apply_immediately() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let vote = vote_definition(&community, recording(&log, "vote"));
    let processor = processor(&community, &scheduler);

    processor.handle_packets(vec![
        (candidate(2), bytes(&community, &vote, 1)),
        (candidate(3), bytes(&community, &vote, 2)),
    ]);

    assert_eq!(*log.lock(), vec![("vote".to_string(), vec![1, 2])]);
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(processor.stats().applied, 2);
}

#[test]
fn test_drops_are_counted_not_applied() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let vote = vote_definition(&community, recording(&log, "vote"));
    let processor = processor(&community, &scheduler);

    let spam = MessageInstance::from_values(
        &community,
        vote.clone(),
        murmur_testkit::vote_values(member(7), 3),
        b"spam".to_vec(),
        None,
    )
    .unwrap();
    processor.handle_packets(vec![
        (candidate(2), spam.packet().unwrap().to_vec()),
        (candidate(2), vec![0xEE; 3]),
        (candidate(2), bytes(&community, &vote, 4)),
    ]);

    let stats = processor.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.applied, 1);
    assert_eq!(*log.lock(), vec![("vote".to_string(), vec![4])]);
}

#[test]
fn test_batch_waits_for_window() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let batch = BatchConfiguration::new(Duration::from_millis(500), 128, 10, Duration::from_secs(60)).unwrap();
    let vote = MessageDefinition::new(&community, "vote", vote_policies(), recording(&log, "vote"), Some(batch)).unwrap();
    let processor = processor(&community, &scheduler);

    processor.handle_packets(vec![(candidate(2), bytes(&community, &vote, 1))]);
    processor.handle_packets(vec![(candidate(3), bytes(&community, &vote, 2))]);
    assert!(log.lock().is_empty());

    scheduler.advance(Duration::from_millis(499));
    assert!(log.lock().is_empty());

    scheduler.advance(Duration::from_millis(1));
    assert_eq!(*log.lock(), vec![("vote".to_string(), vec![1, 2])]);
}

#[test]
fn test_full_batch_applies_early() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let batch = BatchConfiguration::new(Duration::from_secs(1), 128, 2, Duration::from_secs(60)).unwrap();
    let vote = MessageDefinition::new(&community, "vote", vote_policies(), recording(&log, "vote"), Some(batch)).unwrap();
    let processor = processor(&community, &scheduler);

    processor.handle_packets(
        (1..=3)
            .map(|t| (candidate(2), bytes(&community, &vote, t)))
            .collect(),
    );
    assert_eq!(*log.lock(), vec![("vote".to_string(), vec![1, 2])]);

    // First batch's timer is stale; the second batch flushes on its own
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(log.lock().len(), 2);
    assert_eq!(log.lock()[1], ("vote".to_string(), vec![3]));
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_flush_runs_higher_priority_first() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let low = BatchConfiguration::new(Duration::from_secs(1), 10, 100, Duration::from_secs(60)).unwrap();
    let high = BatchConfiguration::new(Duration::from_secs(1), 200, 100, Duration::from_secs(60)).unwrap();
    let vote = MessageDefinition::new(&community, "vote", vote_policies(), recording(&log, "vote"), Some(low)).unwrap();
    let vote2 = MessageDefinition::new(&community, "vote2", vote_policies(), recording(&log, "vote2"), Some(high)).unwrap();
    let processor = processor(&community, &scheduler);

    processor.handle_packets(vec![
        (candidate(2), bytes(&community, &vote, 1)),
        (candidate(2), bytes(&community, &vote2, 2)),
    ]);
    processor.flush_batches();

    let labels: Vec<String> = log.lock().iter().map(|(label, _)| label.clone()).collect();
    assert_eq!(labels, vec!["vote2", "vote"]);

    // Timers for flushed batches are stale
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(log.lock().len(), 2);
}

fn proposal_values(effective: EffectiveResolution) -> PolicyValues {
    PolicyValues::new(
        AuthenticationValue::single(member(7)),
        ResolutionValue::Dynamic { effective },
        DistributionValue::FullSync {
            global_time: 8,
            sequence_number: None,
        },
        DestinationValue::Community,
    )
}

#[test]
fn test_undo_reverts_through_callback() {
    let community = test_community(Arc::new(MemoryStore::new()));
    let scheduler = Arc::new(ManualScheduler::new());
    let undone = Arc::new(Mutex::new(Vec::new()));
    let policies = PolicySet::new(
        Authentication::SingleMember,
        Resolution::Dynamic,
        Distribution::FullSync {
            sequence_numbers: false,
        },
        Destination::Community,
    );
    let record = undone.clone();
    let proposal = MessageDefinition::new(
        &community,
        "proposal",
        policies,
        accept_all().with_undo(move |m| record.lock().push(m.distribution().global_time())),
        None,
    )
    .unwrap();
    let processor = processor(&community, &scheduler);

    let message = MessageInstance::from_values(
        &community,
        proposal,
        proposal_values(EffectiveResolution::Linear),
        Vec::new(),
        None,
    )
    .unwrap();
    processor.undo(&message).unwrap();
    assert_eq!(*undone.lock(), vec![Some(8)]);

    let vote = vote_definition(&community, accept_all());
    assert_matches!(
        processor.undo(&vote_message(&community, &vote, 1)),
        Err(MessageError::NotUndoable { name }) if name == "vote"
    );
}
