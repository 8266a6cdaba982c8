//! Inbound message pipeline
//!
//! Runs on the cooperative scheduler. Packets are matched to definitions,
//! decoded, validated and either applied (immediately or in batches),
//! dropped, or suspended until a dependency arrives. Callbacks are never
//! invoked while an internal lock is held.

use crate::community::Community;
use crate::definition::MessageDefinition;
use crate::error::MessageError;
use crate::instance::MessageInstance;
use crate::packet::RawPacket;
use crate::suspension::{
    Delay, DelayId, Dependency, DependencyRequest, Suspended, SuspensionError, SuspensionRegistry,
    Verdict,
};
use murmur_core::effects::Scheduler;
use murmur_core::{Candidate, SuspensionConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Receives the outbound requests built by delays.
pub trait RequestSink: Send + Sync {
    /// Send `request`; its response must be fed back through
    /// [`MessageProcessor::resume`] with `id`.
    fn send_request(&self, id: DelayId, request: DependencyRequest);
}

impl<T: RequestSink + ?Sized> RequestSink for Arc<T> {
    fn send_request(&self, id: DelayId, request: DependencyRequest) {
        (**self).send_request(id, request);
    }
}

/// Running totals of pipeline outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Packets handed to the pipeline
    pub received: u64,
    /// Messages passed to an apply callback
    pub applied: u64,
    /// Packets or messages dropped
    pub dropped: u64,
    /// Items suspended
    pub delayed: u64,
    /// Delays resumed with a response
    pub resumed: u64,
    /// Delays that timed out
    pub expired: u64,
}

struct PendingBatch {
    definition: Arc<MessageDefinition>,
    messages: Vec<MessageInstance>,
    opened: Instant,
    generation: u64,
}

/// Validate/apply/suspend pipeline for one community.
pub struct MessageProcessor {
    community: Arc<Community>,
    scheduler: Arc<dyn Scheduler>,
    requests: Arc<dyn RequestSink>,
    registry: Mutex<SuspensionRegistry>,
    batches: Mutex<HashMap<String, PendingBatch>>,
    next_generation: Mutex<u64>,
    stats: Mutex<ProcessorStats>,
    this: Weak<MessageProcessor>,
}

impl MessageProcessor {
    /// Pipeline for `community`; timeouts and batch flushes are scheduled on
    /// `scheduler`.
    pub fn new(
        community: Arc<Community>,
        scheduler: Arc<dyn Scheduler>,
        requests: Arc<dyn RequestSink>,
        config: SuspensionConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            community,
            scheduler,
            requests,
            registry: Mutex::new(SuspensionRegistry::new(config)),
            batches: Mutex::new(HashMap::new()),
            next_generation: Mutex::new(0),
            stats: Mutex::new(ProcessorStats::default()),
            this: this.clone(),
        })
    }

    /// Community this pipeline serves.
    pub fn community(&self) -> &Arc<Community> {
        &self.community
    }

    /// Snapshot of the outcome counters.
    pub fn stats(&self) -> ProcessorStats {
        *self.stats.lock()
    }

    /// Number of suspended items.
    pub fn pending_delays(&self) -> usize {
        self.registry.lock().len()
    }

    /// Feed inbound datagrams into the pipeline.
    pub fn handle_packets(&self, packets: Vec<(Candidate, Vec<u8>)>) {
        self.stats.lock().received += packets.len() as u64;

        let mut accepted = Vec::new();
        for (candidate, bytes) in packets {
            match self.community.packet_from_bytes(bytes, Some(candidate)) {
                Ok(packet) => {
                    if let Some(message) = self.process_packet(packet) {
                        accepted.push(message);
                    }
                }
                Err(e) => self.record_drop("<unparsed>", &e.to_string()),
            }
        }
        self.dispatch(accepted);
    }

    /// Validate and apply already decoded messages, such as locally created
    /// ones or resumed message-level delays.
    pub fn handle_messages(&self, messages: Vec<MessageInstance>) {
        let mut accepted = Vec::new();
        for message in messages {
            match message.definition().validate(&message) {
                Verdict::Proceed => accepted.push(message),
                Verdict::Drop(reason) => self.record_drop(message.name(), &reason),
                Verdict::Delay(dependency) => {
                    let candidate = message.candidate();
                    self.suspend(dependency, Suspended::Message(message), candidate);
                }
            }
        }
        self.dispatch(accepted);
    }

    /// Resume delay `id` with the dependency's response, or `None` on
    /// timeout. A second resume of the same id is rejected.
    pub fn resume(
        &self,
        id: DelayId,
        response: Option<&MessageInstance>,
    ) -> Result<(), SuspensionError> {
        let delay = self.registry.lock().take(id)?;
        match delay.resume(response) {
            Some((candidate, suspended)) => {
                self.stats.lock().resumed += 1;
                match suspended {
                    Suspended::Packet(packet) => {
                        self.handle_packets(vec![(candidate, packet.into_bytes())]);
                    }
                    Suspended::Message(message) => self.handle_messages(vec![message]),
                }
            }
            None => self.stats.lock().expired += 1,
        }
        Ok(())
    }

    /// Time out every delay whose deadline has passed.
    pub fn expire_overdue(&self, now: Instant) -> Vec<DelayId> {
        let expired = self.registry.lock().expire(now);
        self.stats.lock().expired += expired.len() as u64;
        expired
    }

    /// Revert a previously applied message through its undo callback.
    pub fn undo(&self, message: &MessageInstance) -> Result<(), MessageError> {
        if message.definition().undo(message) {
            tracing::debug!(definition = message.name(), "Undid message");
            Ok(())
        } else {
            Err(MessageError::NotUndoable {
                name: message.name().to_string(),
            })
        }
    }

    /// Apply every pending batch now, highest priority first.
    pub fn flush_batches(&self) {
        let mut due: Vec<PendingBatch> = self.batches.lock().drain().map(|(_, b)| b).collect();
        due.sort_by(|a, b| b.definition.batch().priority().cmp(&a.definition.batch().priority()));
        for batch in due {
            self.apply_batch(batch);
        }
    }

    fn process_packet(&self, packet: RawPacket) -> Option<MessageInstance> {
        let verdict = match packet.message() {
            Ok(message) => packet.definition().validate(message),
            Err(e) => {
                self.record_drop(packet.name(), &e.to_string());
                return None;
            }
        };

        match verdict {
            Verdict::Proceed => match packet.into_message() {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Decoded packet could not be taken");
                    None
                }
            },
            Verdict::Drop(reason) => {
                self.record_drop(packet.name(), &reason);
                None
            }
            Verdict::Delay(dependency) => {
                let candidate = packet.candidate();
                if dependency.kind().suspends_packet() {
                    self.suspend(dependency, Suspended::Packet(packet), candidate);
                } else {
                    match packet.into_message() {
                        Ok(message) => self.suspend(dependency, Suspended::Message(message), candidate),
                        Err(e) => tracing::warn!(error = %e, "Decoded packet could not be taken"),
                    }
                }
                None
            }
        }
    }

    fn suspend(&self, dependency: Dependency, suspended: Suspended, candidate: Option<Candidate>) {
        let name = suspended.name().to_string();
        let Some(candidate) = candidate else {
            self.record_drop(&name, "delayed without a candidate to ask");
            return;
        };
        let kind = dependency.kind();

        let delay = match Delay::new(dependency, suspended, candidate) {
            Ok(delay) => delay,
            Err(e) => {
                self.record_drop(&name, &e.to_string());
                return;
            }
        };
        let request = match delay.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.record_drop(&name, &e.to_string());
                return;
            }
        };

        let (id, timeout) = {
            let mut registry = self.registry.lock();
            let timeout = kind.timeout(registry.config());
            (registry.insert(delay, Instant::now()), timeout)
        };
        self.stats.lock().delayed += 1;
        tracing::debug!(delay = %id, dependency = %kind, definition = %name, %candidate, "Suspended");

        self.requests.send_request(id, request);

        let this = self.this.clone();
        self.scheduler.register_delayed(
            Box::new(move || {
                if let Some(processor) = this.upgrade() {
                    processor.expire_delay(id);
                }
            }),
            timeout,
        );
    }

    fn expire_delay(&self, id: DelayId) {
        // A delay already resumed by a response makes this a no-op
        if self.registry.lock().is_pending(id) {
            if let Err(e) = self.resume(id, None) {
                tracing::debug!(delay = %id, error = %e, "Timeout raced a resume");
            }
        }
    }

    fn dispatch(&self, accepted: Vec<MessageInstance>) {
        let mut groups: Vec<(Arc<MessageDefinition>, Vec<MessageInstance>)> = Vec::new();
        for message in accepted {
            match groups
                .iter_mut()
                .find(|(definition, _)| **definition == **message.definition())
            {
                Some((_, messages)) => messages.push(message),
                None => groups.push((message.definition().clone(), vec![message])),
            }
        }

        for (definition, messages) in groups {
            if definition.batch().enabled() {
                self.enqueue_batch(&definition, messages);
            } else {
                self.apply(&definition, &messages);
            }
        }
    }

    fn enqueue_batch(&self, definition: &Arc<MessageDefinition>, messages: Vec<MessageInstance>) {
        let max_size = definition.batch().max_size();
        let mut full = Vec::new();
        let mut opened = Vec::new();
        {
            let mut batches = self.batches.lock();
            for message in messages {
                let batch = batches
                    .entry(definition.name().to_string())
                    .or_insert_with(|| {
                        let generation = self.next_generation();
                        opened.push(generation);
                        PendingBatch {
                            definition: definition.clone(),
                            messages: Vec::new(),
                            opened: Instant::now(),
                            generation,
                        }
                    });
                batch.messages.push(message);
                if batch.messages.len() >= max_size {
                    if let Some(batch) = batches.remove(definition.name()) {
                        full.push(batch);
                    }
                }
            }
        }

        for batch in full {
            self.apply_batch(batch);
        }
        for generation in opened {
            let this = self.this.clone();
            let name = definition.name().to_string();
            self.scheduler.register_delayed(
                Box::new(move || {
                    if let Some(processor) = this.upgrade() {
                        processor.flush_batch(&name, generation);
                    }
                }),
                definition.batch().max_window(),
            );
        }
    }

    fn next_generation(&self) -> u64 {
        let mut next = self.next_generation.lock();
        *next += 1;
        *next
    }

    fn flush_batch(&self, name: &str, generation: u64) {
        let batch = {
            let mut batches = self.batches.lock();
            match batches.get(name) {
                Some(batch) if batch.generation == generation => batches.remove(name),
                _ => None,
            }
        };
        if let Some(batch) = batch {
            self.apply_batch(batch);
        }
    }

    fn apply_batch(&self, batch: PendingBatch) {
        let age = batch.opened.elapsed();
        if age > batch.definition.batch().max_age() {
            tracing::debug!(
                definition = batch.definition.name(),
                count = batch.messages.len(),
                age_ms = age.as_millis() as u64,
                "Discarding stale batch"
            );
            self.stats.lock().dropped += batch.messages.len() as u64;
            return;
        }
        self.apply(&batch.definition, &batch.messages);
    }

    fn apply(&self, definition: &MessageDefinition, messages: &[MessageInstance]) {
        if messages.is_empty() {
            return;
        }
        definition.apply(messages);
        self.stats.lock().applied += messages.len() as u64;
        tracing::debug!(
            definition = definition.name(),
            count = messages.len(),
            "Applied messages"
        );
    }

    fn record_drop(&self, name: &str, reason: &str) {
        self.stats.lock().dropped += 1;
        tracing::debug!(definition = name, reason, "Dropped");
    }
}
