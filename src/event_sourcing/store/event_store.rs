use std::collections::HashMap;
use std::marker::PhantomData;
use uuid::Uuid;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::event_sourcing::core::{
    DomainEvent, EventEnvelope, Aggregate, serialize_event, deserialize_event,
};

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// In-process, append-only event store. Works with ANY event type.
//
// Responsibilities:
// 1. Append events per aggregate (append-only, JSON payloads)
// 2. Load event history for aggregates
// 3. Ensure optimistic concurrency control
//
// Payloads are stored serialized so that loading exercises the same decode
// path a durable backend would.
//
// ============================================================================

/// One row of the event table
#[derive(Debug, Clone)]
struct StoredEvent {
    sequence_number: i64,
    event_id: Uuid,
    event_type: String,
    event_version: i32,
    event_data: String,
    correlation_id: Uuid,
    timestamp: DateTime<Utc>,
    metadata: HashMap<String, String>,
}

pub struct EventStore<E: DomainEvent> {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
    aggregate_type_name: String,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new(aggregate_type_name: &str) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            aggregate_type_name: aggregate_type_name.to_string(),
            _phantom: PhantomData,
        }
    }

    /// Append events to the event store
    /// Returns the new version number after appending
    pub async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("Cannot append empty event list");
        }

        // Serialize before taking the write lock; a bad payload must not
        // leave a half-written stream behind.
        let mut rows = Vec::with_capacity(events.len());
        let mut new_version = expected_version;
        for envelope in &events {
            new_version += 1;
            rows.push(StoredEvent {
                sequence_number: new_version,
                event_id: envelope.event_id,
                event_type: envelope.event_type.clone(),
                event_version: envelope.event_version,
                event_data: serialize_event(&envelope.event_data)?,
                correlation_id: envelope.correlation_id,
                timestamp: envelope.timestamp,
                metadata: envelope.metadata.clone(),
            });
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        let current_version = stream.last().map(|e| e.sequence_number).unwrap_or(0);
        if current_version != expected_version {
            bail!(
                "Concurrency conflict: expected version {}, but current is {}",
                expected_version,
                current_version
            );
        }

        stream.extend(rows);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            event_count = events.len(),
            "Appended events to event store"
        );

        Ok(new_version)
    }

    /// Load all events for an aggregate, in sequence order
    pub async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>> {
        let streams = self.streams.read().await;
        let Some(stream) = streams.get(&aggregate_id) else {
            return Ok(Vec::new());
        };

        let mut events = Vec::with_capacity(stream.len());
        for row in stream {
            let event_data: E = deserialize_event(&row.event_data)?;
            events.push(EventEnvelope {
                event_id: row.event_id,
                aggregate_id,
                sequence_number: row.sequence_number,
                event_type: row.event_type.clone(),
                event_version: row.event_version,
                event_data,
                correlation_id: row.correlation_id,
                timestamp: row.timestamp,
                metadata: row.metadata.clone(),
            });
        }

        tracing::trace!("Loaded {} events for aggregate {}", events.len(), aggregate_id);
        Ok(events)
    }

    pub async fn get_current_version(&self, aggregate_id: Uuid) -> Result<i64> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.sequence_number)
            .unwrap_or(0))
    }

    pub async fn load_aggregate<A>(&self, aggregate_id: Uuid) -> Result<A>
    where
        A: Aggregate<Event = E>,
        <A as Aggregate>::Error: std::fmt::Display,
    {
        let events = self.load_events(aggregate_id).await?;

        if events.is_empty() {
            bail!("Aggregate not found: {}", aggregate_id);
        }

        A::load_from_events(events)
    }

    pub async fn aggregate_exists(&self, aggregate_id: Uuid) -> Result<bool> {
        let version = self.get_current_version(aggregate_id).await?;
        Ok(version > 0)
    }
}
