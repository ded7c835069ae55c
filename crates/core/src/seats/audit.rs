//! Audit sink implementations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::error::StoreError;
use super::store::AuditSink;
use super::types::AuditEvent;

/// Writes audit events to the `roster::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        tracing::info!(
            target: "roster::audit",
            event = event.kind.as_str(),
            organization_id = %event.organization_id,
            actor = ?event.actor.map(|a| a.to_string()),
            change_id = %event.change_id,
            old_limit = event.old_limit,
            new_limit = event.new_limit,
            amount_cents = event.amount_cents,
            currency = %event.currency_code,
            seats_used = event.seats_used,
            occurred_at = %event.occurred_at.to_rfc3339(),
            "audit"
        );
        Ok(())
    }
}

/// Keeps events in memory so tests can inspect them.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Makes every `record` call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit log offline".to_string()));
        }
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
