//! Domain event publishing over NATS

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "marketplace";

/// Publishes committed domain events. Without a NATS connection events are
/// only logged.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "NATS unavailable, domain events will not be published");
                Self::default()
            }
        }
    }

    /// Best effort: failures are logged and never reach the caller.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = format!("{}.{}", SUBJECT_PREFIX, event.subject());
            let Some(client) = &self.nats else {
                tracing::debug!(subject = %subject, "Domain event (not published)");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(subject = %subject, error = %e, "Failed to encode domain event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(subject = %subject, error = %e, "Failed to publish domain event");
            }
        }
    }
}
