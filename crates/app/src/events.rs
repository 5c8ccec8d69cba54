//! Domain event dispatch
//!
//! Events reach a dispatcher only after the group that raised them has been
//! saved. Dispatch failures are logged by the service and never undo a save.

use std::sync::Mutex;

use shutterclub_core::DomainEvent;
use tracing::info;

use crate::error::Result;

pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: &DomainEvent) -> Result<()>;
}

/// Writes each event to the log as a structured record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDispatcher;

impl EventDispatcher for TracingDispatcher {
    fn dispatch(&self, event: &DomainEvent) -> Result<()> {
        info!(
            event = event.name(),
            group_id = %event.group_id(),
            occurred_on = %event.occurred_on(),
            "domain event"
        );
        Ok(())
    }
}

/// Keeps dispatched events in memory
#[derive(Debug, Default)]
pub struct CollectingDispatcher {
    events: Mutex<Vec<DomainEvent>>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventDispatcher for CollectingDispatcher {
    fn dispatch(&self, event: &DomainEvent) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shutterclub_core::events::TopicStarted;
    use shutterclub_core::Period;
    use uuid::Uuid;

    fn event() -> DomainEvent {
        let now = Utc::now();
        DomainEvent::from(TopicStarted {
            group_id: Uuid::new_v4(),
            weekly_topic_id: Uuid::new_v4(),
            challenge_id: Uuid::new_v4(),
            active_period: Period::new(now, now).unwrap(),
            occurred_on: now,
        })
    }

    #[test]
    fn test_collecting_dispatcher() {
        let dispatcher = CollectingDispatcher::new();
        dispatcher.dispatch(&event()).unwrap();
        TracingDispatcher.dispatch(&event()).unwrap();
        assert_eq!(dispatcher.events().len(), 1);
        assert_eq!(dispatcher.events()[0].name(), "topic_started");
    }
}
