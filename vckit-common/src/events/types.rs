use serde::{Deserialize, Serialize};

/// Event type emitted by vCenter when guest customization (sysprep) finishes.
pub const CUSTOMIZATION_SUCCEEDED: &str = "CustomizationSucceeded";

/// Opaque handle to a remote-managed object, resolved by the caller before
/// any event query. The poller never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Platform identifier (e.g. `vm-1042`).
    pub id: String,
    /// Human-readable name, used in diagnostics.
    pub name: String,
}

/// Whether an event query scopes to exactly one entity or includes its
/// descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recursion {
    SelfOnly,
    Children,
    All,
}

/// Query filter sent to the event log. Built fresh per poll iteration;
/// immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFilter {
    pub entity: EntityRef,
    pub recursion: Recursion,
    pub event_type_ids: Vec<String>,
}

impl EventFilter {
    /// Filter for a single event type scoped to `entity` itself (no
    /// descendants).
    pub fn for_entity(entity: &EntityRef, event_type_id: &str) -> Self {
        Self {
            entity: entity.clone(),
            recursion: Recursion::SelfOnly,
            event_type_ids: vec![event_type_id.to_string()],
        }
    }
}

/// A single event record returned by the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type_id: String,
    /// Human-readable message as formatted by the platform.
    pub full_formatted_message: String,
    pub created_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for_entity() {
        let vm = EntityRef {
            id: "vm-7".to_string(),
            name: "web01".to_string(),
        };
        let filter = EventFilter::for_entity(&vm, CUSTOMIZATION_SUCCEEDED);

        assert_eq!(filter.entity, vm);
        assert_eq!(filter.recursion, Recursion::SelfOnly);
        assert_eq!(filter.event_type_ids, vec!["CustomizationSucceeded"]);
    }

    #[test]
    fn test_recursion_wire_names() {
        assert_eq!(
            serde_json::to_string(&Recursion::SelfOnly).unwrap(),
            "\"self_only\""
        );
        assert_eq!(
            serde_json::to_string(&Recursion::Children).unwrap(),
            "\"children\""
        );
    }
}
