mod types;
mod waiter;

pub use types::{EntityRef, Event, EventFilter, Recursion, CUSTOMIZATION_SUCCEEDED};
pub use waiter::{wait_for_event, EventSource, WaitOptions};
