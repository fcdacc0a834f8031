//! Domain layer: core entities and state machines.

pub mod chat;
pub mod events;
pub mod message;
pub mod message_store;
pub mod roster;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
