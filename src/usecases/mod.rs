pub mod bootstrap;
pub mod chat_session;
pub mod context;
pub mod message_ops;
pub mod reactions;
pub mod roster;
pub mod send_message;

use tokio::sync::mpsc::UnboundedSender;

use crate::domain::events::SessionEvent;

/// Notifies the presentation layer. A closed receiver only means the UI is
/// gone; pipelines keep running so server state stays consistent.
pub(crate) fn emit(events: &UnboundedSender<SessionEvent>, event: SessionEvent) {
    let _ = events.send(event);
}

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
