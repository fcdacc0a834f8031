/// Notifications the chat core emits for the presentation layer. The
/// presentation layer is a consumer only; it never mutates core state
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The message store changed; re-render the list.
    MessagesUpdated,
    /// A send resolved (successfully or not); scroll to the latest message.
    ScrollToLatest,
    /// The participant roster changed.
    RosterUpdated,
    /// A non-silent operation failed; show a notification.
    OperationFailed { code: &'static str },
}
