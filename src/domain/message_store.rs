use std::collections::HashSet;

use super::message::Message;

/// Ordered collection of messages for one open chat; the single source of
/// truth for presentation. All mutation flows through the operation
/// pipelines, never through the presentation layer.
///
/// Invariant: messages are ascending by `created_at`, with unconfirmed
/// temporaries appended after all confirmed messages known at merge time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStore {
    chat_id: String,
    messages: Vec<Message>,
    pending: HashSet<String>,
}

impl MessageStore {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            messages: Vec::new(),
            pending: HashSet::new(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pinned(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_pinned)
    }

    /// Marks a message id as pending, i.e. its local status must survive the
    /// next server merge.
    pub fn mark_pending(&mut self, id: &str) {
        self.pending.insert(id.to_owned());
    }

    pub fn clear_pending(&mut self, id: &str) {
        self.pending.remove(id);
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Reconciles a freshly fetched server snapshot with local state:
    /// sorts ascending by creation time, keeps the local status of any
    /// pending message the server also returned (prevents a flicker back to
    /// a stale status while a send is resolving), and re-appends unconfirmed
    /// temporaries the server does not know about yet.
    ///
    /// On fetch failure callers simply do not call this; the store is never
    /// cleared destructively.
    pub fn replace_all(&mut self, mut server_messages: Vec<Message>) {
        server_messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut merged: Vec<Message> = Vec::with_capacity(server_messages.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(server_messages.len());

        for mut server_message in server_messages {
            if !seen.insert(server_message.id.clone()) {
                continue;
            }

            if self.pending.contains(&server_message.id) {
                if let Some(local) = self.get(&server_message.id) {
                    server_message.status = local.status;
                }
            }

            merged.push(server_message);
        }

        let temporaries: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.is_temporary() && !seen.contains(&m.id))
            .cloned()
            .collect();

        merged.extend(temporaries);
        self.messages = merged;
    }

    /// Appends a message at the end (optimistic insert).
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Inserts or replaces a single message by id, used after a direct
    /// mutation response.
    pub fn upsert(&mut self, message: Message) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        self.pending.remove(id);
        Some(self.messages.remove(index))
    }

    /// Swaps a temporary placeholder for its server-confirmed record,
    /// keeping the placeholder's position. Any pre-existing copy of the
    /// confirmed message (e.g. delivered by a poll that raced the send
    /// response) is dropped so the message appears exactly once.
    pub fn replace_temporary(&mut self, temp_id: &str, confirmed: Message) {
        self.pending.remove(temp_id);
        self.messages
            .retain(|m| !(m.id == confirmed.id && m.id != temp_id));

        match self.messages.iter_mut().find(|m| m.id == temp_id) {
            Some(slot) => *slot = confirmed,
            None => self.messages.push(confirmed),
        }
    }

    /// Applies a mutation to the message with the given id. Returns false if
    /// the message is not in the store.
    pub fn update<F>(&mut self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                mutate(message);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::message::{MessageStatus, MessageType};

    fn message(id: &str, created_at_secs: i64) -> Message {
        let at = Utc.timestamp_opt(created_at_secs, 0).unwrap();
        Message {
            id: id.to_owned(),
            content: Some(format!("body-{id}")),
            message_type: MessageType::Text,
            status: MessageStatus::Sent,
            sender_id: "u2".to_owned(),
            chat_id: "c1".to_owned(),
            parent_id: None,
            deleted_for_everyone: false,
            created_at: at,
            updated_at: at,
            sender: None,
            attachments: Vec::new(),
            reactions: Vec::new(),
            read_receipts: Vec::new(),
            is_pinned: false,
        }
    }

    fn temp_message(id: &str, created_at_secs: i64) -> Message {
        let mut m = message(id, created_at_secs);
        m.status = MessageStatus::Sending;
        m
    }

    fn ids(store: &MessageStore) -> Vec<&str> {
        store.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn replace_all_sorts_ascending_by_creation_time() {
        let mut store = MessageStore::new("c1");

        store.replace_all(vec![
            message("m3", 300),
            message("m1", 100),
            message("m2", 200),
        ]);

        assert_eq!(ids(&store), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn replace_all_keeps_unconfirmed_temporaries_at_the_end() {
        let mut store = MessageStore::new("c1");
        store.push(temp_message("temp-1", 400));
        store.mark_pending("temp-1");

        store.replace_all(vec![message("m2", 200), message("m1", 100)]);

        assert_eq!(ids(&store), vec!["m1", "m2", "temp-1"]);
        assert_eq!(
            store.get("temp-1").map(|m| m.status),
            Some(MessageStatus::Sending)
        );
    }

    #[test]
    fn replace_all_preserves_pending_status_over_server_status() {
        let mut store = MessageStore::new("c1");
        let mut local = message("m1", 100);
        local.status = MessageStatus::Sending;
        store.push(local);
        store.mark_pending("m1");

        // Poll returns the same message with a stale confirmed status.
        store.replace_all(vec![message("m1", 100)]);

        assert_eq!(
            store.get("m1").map(|m| m.status),
            Some(MessageStatus::Sending)
        );
    }

    #[test]
    fn replace_all_takes_server_status_once_no_longer_pending() {
        let mut store = MessageStore::new("c1");
        let mut local = message("m1", 100);
        local.status = MessageStatus::Sent;
        store.push(local);

        let mut server = message("m1", 100);
        server.status = MessageStatus::Seen;
        store.replace_all(vec![server]);

        assert_eq!(store.get("m1").map(|m| m.status), Some(MessageStatus::Seen));
    }

    #[test]
    fn replace_all_drops_duplicate_server_entries() {
        let mut store = MessageStore::new("c1");

        store.replace_all(vec![message("m1", 100), message("m1", 100)]);

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_all_drops_stale_confirmed_messages() {
        let mut store = MessageStore::new("c1");
        store.replace_all(vec![message("m1", 100), message("m2", 200)]);

        // m2 was deleted server-side; only temporaries survive a merge.
        store.replace_all(vec![message("m1", 100)]);

        assert_eq!(ids(&store), vec!["m1"]);
    }

    #[test]
    fn replace_temporary_swaps_placeholder_in_place() {
        let mut store = MessageStore::new("c1");
        store.replace_all(vec![message("m1", 100)]);
        store.push(temp_message("temp-1", 200));
        store.mark_pending("temp-1");

        let mut confirmed = message("m2", 200);
        confirmed.status = MessageStatus::Sent;
        store.replace_temporary("temp-1", confirmed);

        assert_eq!(ids(&store), vec!["m1", "m2"]);
        assert!(!store.is_pending("temp-1"));
    }

    #[test]
    fn replace_temporary_deduplicates_against_polled_copy() {
        let mut store = MessageStore::new("c1");
        store.push(temp_message("temp-1", 200));
        // A poll already delivered the confirmed record before the send
        // response came back.
        store.push(message("m2", 200));

        store.replace_temporary("temp-1", message("m2", 200));

        assert_eq!(ids(&store), vec!["m2"]);
    }

    #[test]
    fn replace_temporary_appends_when_placeholder_is_gone() {
        let mut store = MessageStore::new("c1");

        store.replace_temporary("temp-1", message("m2", 200));

        assert_eq!(ids(&store), vec!["m2"]);
    }

    #[test]
    fn upsert_replaces_existing_and_appends_new() {
        let mut store = MessageStore::new("c1");
        store.push(message("m1", 100));

        let mut edited = message("m1", 100);
        edited.content = Some("changed".to_owned());
        store.upsert(edited);
        store.upsert(message("m2", 200));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("m1").and_then(|m| m.content.clone()).as_deref(), Some("changed"));
    }

    #[test]
    fn remove_returns_the_message_and_clears_pending() {
        let mut store = MessageStore::new("c1");
        store.push(temp_message("temp-1", 100));
        store.mark_pending("temp-1");

        let removed = store.remove("temp-1");

        assert_eq!(removed.map(|m| m.id), Some("temp-1".to_owned()));
        assert!(!store.is_pending("temp-1"));
        assert!(store.is_empty());
    }

    #[test]
    fn update_mutates_in_place_and_reports_missing_ids() {
        let mut store = MessageStore::new("c1");
        store.push(message("m1", 100));

        let hit = store.update("m1", |m| m.status = MessageStatus::Failed);
        let miss = store.update("m9", |m| m.status = MessageStatus::Failed);

        assert!(hit);
        assert!(!miss);
        assert_eq!(
            store.get("m1").map(|m| m.status),
            Some(MessageStatus::Failed)
        );
    }

    #[test]
    fn pinned_yields_only_pinned_messages() {
        let mut store = MessageStore::new("c1");
        let mut pinned = message("m1", 100);
        pinned.is_pinned = true;
        store.push(pinned);
        store.push(message("m2", 200));

        let pinned_ids: Vec<&str> = store.pinned().map(|m| m.id.as_str()).collect();

        assert_eq!(pinned_ids, vec!["m1"]);
    }
}
