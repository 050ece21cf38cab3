//! Per-user working memory for the chat loop.
//!
//! Lives only for the process lifetime and is never seeded from the durable
//! history, so a restarted server starts every user with an empty
//! conversation. Each user's conversation sits behind its own mutex: callers
//! holding the handle get serialized access to that user only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    /// Reserved, nothing sets it yet.
    pub name: Option<String>,
    /// Reserved, nothing reads it yet.
    pub preferences: Vec<String>,
    /// `"User: ..."` / `"Bot: ..."` lines in arrival order.
    pub history: Vec<String>,
    pub last_question: Option<String>,
}

impl Conversation {
    pub fn record_question(&mut self, message: &str) {
        self.last_question = Some(message.to_string());
        self.history.push(format!("User: {}", message));
    }

    pub fn record_reply(&mut self, reply: &str) {
        self.history.push(format!("Bot: {}", reply));
    }
}

pub type ConversationHandle = Arc<Mutex<Conversation>>;

struct Slot {
    conversation: ConversationHandle,
    last_used: AtomicU64,
}

/// Process-wide map of email to conversation.
///
/// Unbounded unless built with a capacity, in which case adding a new user
/// at capacity drops the least recently used conversation.
pub struct ConversationStore {
    entries: DashMap<String, Slot>,
    capacity: Option<usize>,
    clock: AtomicU64,
}

impl ConversationStore {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.filter(|&n| n > 0),
            clock: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Existing conversation for `email`, or a fresh empty one.
    pub fn get_or_create(&self, email: &str) -> ConversationHandle {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(slot) = self.entries.get(email) {
            slot.last_used.store(tick, Ordering::Relaxed);
            return slot.conversation.clone();
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                if !self.evict_least_recent() {
                    break;
                }
            }
        }

        self.entries
            .entry(email.to_string())
            .or_insert_with(|| Slot {
                conversation: Arc::new(Mutex::new(Conversation::default())),
                last_used: AtomicU64::new(tick),
            })
            .conversation
            .clone()
    }

    /// Record a whole exchange in one locked step.
    pub async fn record_turn(&self, email: &str, user_message: &str, bot_reply: &str) {
        let handle = self.get_or_create(email);
        let mut conversation = handle.lock().await;
        conversation.record_question(user_message);
        conversation.record_reply(bot_reply);
    }

    /// Copy of the current conversation, without creating one.
    pub async fn snapshot(&self, email: &str) -> Option<Conversation> {
        let handle = self.entries.get(email)?.conversation.clone();
        let conversation = handle.lock().await;
        Some(conversation.clone())
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries.contains_key(email)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(email) => {
                tracing::debug!(email = %email, "Evicting conversation");
                self.entries.remove(&email).is_some()
            }
            None => false,
        }
    }
}
