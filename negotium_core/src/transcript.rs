//! Append-only conversation log.

use chrono::{DateTime, Utc};
use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{HistoryEntry, Role};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Counterpart,
}

impl Author {
    pub fn role(self) -> Role {
        match self {
            Author::User => Role::User,
            Author::Counterpart => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: Uuid,
    content: String,
    author: Author,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            author,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Author::User, content)
    }

    pub fn counterpart(content: impl Into<String>) -> Self {
        Self::new(Author::Counterpart, content)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// Ordered message log for one session. Messages can only be appended.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    listeners: Vec<Sender<Message>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with the counterpart's opening line.
    pub fn with_opening(opening: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.append(Message::counterpart(opening));
        transcript
    }

    pub fn append(&mut self, message: Message) {
        self.listeners
            .retain(|listener| listener.send(message.clone()).is_ok());
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Every future append is delivered to the returned receiver.
    pub fn subscribe(&mut self) -> Receiver<Message> {
        let (tx, rx) = flume::unbounded();
        self.listeners.push(tx);
        rx
    }

    /// Role-tagged replay of the whole conversation, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|message| HistoryEntry {
                role: message.author.role(),
                content: message.content.clone(),
            })
            .collect()
    }
}
