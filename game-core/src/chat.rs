use game_types::{ChatMessage, Identity};

/// Chat transcript carried inside every snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message from `sender`. Blank text is dropped.
    pub fn post(&mut self, sender: &Identity, text: &str) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let message = ChatMessage {
            sender_id: sender.id,
            sender_name: sender.display_name.clone(),
            text: text.to_string(),
            sent_at: chrono::Utc::now().to_rfc3339(),
        };
        self.messages.push(message.clone());
        Some(message)
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Adopt the Authority's transcript wholesale.
    pub fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_stamps_sender() {
        let ada = Identity::human("Ada", "fox");
        let mut log = ChatLog::new();
        let message = log.post(&ada, "  good luck ").unwrap();
        assert_eq!(message.text, "good luck");
        assert_eq!(message.sender_name, "Ada");
        assert!(chrono::DateTime::parse_from_rfc3339(&message.sent_at).is_ok());

        assert!(log.post(&ada, "   ").is_none());
        assert_eq!(log.messages().len(), 1);
    }
}
