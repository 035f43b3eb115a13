//! Per-recipient FIFO message queues, each bounded to a fixed capacity.

use std::collections::{BTreeMap, VecDeque};

use tavern_types::{AgentId, Message};

/// How a mailbox read treats the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Consume every queued message.
    #[default]
    Drain,
    /// Return queued messages and leave them in place.
    Peek,
}

/// All agents' inboxes.
#[derive(Debug)]
pub(crate) struct Mailboxes {
    queues: BTreeMap<AgentId, VecDeque<Message>>,
    capacity: usize,
}

impl Mailboxes {
    /// Inboxes holding at most `capacity` messages each (at least one).
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queues: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append to the recipient's queue. Returns how many of the oldest
    /// messages were dropped to stay within capacity.
    pub(crate) fn deliver(&mut self, message: Message) -> usize {
        let queue = self.queues.entry(message.to.clone()).or_default();
        queue.push_back(message);
        let overflow = queue.len().saturating_sub(self.capacity);
        queue.drain(..overflow);
        overflow
    }

    /// Read an inbox in arrival order.
    pub(crate) fn read(&mut self, agent: &AgentId, mode: ReadMode) -> Vec<Message> {
        match mode {
            ReadMode::Drain => self
                .queues
                .get_mut(agent)
                .map(|queue| queue.drain(..).collect())
                .unwrap_or_default(),
            ReadMode::Peek => self
                .queues
                .get(agent)
                .map(|queue| queue.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// The `count` most recent queued messages, oldest first.
    pub(crate) fn recent(&self, agent: &AgentId, count: usize) -> Vec<Message> {
        self.queues
            .get(agent)
            .map(|queue| {
                let skip = queue.len().saturating_sub(count);
                queue.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Number of unread messages.
    pub(crate) fn unread(&self, agent: &AgentId) -> usize {
        self.queues.get(agent).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use tavern_types::{MessageId, MessageKind};

    use super::*;

    fn message(to: &str, body: &str) -> Message {
        Message {
            id: MessageId::new(),
            from: AgentId::new("sender"),
            to: AgentId::new(to),
            body: body.to_owned(),
            kind: MessageKind::Direct,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn drain_empties_queue_in_fifo_order() {
        let mut boxes = Mailboxes::new(10);
        boxes.deliver(message("bob", "first"));
        boxes.deliver(message("bob", "second"));
        let bob = AgentId::new("bob");

        let read = boxes.read(&bob, ReadMode::Drain);
        let bodies: Vec<&str> = read.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert_eq!(boxes.unread(&bob), 0);
    }

    #[test]
    fn peek_leaves_queue_intact() {
        let mut boxes = Mailboxes::new(10);
        boxes.deliver(message("bob", "hello"));
        let bob = AgentId::new("bob");

        assert_eq!(boxes.read(&bob, ReadMode::Peek).len(), 1);
        assert_eq!(boxes.unread(&bob), 1);
    }

    #[test]
    fn recent_keeps_latest() {
        let mut boxes = Mailboxes::new(10);
        for body in ["a", "b", "c"] {
            boxes.deliver(message("bob", body));
        }
        let recent = boxes.recent(&AgentId::new("bob"), 2);
        let bodies: Vec<&str> = recent.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["b", "c"]);
    }

    #[test]
    fn full_mailbox_drops_oldest() {
        let mut boxes = Mailboxes::new(2);
        assert_eq!(boxes.deliver(message("bob", "a")), 0);
        assert_eq!(boxes.deliver(message("bob", "b")), 0);
        assert_eq!(boxes.deliver(message("bob", "c")), 1);
        boxes.deliver(message("eve", "x"));

        let bob = AgentId::new("bob");
        let read = boxes.read(&bob, ReadMode::Drain);
        let bodies: Vec<&str> = read.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["b", "c"]);
        assert_eq!(boxes.unread(&AgentId::new("eve")), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut boxes = Mailboxes::new(0);
        boxes.deliver(message("bob", "a"));
        boxes.deliver(message("bob", "b"));
        let bob = AgentId::new("bob");
        assert_eq!(boxes.unread(&bob), 1);
        assert_eq!(boxes.read(&bob, ReadMode::Peek)[0].body, "b");
    }
}
