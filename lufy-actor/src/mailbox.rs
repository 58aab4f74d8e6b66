//! Bounded mailbox used by every actor.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::message::Message;

/// Default mailbox capacity when an actor is spawned without an explicit one.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

/// Deadline applied to `Tell` when the mailbox is momentarily full.
pub const SEND_DEADLINE: Duration = Duration::from_secs(5);

/// Sending half of an actor's mailbox.
#[derive(Clone)]
pub struct MailboxSender {
    inner: mpsc::Sender<Message>,
}

/// Receiving half of an actor's mailbox, owned by the actor's drain task.
pub struct MailboxReceiver {
    inner: mpsc::Receiver<Message>,
}

/// Outcome of enqueuing a message onto a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was enqueued.
    Delivered,
    /// The mailbox stayed full for the entire send deadline.
    Full,
    /// The receiving half has been dropped (actor stopped draining).
    Closed,
}

/// Create a bounded mailbox pair with the given capacity.
pub fn channel(capacity: usize) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MailboxSender { inner: tx }, MailboxReceiver { inner: rx })
}

impl MailboxSender {
    /// Enqueue `msg`, waiting up to [`SEND_DEADLINE`] if the mailbox is full.
    pub async fn send(&self, msg: Message) -> SendOutcome {
        match tokio::time::timeout(SEND_DEADLINE, self.inner.send(msg)).await {
            Ok(Ok(())) => SendOutcome::Delivered,
            Ok(Err(_)) => SendOutcome::Closed,
            Err(_) => SendOutcome::Full,
        }
    }
}

impl MailboxReceiver {
    /// Receive the next message, or `None` once the sender side is dropped.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inner.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_in_order() {
        let (tx, mut rx) = channel(4);
        tx.send(Message::new("a", &b""[..])).await;
        tx.send(Message::new("b", &b""[..])).await;

        assert_eq!(rx.recv().await.unwrap().tag(), "a");
        assert_eq!(rx.recv().await.unwrap().tag(), "b");
    }

    #[tokio::test]
    async fn send_to_closed_mailbox_reports_closed() {
        let (tx, rx) = channel(1);
        drop(rx);
        let outcome = tx.send(Message::new("a", &b""[..])).await;
        assert_eq!(outcome, SendOutcome::Closed);
    }

    #[tokio::test]
    async fn capacity_one_blocks_until_drained() {
        let (tx, mut rx) = channel(1);
        assert_eq!(tx.send(Message::new("a", &b""[..])).await, SendOutcome::Delivered);

        let tx2 = tx.clone();
        let sender = tokio::spawn(async move { tx2.send(Message::new("b", &b""[..])).await });

        // Drain the first message so the pending send can complete.
        assert_eq!(rx.recv().await.unwrap().tag(), "a");
        assert_eq!(sender.await.unwrap(), SendOutcome::Delivered);
    }
}
