//! Event channel built on crossbeam-channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sending half, cloneable across threads (rayon workers included).
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// A dropped receiver is not an error: nobody is listening, the run goes on.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, used by front ends.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Take an event if one is waiting
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructor for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }

    /// Bounded channel; senders block once `capacity` events are queued
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }
}

/// A sender whose receiver is already gone.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, ScanEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Scan(ScanEvent::FileFound {
                path: PathBuf::from("/inbox/a.jpg"),
            }));
        });
        handle.join().unwrap();

        match receiver.recv() {
            Some(Event::Scan(ScanEvent::FileFound { path })) => {
                assert_eq!(path, PathBuf::from("/inbox/a.jpg"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        null_sender().send(Event::Pipeline(PipelineEvent::Started));
    }

    #[test]
    fn receiver_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::bounded(4);
        sender.send(Event::Pipeline(PipelineEvent::Started));
        drop(sender);

        assert_eq!(receiver.iter().count(), 1);
        assert!(receiver.recv().is_none());
    }
}
