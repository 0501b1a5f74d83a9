use std::sync::{RwLock, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tally_ledger::{EventKind, LedgerEvent, Receipt};
use tally_types::{ElectionId, Timestamp};
use tokio::sync::broadcast;
use tracing::debug;

/// One event of an accepted command, as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Sequence number of the receipt that carried the event.
    pub seq: u64,
    pub timestamp: Timestamp,
    pub event: LedgerEvent,
}

/// Filter for subscribing to a subset of ledger events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events concerning these elections are delivered.
    /// Events without an election (registrations, pause toggles) never match.
    pub elections: Option<Vec<ElectionId>>,
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn election(id: ElectionId) -> Self {
        Self {
            elections: Some(vec![id]),
            kinds: None,
        }
    }

    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            elections: None,
            kinds: Some(kinds.into_iter().collect()),
        }
    }

    /// Returns `true` if the given notification matches this filter.
    pub fn matches(&self, notification: &Notification) -> bool {
        if let Some(ref elections) = self.elections {
            match notification.event.election_id() {
                Some(id) if elections.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&notification.event.kind()) {
                return false;
            }
        }
        true
    }
}

/// A broadcast channel receiver for ledger notifications.
pub type EventStream = broadcast::Receiver<Notification>;

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<Notification>,
}

/// Fan-out of ledger notifications to filtered subscribers.
///
/// Publishing is fire-and-forget: a slow or dropped subscriber never
/// affects the command that produced the events.
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber with the given filter.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        let (sender, receiver) = broadcast::channel(self.capacity);
        self.subscribers().push(Subscriber { filter, sender });
        receiver
    }

    /// Route every event of `receipt` to matching subscribers.
    /// Subscribers whose receivers are all dropped are pruned.
    pub fn publish(&self, receipt: &Receipt) {
        let mut subs = self.subscribers();
        for event in &receipt.events {
            let notification = Notification {
                seq: receipt.seq,
                timestamp: receipt.timestamp,
                event: event.clone(),
            };
            subs.retain(|sub| {
                if sub.filter.matches(&notification) {
                    sub.sender.send(notification.clone()).is_ok()
                } else {
                    sub.sender.receiver_count() > 0
                }
            });
        }
        debug!(seq = receipt.seq, subscribers = subs.len(), "receipt published");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn subscribers(&self) -> RwLockWriteGuard<'_, Vec<Subscriber>> {
        // The subscriber list stays usable after a panicking publisher.
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use tally_ledger::Command;
    use tally_types::{Address, CandidateId};

    use super::*;

    fn vote_receipt(seq: u64, election: u64) -> Receipt {
        Receipt::seal(
            seq,
            Timestamp::from_secs(50),
            Address::zero(),
            Command::Vote {
                election_id: ElectionId::new(election).unwrap(),
                candidate_id: CandidateId::FIRST,
            },
            vec![LedgerEvent::VoteCast {
                voter: Address::zero(),
                election_id: ElectionId::new(election).unwrap(),
                candidate_id: CandidateId::FIRST,
                timestamp: Timestamp::from_secs(50),
            }],
            None,
        )
        .unwrap()
    }

    fn register_receipt(seq: u64) -> Receipt {
        Receipt::seal(
            seq,
            Timestamp::from_secs(40),
            Address::zero(),
            Command::RegisterVoter,
            vec![LedgerEvent::VoterRegistered {
                voter: Address::zero(),
                timestamp: Timestamp::from_secs(40),
            }],
            None,
        )
        .unwrap()
    }

    #[test]
    fn election_filter_routes_only_matching() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe(EventFilter::election(ElectionId::FIRST));
        let mut all = bus.subscribe(EventFilter::all());

        bus.publish(&register_receipt(1));
        bus.publish(&vote_receipt(2, 2));
        bus.publish(&vote_receipt(3, 1));

        let got = first.try_recv().unwrap();
        assert_eq!(got.seq, 3);
        assert!(first.try_recv().is_err());

        let seqs: Vec<u64> = std::iter::from_fn(|| all.try_recv().ok()).map(|n| n.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn kind_filter() {
        let bus = EventBus::new(8);
        let mut registrations = bus.subscribe(EventFilter::kinds([EventKind::VoterRegistered]));
        bus.publish(&vote_receipt(1, 1));
        bus.publish(&register_receipt(2));
        assert_eq!(registrations.try_recv().unwrap().seq, 2);
        assert!(registrations.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::default();
        let kept = bus.subscribe(EventFilter::all());
        let dropped = bus.subscribe(EventFilter::election(ElectionId::FIRST));
        assert_eq!(bus.subscriber_count(), 2);

        drop(dropped);
        bus.publish(&register_receipt(1));
        assert_eq!(bus.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(1);
        bus.publish(&vote_receipt(1, 1));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
