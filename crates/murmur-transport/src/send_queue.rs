//! Ordered datagrams waiting for send-buffer space
//!
//! Once anything is queued, later datagrams queue behind it so ordering
//! holds across backpressure. Whoever drains the queue re-inserts a
//! datagram at the head when the buffer fills again.

use crate::counters::ByteCounters;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

struct Queued {
    data: Vec<u8>,
    address: SocketAddr,
    len: usize,
}

/// Result of offering one datagram to the queue.
#[derive(Debug)]
pub(crate) enum Offer {
    /// Transmitted immediately
    Sent,
    /// Waiting in the queue; `first` when this datagram started the backlog
    Queued {
        /// The queue was empty before this datagram
        first: bool,
    },
    /// Hard send error; the datagram is gone
    Failed(io::Error),
}

#[derive(Default)]
pub(crate) struct SendQueue {
    items: VecDeque<Queued>,
}

impl SendQueue {
    /// Transmit `data` unless a backlog exists; queue it on `WouldBlock`.
    ///
    /// `len` is the payload size credited to the outbound counter once the
    /// datagram actually leaves.
    pub(crate) fn offer<F>(
        &mut self,
        data: Cow<'_, [u8]>,
        address: SocketAddr,
        len: usize,
        counters: &ByteCounters,
        send: F,
    ) -> Offer
    where
        F: FnOnce(&[u8], SocketAddr) -> io::Result<usize>,
    {
        if !self.items.is_empty() {
            self.push(data, address, len);
            return Offer::Queued { first: false };
        }
        match send(&data, address) {
            Ok(_) => {
                counters.add_up(len);
                Offer::Sent
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.push(data, address, len);
                Offer::Queued { first: true }
            }
            Err(e) => Offer::Failed(e),
        }
    }

    /// Transmit queued datagrams in order until the buffer fills again.
    ///
    /// Returns `true` once the queue is empty. Datagrams failing with a hard
    /// error are dropped.
    pub(crate) fn drain<F>(&mut self, counters: &ByteCounters, mut send: F) -> bool
    where
        F: FnMut(&[u8], SocketAddr) -> io::Result<usize>,
    {
        tracing::debug!(queued = self.items.len(), "Retrying send queue");
        while let Some(item) = self.items.pop_front() {
            match send(&item.data, item.address) {
                Ok(_) => counters.add_up(item.len),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.items.push_front(item);
                    return false;
                }
                Err(e) => {
                    tracing::warn!(address = %item.address, error = %e, "Queued send failed, datagram dropped");
                }
            }
        }
        true
    }

    /// Drop everything still waiting and return how many datagrams that was.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn push(&mut self, data: Cow<'_, [u8]>, address: SocketAddr, len: usize) {
        self.items.push_back(Queued {
            data: data.into_owned(),
            address,
            len,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn peer() -> SocketAddr {
        "10.0.0.2:6421".parse().unwrap()
    }

    /// Socket stand-in failing each scripted payload once with `kind`.
    struct Wire {
        sent: RefCell<Vec<u8>>,
        failures: RefCell<Vec<(u8, io::ErrorKind)>>,
    }

    impl Wire {
        fn new(failures: Vec<(u8, io::ErrorKind)>) -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                failures: RefCell::new(failures),
            }
        }

        fn send(&self, data: &[u8], _address: SocketAddr) -> io::Result<usize> {
            let mut failures = self.failures.borrow_mut();
            if let Some(index) = failures.iter().position(|(tag, _)| *tag == data[0]) {
                let (_, kind) = failures.remove(index);
                return Err(io::Error::new(kind, "scripted"));
            }
            self.sent.borrow_mut().push(data[0]);
            Ok(data.len())
        }
    }

    #[test]
    fn test_backlog_preserves_order() {
        let wire = Wire::new(vec![
            (2, io::ErrorKind::WouldBlock),
            (4, io::ErrorKind::WouldBlock),
        ]);
        let counters = ByteCounters::default();
        let mut queue = SendQueue::default();

        let offers: Vec<Offer> = (1u8..=4)
            .map(|n| {
                queue.offer(Cow::Owned(vec![n; 10]), peer(), 10, &counters, |d, a| wire.send(d, a))
            })
            .collect();
        assert!(matches!(offers[0], Offer::Sent));
        assert!(matches!(offers[1], Offer::Queued { first: true }));
        assert!(matches!(offers[2], Offer::Queued { first: false }));
        assert!(matches!(offers[3], Offer::Queued { first: false }));
        assert_eq!(queue.len(), 3);
        assert_eq!(counters.total_up(), 10);

        // 2 and 3 go out, 4 blocks again and stays at the head
        assert!(!queue.drain(&counters, |d, a| wire.send(d, a)));
        assert_eq!(queue.len(), 1);
        assert!(queue.drain(&counters, |d, a| wire.send(d, a)));

        assert_eq!(*wire.sent.borrow(), vec![1, 2, 3, 4]);
        assert_eq!(counters.total_up(), 40);
    }

    #[test]
    fn test_hard_error_is_reported_not_queued() {
        let wire = Wire::new(vec![(1, io::ErrorKind::PermissionDenied)]);
        let counters = ByteCounters::default();
        let mut queue = SendQueue::default();

        let offer = queue.offer(Cow::Owned(vec![1; 5]), peer(), 5, &counters, |d, a| wire.send(d, a));
        assert!(matches!(offer, Offer::Failed(e) if e.kind() == io::ErrorKind::PermissionDenied));
        assert_eq!(queue.len(), 0);
        assert_eq!(counters.total_up(), 0);
    }

    #[test]
    fn test_drain_drops_hard_failures_and_continues() {
        let wire = Wire::new(vec![
            (1, io::ErrorKind::WouldBlock),
            (1, io::ErrorKind::ConnectionRefused),
        ]);
        let counters = ByteCounters::default();
        let mut queue = SendQueue::default();

        queue.offer(Cow::Owned(vec![1; 3]), peer(), 3, &counters, |d, a| wire.send(d, a));
        queue.offer(Cow::Owned(vec![2; 3]), peer(), 3, &counters, |d, a| wire.send(d, a));
        assert!(queue.drain(&counters, |d, a| wire.send(d, a)));

        assert_eq!(*wire.sent.borrow(), vec![2]);
        assert_eq!(counters.total_up(), 3);
        assert_eq!(queue.clear(), 0);
    }
}
