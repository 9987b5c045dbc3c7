// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded MAC FIFO with per-period statistics.
//!
//! One FIFO per QoS priority on the terminal side, one per carrier on the
//! gateway side. The FIFO is the only state shared between block threads, so
//! every operation takes the internal mutex and none of them performs
//! external work while holding it.
//!
//! Overflow policy is tail drop: a `push` on a full queue fails, the element
//! is counted in `drop_pkt` and the caller keeps ownership.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::telemetry::ProbeRegistry;
use crate::types::{Esn0Db, Qos, VolBytes, VolPkt};
use crate::{Error, Result};

/// One queued MAC packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoElement {
    /// Source terminal.
    pub tal_id: crate::types::TalId,
    /// QoS priority the element was classified into.
    pub qos: Qos,
    /// Encapsulated payload bytes.
    pub payload: Vec<u8>,
}

impl FifoElement {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Snapshot of FIFO statistics over one sampling period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoStats {
    /// Elements currently queued.
    pub current_pkt: VolPkt,
    /// Bytes currently queued.
    pub current_bytes: VolBytes,
    /// Elements enqueued during the period.
    pub in_pkt: VolPkt,
    /// Bytes enqueued during the period.
    pub in_bytes: VolBytes,
    /// Elements dequeued during the period.
    pub out_pkt: VolPkt,
    /// Bytes dequeued during the period.
    pub out_bytes: VolBytes,
    /// Elements tail-dropped during the period.
    pub drop_pkt: VolPkt,
    /// Bytes tail-dropped during the period.
    pub drop_bytes: VolBytes,
}

#[derive(Debug, Default)]
struct FifoInner {
    queue: VecDeque<FifoElement>,
    current_bytes: VolBytes,
    in_pkt: VolPkt,
    in_bytes: VolBytes,
    out_pkt: VolPkt,
    out_bytes: VolBytes,
    drop_pkt: VolPkt,
    drop_bytes: VolBytes,
}

/// Reason a FIFO was force-cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The owning terminal logged off.
    TerminalGone,
    /// The owning block is shutting down.
    Shutdown,
}

/// Thread-safe bounded FIFO of MAC packets.
#[derive(Debug)]
pub struct DvbFifo {
    /// QoS priority served by this queue.
    qos: Qos,
    /// Human-readable name used in logs and probe names.
    name: String,
    max_pkt: VolPkt,
    /// Optional CNI annotation read by the scheduler when building SACs.
    cni: Mutex<Option<Esn0Db>>,
    probes: Option<Arc<ProbeRegistry>>,
    inner: Mutex<FifoInner>,
}

impl DvbFifo {
    /// Create a FIFO for `qos` holding at most `max_pkt` elements.
    pub fn new(qos: Qos, name: &str, max_pkt: VolPkt) -> Self {
        Self {
            qos,
            name: name.to_owned(),
            max_pkt,
            cni: Mutex::new(None),
            probes: None,
            inner: Mutex::new(FifoInner::default()),
        }
    }

    /// Mirror drops on the node's probe counters.
    pub fn with_probes(mut self, probes: Arc<ProbeRegistry>) -> Self {
        self.probes = Some(probes);
        self
    }

    /// QoS priority served by this queue.
    pub fn qos(&self) -> Qos {
        self.qos
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of queued elements.
    pub fn max_pkt(&self) -> VolPkt {
        self.max_pkt
    }

    /// Append an element; fails with [`Error::FifoFull`] on overflow.
    pub fn push(&self, elem: FifoElement) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.queue.len() as VolPkt >= self.max_pkt {
            inner.drop_pkt += 1;
            inner.drop_bytes += elem.len() as VolBytes;
            drop(inner);
            if let Some(probes) = &self.probes {
                probes.record_error(&Error::FifoFull);
            }
            return Err(Error::FifoFull);
        }
        inner.in_pkt += 1;
        inner.in_bytes += elem.len() as VolBytes;
        inner.current_bytes += elem.len() as VolBytes;
        inner.queue.push_back(elem);
        Ok(())
    }

    /// Reinsert a fragment at the head.
    ///
    /// Does not count as a new arrival: the bytes were already accounted
    /// when the original element entered the queue. Head reinsertion is
    /// always accepted so a fragmenting scheduler cannot lose data.
    pub fn push_front(&self, elem: FifoElement) {
        let mut inner = self.inner.lock();
        inner.current_bytes += elem.len() as VolBytes;
        // out-counters recorded the full element at pop; compensate for the
        // part coming back
        inner.out_pkt = inner.out_pkt.saturating_sub(1);
        inner.out_bytes = inner.out_bytes.saturating_sub(elem.len() as VolBytes);
        inner.queue.push_front(elem);
    }

    /// Remove and return the head element.
    pub fn pop(&self) -> Option<FifoElement> {
        let mut inner = self.inner.lock();
        let elem = inner.queue.pop_front()?;
        inner.out_pkt += 1;
        inner.out_bytes += elem.len() as VolBytes;
        inner.current_bytes -= elem.len() as VolBytes;
        Some(elem)
    }

    /// Current number of queued elements.
    pub fn current_pkt(&self) -> VolPkt {
        self.inner.lock().queue.len() as VolPkt
    }

    /// Current number of queued bytes.
    pub fn current_bytes(&self) -> VolBytes {
        self.inner.lock().current_bytes
    }

    /// Annotate the queue with the CNI to advertise in the next SAC.
    pub fn set_cni(&self, cni_db: Esn0Db) {
        *self.cni.lock() = Some(cni_db);
    }

    /// Last CNI annotation, if any.
    pub fn cni(&self) -> Option<Esn0Db> {
        *self.cni.lock()
    }

    /// Snapshot the period statistics and reset the period counters.
    ///
    /// `current_pkt` / `current_bytes` describe the instant of the call and
    /// are not reset.
    pub fn get_stats_context(&self) -> FifoStats {
        let mut inner = self.inner.lock();
        let stats = FifoStats {
            current_pkt: inner.queue.len() as VolPkt,
            current_bytes: inner.current_bytes,
            in_pkt: inner.in_pkt,
            in_bytes: inner.in_bytes,
            out_pkt: inner.out_pkt,
            out_bytes: inner.out_bytes,
            drop_pkt: inner.drop_pkt,
            drop_bytes: inner.drop_bytes,
        };
        inner.in_pkt = 0;
        inner.in_bytes = 0;
        inner.out_pkt = 0;
        inner.out_bytes = 0;
        inner.drop_pkt = 0;
        inner.drop_bytes = 0;
        stats
    }

    /// Drop every queued element, returning how many were discarded.
    pub fn clear(&self, reason: ClearReason) -> VolPkt {
        let mut inner = self.inner.lock();
        let dropped = inner.queue.len() as VolPkt;
        let bytes = inner.current_bytes;
        inner.queue.clear();
        inner.current_bytes = 0;
        inner.drop_pkt += dropped;
        inner.drop_bytes += bytes;
        if dropped > 0 {
            log::info!(
                "[DvbFifo] {}: cleared {} packets ({:?})",
                self.name,
                dropped,
                reason
            );
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(tal_id: u16, len: usize) -> FifoElement {
        FifoElement {
            tal_id,
            qos: 0,
            payload: vec![0xAB; len],
        }
    }

    #[test]
    fn test_push_pop_fifo_order() {
        let fifo = DvbFifo::new(0, "EF", 10);
        fifo.push(elem(1, 4)).unwrap();
        fifo.push(elem(2, 8)).unwrap();
        assert_eq!(fifo.pop().unwrap().tal_id, 1);
        assert_eq!(fifo.pop().unwrap().tal_id, 2);
        assert!(fifo.pop().is_none());
    }

    #[test]
    fn test_counters_track_queue() {
        let fifo = DvbFifo::new(0, "EF", 10);
        fifo.push(elem(1, 4)).unwrap();
        fifo.push(elem(1, 6)).unwrap();
        assert_eq!(fifo.current_pkt(), 2);
        assert_eq!(fifo.current_bytes(), 10);
        fifo.pop().unwrap();
        assert_eq!(fifo.current_pkt(), 1);
        assert_eq!(fifo.current_bytes(), 6);
    }

    #[test]
    fn test_overflow_tail_drops() {
        let fifo = DvbFifo::new(0, "BE", 2);
        fifo.push(elem(1, 4)).unwrap();
        fifo.push(elem(1, 4)).unwrap();
        assert!(matches!(fifo.push(elem(1, 4)), Err(Error::FifoFull)));
        assert_eq!(fifo.current_pkt(), 2);
        let stats = fifo.get_stats_context();
        assert_eq!(stats.drop_pkt, 1);
        assert_eq!(stats.drop_bytes, 4);
        assert_eq!(stats.in_pkt, 2);
    }

    #[test]
    fn test_push_front_does_not_count_as_arrival() {
        let fifo = DvbFifo::new(0, "EF", 10);
        fifo.push(elem(1, 10)).unwrap();
        let mut head = fifo.pop().unwrap();
        head.payload.truncate(6); // pretend 4 bytes were sent
        fifo.push_front(head);

        let stats = fifo.get_stats_context();
        assert_eq!(stats.in_pkt, 1);
        assert_eq!(stats.out_pkt, 0);
        assert_eq!(stats.current_pkt, 1);
        assert_eq!(stats.current_bytes, 6);
        assert_eq!(fifo.pop().unwrap().len(), 6);
    }

    #[test]
    fn test_stats_reset_per_period() {
        let fifo = DvbFifo::new(0, "EF", 10);
        fifo.push(elem(1, 4)).unwrap();
        fifo.pop().unwrap();
        let first = fifo.get_stats_context();
        assert_eq!(first.in_pkt, 1);
        assert_eq!(first.out_pkt, 1);

        let second = fifo.get_stats_context();
        assert_eq!(second.in_pkt, 0);
        assert_eq!(second.out_pkt, 0);
    }

    #[test]
    fn test_clear_reports_drops() {
        let fifo = DvbFifo::new(1, "NM", 10);
        fifo.push(elem(1, 4)).unwrap();
        fifo.push(elem(1, 4)).unwrap();
        assert_eq!(fifo.clear(ClearReason::TerminalGone), 2);
        assert_eq!(fifo.current_pkt(), 0);
        assert_eq!(fifo.current_bytes(), 0);
        let stats = fifo.get_stats_context();
        assert_eq!(stats.drop_pkt, 2);
        assert_eq!(stats.drop_bytes, 8);
    }

    #[test]
    fn test_overflow_counted_on_probes() {
        use crate::telemetry::counters;

        let probes = Arc::new(ProbeRegistry::new());
        let fifo = DvbFifo::new(0, "BE", 1).with_probes(probes.clone());
        fifo.push(elem(1, 4)).unwrap();
        assert!(fifo.push(elem(1, 4)).is_err());
        assert!(fifo.push(elem(1, 4)).is_err());
        assert_eq!(probes.value(counters::FIFO_FULL), 2);
    }

    #[test]
    fn test_cni_annotation() {
        let fifo = DvbFifo::new(0, "EF", 10);
        assert!(fifo.cni().is_none());
        fifo.set_cni(7.5);
        assert_eq!(fifo.cni(), Some(7.5));
    }
}
