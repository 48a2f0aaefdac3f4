//! Pending-event queue with a total delivery order.
//!
//! Submission assigns each event a monotonically increasing identifier;
//! delivery pops events due at or before the requested time one at a time,
//! smallest `(time, priority, id)` first. Two runs that submit the same
//! operations for the same timestamps therefore deliver them identically
//! regardless of submission order, because priorities break same-time ties
//! before the submission identifier ever has to. Popping one event per
//! delivery also means a failed delivery consumes only its own event: the
//! rest of the queue persists for the next flush.

use std::cmp::Ordering;

use vitro_core::{EventId, EventPayload, EventPriority, Hours, ScheduledEvent, VesselId};

/// Queue of not-yet-delivered event envelopes.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    pending: Vec<ScheduledEvent>,
    next_id: u64,
}

impl Scheduler {
    /// Enqueues an operation for delivery at `time`.
    pub(crate) fn submit(
        &mut self,
        vessel: VesselId,
        payload: EventPayload,
        time: Hours,
        duration: Hours,
        priority: EventPriority,
    ) -> EventId {
        let id = EventId::new(self.next_id);
        self.next_id += 1;
        self.pending
            .push(ScheduledEvent::new(id, vessel, payload, time, duration, priority));
        id
    }

    /// Removes and returns the next event due at or before `now`, smallest
    /// delivery-order key first; later events stay pending.
    pub(crate) fn pop_due(&mut self, now: Hours) -> Option<ScheduledEvent> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, event)| event.time().total_cmp(&now) != Ordering::Greater)
            .min_by(|(_, left), (_, right)| {
                let (left_time, left_priority, left_id) = left.order_key();
                let (right_time, right_priority, right_id) = right.order_key();
                left_time
                    .total_cmp(&right_time)
                    .then_with(|| left_priority.cmp(&right_priority))
                    .then_with(|| left_id.cmp(&right_id))
            })
            .map(|(index, _)| index)?;
        Some(self.pending.remove(index))
    }

    /// Earliest pending delivery time strictly after `after` and at or
    /// before `upto`, if any.
    pub(crate) fn earliest_between(&self, after: Hours, upto: Hours) -> Option<Hours> {
        self.pending
            .iter()
            .map(ScheduledEvent::time)
            .filter(|time| {
                time.total_cmp(&after) == Ordering::Greater
                    && time.total_cmp(&upto) != Ordering::Greater
            })
            .min_by(Hours::total_cmp)
    }

    /// Number of events still waiting for delivery.
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
