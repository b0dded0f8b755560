//! Bounded, time-ordered queue of speaker state-change events.
//!
//! The emulation side appends events at the tail; the audio side consumes a
//! prefix on every generated buffer and compacts the remainder to the front.
//! Capacity is fixed so the audio hot path never allocates.

use log::warn;

/// Number of event slots in the queue.
pub const QUEUE_CAPACITY: usize = 64;

/// A timestamped instruction to start or stop a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakerEvent {
    /// Wall-clock milliseconds since stream start. Nondecreasing across the
    /// queue; this is a precondition on the producer, not re-sorted here.
    pub timestamp: f64,
    /// Emulated-CPU cycle count at which the event was issued. Used only for
    /// the debounce window, never for sample mapping.
    pub cycle_count: u64,
    /// Speaker driven (tone) vs. silent.
    pub enabled: bool,
    /// Tone frequency in Hz. Meaningful only when `enabled` is true.
    pub frequency: f64,
}

impl SpeakerEvent {
    /// A "speaker on" event at the given frequency.
    pub fn on(timestamp: f64, cycle_count: u64, frequency: f64) -> Self {
        Self {
            timestamp,
            cycle_count,
            enabled: true,
            frequency,
        }
    }

    /// A "speaker off" event.
    pub fn off(timestamp: f64, cycle_count: u64) -> Self {
        Self {
            timestamp,
            cycle_count,
            enabled: false,
            frequency: 0.0,
        }
    }
}

const EMPTY_SLOT: SpeakerEvent = SpeakerEvent {
    timestamp: 0.0,
    cycle_count: 0,
    enabled: false,
    frequency: 0.0,
};

/// Fixed-capacity event queue with a reserved slot for "off" events.
///
/// One slot is always held back from "on" events so that an "off" can be
/// appended after any run of "on"s: a full queue must never leave the
/// speaker audibly stuck on.
#[derive(Debug)]
pub struct EventQueue {
    entries: [SpeakerEvent; QUEUE_CAPACITY],
    len: usize,
    overrun_flagged: bool,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            entries: [EMPTY_SLOT; QUEUE_CAPACITY],
            len: 0,
            overrun_flagged: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The queued events, oldest first.
    pub fn events(&self) -> &[SpeakerEvent] {
        &self.entries[..self.len]
    }

    /// The most recently appended event, if any.
    pub fn last(&self) -> Option<&SpeakerEvent> {
        self.entries[..self.len].last()
    }

    /// Append an event at the tail, returning whether it was kept.
    ///
    /// "On" events may occupy at most `QUEUE_CAPACITY - 1` slots; the last
    /// slot is reserved for an "off". A dropped event raises the overrun
    /// diagnostic once per episode; further drops are silent until the queue
    /// next compacts.
    pub fn append(&mut self, event: SpeakerEvent) -> bool {
        let limit = if event.enabled {
            QUEUE_CAPACITY - 1
        } else {
            QUEUE_CAPACITY
        };
        if self.len >= limit {
            self.flag_overrun();
            return false;
        }
        self.entries[self.len] = event;
        self.len += 1;
        true
    }

    /// Remove the first `count` events, shifting the remainder to the front.
    ///
    /// Compaction means the queue has recovered capacity, so the overrun
    /// flag is rearmed.
    pub fn drain(&mut self, count: usize) {
        let count = count.min(self.len);
        self.entries.copy_within(count..self.len, 0);
        self.len -= count;
        self.overrun_flagged = false;
    }

    /// Rewrite the front event's timestamp (used when resynchronizing a
    /// retained event to the current callback boundary).
    pub fn set_front_timestamp(&mut self, timestamp: f64) {
        if self.len > 0 {
            self.entries[0].timestamp = timestamp;
        }
    }

    /// Discard all events and rearm the overrun diagnostic.
    pub fn clear(&mut self) {
        self.len = 0;
        self.overrun_flagged = false;
    }

    fn flag_overrun(&mut self) {
        if !self.overrun_flagged {
            warn!("speaker event queue overrun, dropping events");
            self.overrun_flagged = true;
        }
    }

    #[cfg(test)]
    pub(crate) fn overrun_flagged(&self) -> bool {
        self.overrun_flagged
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut q = EventQueue::new();
        assert!(q.append(SpeakerEvent::on(1.0, 10, 440.0)));
        assert!(q.append(SpeakerEvent::off(2.0, 20)));
        assert_eq!(q.len(), 2);
        assert_eq!(q.events()[0].timestamp, 1.0);
        assert!(q.events()[0].enabled);
        assert_eq!(q.events()[1].timestamp, 2.0);
        assert!(!q.events()[1].enabled);
    }

    #[test]
    fn reserved_slot_for_off_event() {
        let mut q = EventQueue::new();

        // QUEUE_CAPACITY - 1 "on" events fit...
        for i in 0..QUEUE_CAPACITY - 1 {
            assert!(q.append(SpeakerEvent::on(i as f64, i as u64, 440.0)));
        }
        // ...but not one more.
        assert!(!q.append(SpeakerEvent::on(100.0, 100, 440.0)));
        assert_eq!(q.len(), QUEUE_CAPACITY - 1);

        // The reserved slot still takes an "off".
        assert!(q.append(SpeakerEvent::off(101.0, 101)));
        assert_eq!(q.len(), QUEUE_CAPACITY);

        // Now the queue is truly full.
        assert!(!q.append(SpeakerEvent::off(102.0, 102)));
    }

    #[test]
    fn overrun_flagged_once_until_drain() {
        let mut q = EventQueue::new();
        for i in 0..QUEUE_CAPACITY - 1 {
            q.append(SpeakerEvent::on(i as f64, i as u64, 440.0));
        }
        assert!(!q.overrun_flagged());

        q.append(SpeakerEvent::on(100.0, 100, 440.0));
        assert!(q.overrun_flagged());

        // Dropping more events while flagged stays flagged (single episode).
        q.append(SpeakerEvent::on(101.0, 101, 440.0));
        assert!(q.overrun_flagged());

        // Compaction rearms the diagnostic.
        q.drain(10);
        assert!(!q.overrun_flagged());
        assert_eq!(q.len(), QUEUE_CAPACITY - 1 - 10);
    }

    #[test]
    fn drain_shifts_remainder_to_front() {
        let mut q = EventQueue::new();
        for i in 0..5 {
            q.append(SpeakerEvent::on(i as f64, i as u64, 440.0));
        }
        q.drain(3);
        assert_eq!(q.len(), 2);
        assert_eq!(q.events()[0].timestamp, 3.0);
        assert_eq!(q.events()[1].timestamp, 4.0);
    }

    #[test]
    fn drain_zero_is_a_noop_on_contents() {
        let mut q = EventQueue::new();
        q.append(SpeakerEvent::on(1.0, 1, 440.0));
        q.drain(0);
        assert_eq!(q.len(), 1);
        assert_eq!(q.events()[0].timestamp, 1.0);
    }

    #[test]
    fn set_front_timestamp_rewrites_first_event() {
        let mut q = EventQueue::new();
        q.append(SpeakerEvent::on(1.0, 1, 440.0));
        q.append(SpeakerEvent::off(2.0, 2));
        q.set_front_timestamp(5.5);
        assert_eq!(q.events()[0].timestamp, 5.5);
        assert_eq!(q.events()[1].timestamp, 2.0);
    }

    #[test]
    fn clear_empties_queue() {
        let mut q = EventQueue::new();
        q.append(SpeakerEvent::on(1.0, 1, 440.0));
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.last(), None);
    }
}
