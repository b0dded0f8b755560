//! The audio stream engine: timing reconciliation between the emulation
//! clock and the audio device clock.
//!
//! Two independently-clocked parties meet here. The emulation thread issues
//! sparse speaker on/off commands stamped with wall-clock milliseconds and
//! emulated-CPU cycle counts; the audio device pulls dense fixed-size sample
//! blocks on its own cadence. `AudioStream` queues the commands, maps their
//! timestamps into sample offsets of the block being generated, and
//! synthesizes a square wave (or silence) over each mapped span.
//!
//! The engine is fail-soft: no operation returns an error. A full queue
//! drops events, an invalid frequency becomes silence, and `generate`
//! always fully populates the caller's buffer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::warn;

use crate::queue::{EventQueue, SpeakerEvent};
use crate::waveform::{SquareWave, SILENCE};

/// Maximum speaker volume (amplitude around the PCM8 DC bias of 128).
pub const MAX_VOLUME: u8 = 127;

/// Elapsed-cycle span over which the debounce window scales linearly.
const DELAY_CYCLE_SPAN: f64 = 3600.0;

/// Minimum-duration window for a tone, in milliseconds.
///
/// Pure function of the two cycle counts and the configured delay scalar:
/// zero when no cycles elapsed, scaling linearly with elapsed emulated
/// cycles up to [`DELAY_CYCLE_SPAN`], flat at `note_delay` beyond it. The
/// window deliberately tracks emulated CPU activity rather than real time,
/// so percussive on/off/on command bursts keep an audible duration at any
/// emulation speed.
pub fn local_delay(cycles_prev: u64, cycles_curr: u64, note_delay: f64) -> f64 {
    if cycles_curr <= cycles_prev {
        return 0.0;
    }
    let elapsed = (cycles_curr - cycles_prev) as f64;
    if elapsed > DELAY_CYCLE_SPAN {
        note_delay
    } else {
        elapsed * note_delay / DELAY_CYCLE_SPAN
    }
}

/// PC-speaker stream engine for one audio output device.
///
/// Construct one per output stream and hand it to both the producer
/// (emulation) and consumer (audio callback) call sites; see
/// [`SharedStream`] for the locked two-thread pairing.
#[derive(Debug)]
pub struct AudioStream {
    queue: EventQueue,
    wave: SquareWave,
    /// Negotiated output rate in samples/second, fixed for the stream's life.
    sample_rate: u32,
    /// End time of the previously generated buffer. `None` until the first
    /// `generate` call primes the clock.
    prev_time: Option<f64>,
    volume: u8,
    /// Milliseconds per unit of the elapsed-cycle debounce window.
    note_delay: f64,
}

impl AudioStream {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            queue: EventQueue::new(),
            wave: SquareWave::new(),
            sample_rate,
            prev_time: None,
            volume: MAX_VOLUME,
            note_delay: 1.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Set the speaker volume, clamped to `[0, MAX_VOLUME]`.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
    }

    pub fn note_delay(&self) -> f64 {
        self.note_delay
    }

    pub fn set_note_delay(&mut self, delay: f64) {
        self.note_delay = delay;
    }

    /// Append a "speaker on" command.
    ///
    /// A non-finite or non-positive frequency never reaches the fixed-point
    /// divide; the command is logged and treated as silence.
    pub fn append_on(&mut self, time: f64, cycles: u64, frequency: f64) {
        if !frequency.is_finite() || frequency <= 0.0 {
            warn!("speaker on with invalid frequency {frequency} Hz, treating as silence");
            self.append_off(time, cycles);
            return;
        }
        let time = self.debounced_timestamp(time, cycles);
        self.queue.append(SpeakerEvent::on(time, cycles, frequency));
    }

    /// Append a "speaker off" command.
    pub fn append_off(&mut self, mut time: f64, cycles: u64) {
        // Off commands can arrive stamped before the current buffer start;
        // they must never map behind it.
        if let Some(prev) = self.prev_time {
            if time < prev {
                time = prev;
            }
        }
        let time = self.debounced_timestamp(time, cycles);
        self.queue.append(SpeakerEvent::off(time, cycles));
    }

    /// Let a still-playing note run for at least its debounce window: if the
    /// last queued event is an enabled tone whose projected end lies at or
    /// after `time`, the new event is pulled forward to that end.
    fn debounced_timestamp(&self, time: f64, cycles: u64) -> f64 {
        match self.queue.last() {
            Some(last) if last.enabled => {
                let projected =
                    last.timestamp + local_delay(last.cycle_count, cycles, self.note_delay);
                if projected >= time {
                    projected
                } else {
                    time
                }
            }
            _ => time,
        }
    }

    /// Fill `buffer` with 8-bit unsigned PCM for the period ending around
    /// `time` (wall-clock milliseconds). Always fully populates the buffer.
    pub fn generate(&mut self, time: f64, buffer: &mut [u8]) {
        let len = buffer.len();
        if len == 0 {
            return;
        }

        let Some(prev_time) = self.prev_time else {
            // Priming call: establish the time baseline before attempting
            // any timing math, and emit silence.
            buffer.fill(SILENCE);
            self.queue.clear();
            self.prev_time = Some(time);
            return;
        };

        // Nominal end of this buffer at the negotiated rate. If the device
        // delivered late, mapped time must not regress behind the hardware
        // clock; clamp forward.
        let mut curr_time = prev_time + len as f64 / self.sample_rate as f64 * 1000.0;
        if curr_time < time {
            curr_time = time;
        }

        // Regions no event span covers stay silent.
        buffer.fill(SILENCE);

        if self.queue.is_empty() {
            self.prev_time = Some(time);
            return;
        }

        let span_scale = len as f64 / (curr_time - prev_time);
        let count = self.queue.len();
        let mut i = 0;
        while i < count {
            let event = self.queue.events()[i];

            let from = ((event.timestamp - prev_time) * span_scale) as i64;
            if from >= len as i64 {
                // Belongs to a future buffer; it and everything after it
                // stay queued, unconsumed.
                break;
            }
            let from = from.max(0) as usize;
            // The last event runs to the buffer end; earlier events run to
            // their successor's mapped start.
            let to = if i == count - 1 {
                len
            } else {
                let dto = self.queue.events()[i + 1].timestamp - prev_time;
                ((dto * span_scale) as i64).clamp(0, len as i64) as usize
            };

            if to > from {
                let span = &mut buffer[from..to];
                if event.enabled && event.frequency > 0.0 {
                    self.wave
                        .render(span, event.frequency, self.sample_rate, self.volume);
                } else {
                    self.wave.reset();
                    span.fill(SILENCE);
                }
            }
            i += 1;
        }

        // Compact: drop the consumed prefix but keep the event immediately
        // preceding the unconsumed remainder, which carries the waveform
        // into the next buffer.
        self.queue.drain(i.saturating_sub(1));
        if i > 0 {
            if self.queue.len() == 1 {
                // Lone retained event: resynchronize to the hardware clock.
                curr_time = time;
            }
            self.queue.set_front_timestamp(curr_time);
        }

        self.prev_time = Some(curr_time);
    }
}

/// Cloneable handle pairing the producer (emulation thread) and consumer
/// (audio callback) around one [`AudioStream`].
///
/// Both paths serialize on a single mutex with bounded hold time: no I/O,
/// no waiting, no allocation inside the critical section. A poisoned lock
/// is recovered rather than propagated; the audio callback must keep
/// producing defined output even if the emulation thread panicked.
#[derive(Debug, Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<AudioStream>>,
}

impl SharedStream {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AudioStream::new(sample_rate))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AudioStream> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Producer: start a tone.
    pub fn speaker_on(&self, time: f64, cycles: u64, frequency: f64) {
        self.lock().append_on(time, cycles, frequency);
    }

    /// Producer: stop the tone.
    pub fn speaker_off(&self, time: f64, cycles: u64) {
        self.lock().append_off(time, cycles);
    }

    /// Consumer: fill one audio period.
    pub fn generate(&self, time: f64, buffer: &mut [u8]) {
        self.lock().generate(time, buffer);
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate()
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume()
    }

    pub fn set_volume(&self, volume: u8) {
        self.lock().set_volume(volume);
    }

    pub fn note_delay(&self) -> f64 {
        self.lock().note_delay()
    }

    pub fn set_note_delay(&self, delay: f64) {
        self.lock().set_note_delay(delay);
    }
}
