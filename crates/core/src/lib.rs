//! PC-speaker audio stream engine.
//!
//! Converts a sparse, irregularly-timed stream of speaker on/off commands
//! (from an emulated CPU running at variable real-world speed) into a dense,
//! fixed-rate stream of 8-bit unsigned PCM mono samples (DC-centered at 128)
//! pulled by an audio output device.
//!
//! The engine reconciles two independent clocks: the emulation thread's
//! wall-clock command timestamps and the audio hardware's pull cadence. It
//! does not own the audio device, pick the sample rate, or resample; a
//! frontend negotiates the device and calls [`AudioStream::generate`] from
//! its callback.

pub mod queue;
pub mod stream;
pub mod waveform;

pub use queue::{EventQueue, SpeakerEvent, QUEUE_CAPACITY};
pub use stream::{local_delay, AudioStream, SharedStream, MAX_VOLUME};
pub use waveform::{SquareWave, SILENCE};
