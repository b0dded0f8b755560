mod settings;

use beeper_core::SharedStream;
use rodio::{OutputStream, Source};
use settings::Settings;
use std::time::{Duration, Instant};

/// Samples pulled from the engine per refill. Small enough to keep command
/// latency low, large enough to keep lock traffic negligible.
const BLOCK_LEN: usize = 512;

/// Emulated-CPU cycles per wall-clock millisecond fed to the debounce
/// policy. Roughly a 3.58 MHz beeper-era machine.
const CYCLES_PER_MS: u64 = 3580;

/// Wall-clock milliseconds since stream start, the time base both the
/// producer and consumer stamp their calls with.
fn now_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Streaming audio source pulling fixed blocks from the engine. The engine
/// itself degrades to silence when no commands are queued, so the device
/// never underruns.
struct StreamSource {
    stream: SharedStream,
    started: Instant,
    // Cached so the device pull path never locks the engine just to read a
    // rate that is fixed for the stream's life.
    sample_rate: u32,
    block: [u8; BLOCK_LEN],
    pos: usize,
}

impl StreamSource {
    fn new(stream: SharedStream, started: Instant) -> Self {
        let sample_rate = stream.sample_rate();
        Self {
            stream,
            started,
            sample_rate,
            block: [0; BLOCK_LEN],
            // Start exhausted so the first next() primes the engine clock.
            pos: BLOCK_LEN,
        }
    }
}

impl Iterator for StreamSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= BLOCK_LEN {
            self.stream.generate(now_ms(self.started), &mut self.block);
            self.pos = 0;
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        // PCM8 is DC-centered at 128
        Some((sample as f32 - 128.0) / 128.0)
    }
}

impl Source for StreamSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// A short demo melody: (frequency Hz, note ms). Rests use frequency 0.
const MELODY: &[(f64, u64)] = &[
    (261.63, 180),
    (329.63, 180),
    (392.00, 180),
    (523.25, 360),
    (0.0, 120),
    (523.25, 120),
    (392.00, 120),
    (329.63, 120),
    (261.63, 420),
];

fn run_producer(stream: SharedStream, started: Instant) {
    for &(freq, duration) in MELODY {
        let t = now_ms(started);
        let cycles = t as u64 * CYCLES_PER_MS;
        if freq > 0.0 {
            stream.speaker_on(t, cycles, freq);
        } else {
            stream.speaker_off(t, cycles);
        }
        std::thread::sleep(Duration::from_millis(duration));
    }

    let t = now_ms(started);
    stream.speaker_off(t, t as u64 * CYCLES_PER_MS);
}

fn main() {
    env_logger::init();

    let settings = Settings::load();
    if !Settings::config_path().exists() {
        if let Err(e) = settings.save() {
            eprintln!("Warning: Failed to save settings: {}", e);
        }
    }
    log::info!(
        "beeper demo: {} Hz, volume {}, note delay {} ms",
        settings.sample_rate,
        settings.volume,
        settings.note_delay
    );

    let stream = SharedStream::new(settings.sample_rate);
    stream.set_volume(settings.volume);
    stream.set_note_delay(settings.note_delay);

    // Initialize audio output
    let (_output, handle) = match OutputStream::try_default() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize audio output: {}", e);
            return;
        }
    };

    let started = Instant::now();
    let source = StreamSource::new(stream.clone(), started);
    if let Err(e) = handle.play_raw(source.convert_samples()) {
        eprintln!("Failed to start audio playback: {}", e);
        return;
    }

    let producer = {
        let stream = stream.clone();
        std::thread::spawn(move || run_producer(stream, started))
    };

    if let Err(e) = producer.join() {
        log::error!("producer thread panicked: {:?}", e);
    }

    // Let the tail of the last note drain through the device before exiting.
    std::thread::sleep(Duration::from_millis(300));
}
