use beeper_core::AudioStream;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const RATE: u32 = 48000;

/// Milliseconds covered by `len` samples at the bench rate.
fn ms_for(len: usize) -> f64 {
    len as f64 / RATE as f64 * 1000.0
}

/// Stream with the clock already primed, so `generate` takes the mapping path.
fn primed_stream() -> AudioStream {
    let mut stream = AudioStream::new(RATE);
    let mut buf = [0u8; 64];
    stream.generate(0.0, &mut buf);
    stream
}

fn bench_generate_tone(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_tone");

    for len in [512usize, 4096].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let mut stream = primed_stream();
            stream.append_on(0.0, 0, 440.0);
            let mut buf = vec![0u8; len];
            let mut t = 0.0;
            b.iter(|| {
                t += ms_for(len);
                stream.generate(t, &mut buf);
                black_box(buf[0]);
            });
        });
    }

    group.finish();
}

fn bench_generate_silence(c: &mut Criterion) {
    c.bench_function("generate_silence_4096", |b| {
        let mut stream = primed_stream();
        let mut buf = vec![0u8; 4096];
        let mut t = 0.0;
        b.iter(|| {
            t += ms_for(4096);
            stream.generate(t, &mut buf);
            black_box(buf[0]);
        });
    });
}

fn bench_generate_event_train(c: &mut Criterion) {
    // Percussive worst case: a dense on/off train queued each period.
    c.bench_function("generate_event_train_4096", |b| {
        let mut stream = primed_stream();
        let mut buf = vec![0u8; 4096];
        let mut t = 0.0;
        let mut cycles = 0u64;
        b.iter(|| {
            let period = ms_for(4096);
            for i in 0..20u64 {
                let et = t + i as f64 * period / 20.0;
                cycles += 100;
                if i % 2 == 0 {
                    stream.append_on(et, cycles, 220.0 + i as f64 * 40.0);
                } else {
                    stream.append_off(et, cycles);
                }
            }
            t += period;
            stream.generate(t, &mut buf);
            black_box(buf[0]);
        });
    });
}

criterion_group!(
    benches,
    bench_generate_tone,
    bench_generate_silence,
    bench_generate_event_train
);
criterion_main!(benches);
