//! Fixed-point square wave synthesis.
//!
//! Tones routinely span many generated buffers, so the synthesizer keeps a
//! running sample counter and derives the phase from it in fixed point
//! (8 fractional bits). Floating-point phase would drift audibly over a
//! long-held note; the fixed-point counter cannot.

/// PCM8 silence level. Output is DC-centered here.
pub const SILENCE: u8 = 128;

/// Phase advance per output sample, in 8-fractional-bit fixed point.
const PHASE_STEP: u64 = 256;

/// Mask dropping the fractional phase bits for the half-period comparison.
const FRAC_MASK: u64 = 0xFF;

/// Square wave generator with cross-buffer phase continuity.
#[derive(Debug, Clone)]
pub struct SquareWave {
    /// Samples synthesized since the last transition to silence.
    sample_ctr: u64,
}

impl SquareWave {
    pub fn new() -> Self {
        Self { sample_ctr: 0 }
    }

    /// Reset the phase. Called whenever output transitions to silence, so a
    /// following tone starts at the beginning of its period.
    pub fn reset(&mut self) {
        self.sample_ctr = 0;
    }

    /// Fill `out` with a square wave at `frequency` Hz.
    ///
    /// Samples are `SILENCE + volume` for the first half-period and
    /// `SILENCE - volume` for the second. The half-period length is
    /// `(sample_rate << 8) / (2 * frequency)` in 8-fractional-bit fixed
    /// point; a degenerate half-period of zero (frequency beyond the
    /// representable range) fills silence instead of dividing the phase
    /// by it.
    pub fn render(&mut self, out: &mut [u8], frequency: f64, sample_rate: u32, volume: u8) {
        let half_period = (((sample_rate as u64) << 8) as f64 / (frequency * 2.0)) as u64;
        if half_period == 0 {
            out.fill(SILENCE);
            return;
        }

        let period = half_period << 1;
        let high = SILENCE + volume;
        let low = SILENCE - volume;
        let mut phase = (self.sample_ctr * PHASE_STEP) % period;
        for sample in out.iter_mut() {
            *sample = if (phase & !FRAC_MASK) < (half_period & !FRAC_MASK) {
                high
            } else {
                low
            };
            phase = (phase + PHASE_STEP) % period;
        }
        self.sample_ctr += out.len() as u64;
    }
}

impl Default for SquareWave {
    fn default() -> Self {
        Self::new()
    }
}
