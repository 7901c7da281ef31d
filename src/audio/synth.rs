//! Capture simulator: PCM to 8-bit frequency-domain frames
//!
//! Produces frames in the layout the capture layer delivers:
//! `[DC, Nyquist, re1, im1, re2, im2, ...]`, each value a signed byte.

use super::spectrum::Frame;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Hann-windowed FFT of a fixed capture size
pub struct FrameSynth {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    capture_size: usize,
    sample_rate: u32,
}

impl FrameSynth {
    /// `capture_size` is rounded down to an even count of at least 4.
    pub fn new(capture_size: usize, sample_rate: u32) -> Self {
        let capture_size = capture_size.max(4) & !1;

        let window: Vec<f32> = (0..capture_size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (capture_size - 1) as f32).cos())
            })
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(capture_size);

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); capture_size],
            capture_size,
            sample_rate,
        }
    }

    pub fn capture_size(&self) -> usize {
        self.capture_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Transform one block of mono PCM in [-1, 1]. Short input is zero
    /// padded, long input truncated to the capture size.
    pub fn synthesize(&mut self, pcm: &[f32], timestamp_ms: u64) -> Frame {
        let n = self.capture_size;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = pcm.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 256.0 / n as f32;
        let quantize = |v: f32| (v * scale).round().clamp(-128.0, 127.0) as i8;

        let mut data = vec![0i8; n];
        data[0] = quantize(self.buffer[0].re);
        data[1] = quantize(self.buffer[n / 2].re);
        for k in 1..n / 2 {
            data[2 * k] = quantize(self.buffer[k].re);
            data[2 * k + 1] = quantize(self.buffer[k].im);
        }

        Frame::new(data, self.sample_rate, timestamp_ms)
    }
}

/// Sine wave PCM block
pub fn tone(frequency_hz: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            amplitude
                * (2.0 * std::f32::consts::PI * frequency_hz * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

/// Silent PCM block
pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}
