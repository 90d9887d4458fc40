//! Spectrum analyzer
//!
//! The audio thread pushes samples into a FIFO. Each time the FIFO fills and
//! the display slot is free, a Hann-windowed real FFT is taken and its
//! magnitudes are resampled onto a log-skewed set of display bins. The
//! display thread picks up finished frames through a [`SpectrumReader`].

mod slot;

pub use slot::FrameSlot;

use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// FFT order used when none is configured (2048 points)
pub const DEFAULT_FFT_ORDER: u32 = 11;
/// Display bins used when none is configured
pub const DEFAULT_SCOPE_SIZE: usize = 512;
/// Smallest accepted FFT order
pub const MIN_FFT_ORDER: u32 = 6;
/// Largest accepted FFT order
pub const MAX_FFT_ORDER: u32 = 15;

/// Frequency-axis skew: low display bins get more resolution
const SKEW: f32 = 0.2;

/// Create a connected analyzer (audio side) and reader (display side)
pub fn spectrum_channel(fft_order: u32, scope_size: usize) -> (SpectrumAnalyzer, SpectrumReader) {
    let fft_order = fft_order.clamp(MIN_FFT_ORDER, MAX_FFT_ORDER);
    let scope_size = scope_size.max(1);
    let slot = Arc::new(FrameSlot::new(scope_size));

    let analyzer = SpectrumAnalyzer::new(fft_order, scope_size, Arc::clone(&slot));
    let reader = SpectrumReader {
        slot,
        frame: vec![0.0; scope_size],
    };
    (analyzer, reader)
}

/// Proportion of the FFT range shown at display bin `index`
pub fn skew_proportion(index: usize, scope_size: usize) -> f32 {
    let x = index as f32 / scope_size as f32;
    1.0 - ((1.0 - x).ln() * SKEW).exp()
}

/// FFT bin sampled by display bin `index`
pub fn display_bin(index: usize, scope_size: usize, fft_size: usize) -> usize {
    let half = fft_size / 2;
    let bin = (skew_proportion(index, scope_size) * half as f32) as usize;
    bin.min(half)
}

/// Producer side: owned by the audio thread
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn RealToComplex<f32>>,

    fifo: Vec<f32>,
    fifo_index: usize,

    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,

    bin_map: Vec<usize>,
    display: Vec<f32>,
    slot: Arc<FrameSlot>,
    frames_computed: u64,
}

impl SpectrumAnalyzer {
    fn new(fft_order: u32, scope_size: usize, slot: Arc<FrameSlot>) -> Self {
        let fft_size = 1usize << fft_order;

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / (fft_size as f32 - 1.0);
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        let bin_map = (0..scope_size)
            .map(|i| display_bin(i, scope_size, fft_size))
            .collect();

        Self {
            fft_size,
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            fifo: vec![0.0; fft_size],
            fifo_index: 0,
            window,
            bin_map,
            display: vec![0.0; scope_size],
            slot,
            frames_computed: 0,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn scope_size(&self) -> usize {
        self.display.len()
    }

    /// Frames published since construction
    pub fn frames_computed(&self) -> u64 {
        self.frames_computed
    }

    /// Feed one sample. Computes and publishes a frame when the FIFO fills
    /// and the reader has taken the previous one.
    pub fn push_sample(&mut self, sample: f32) {
        self.fifo[self.fifo_index] = sample;
        self.fifo_index += 1;

        if self.fifo_index == self.fft_size {
            if self.slot.is_free() {
                self.compute_frame();
            }
            self.fifo_index = 0;
        }
    }

    /// Feed a block of samples
    pub fn push_block(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push_sample(sample);
        }
    }

    fn compute_frame(&mut self) {
        for ((dst, &sample), &w) in self.input.iter_mut().zip(&self.fifo).zip(&self.window) {
            *dst = sample * w;
        }

        if self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            return;
        }

        let norm = 1.0 / (self.fft_size / 2) as f32;
        for (value, &bin) in self.display.iter_mut().zip(&self.bin_map) {
            let magnitude = self.spectrum[bin].norm() * norm;
            *value = (magnitude * 2.0).clamp(0.0, 1.0);
        }

        if self.slot.try_publish(&self.display) {
            self.frames_computed += 1;
        }
    }
}

/// Consumer side: owned by the display thread
#[derive(Debug)]
pub struct SpectrumReader {
    slot: Arc<FrameSlot>,
    frame: Vec<f32>,
}

impl SpectrumReader {
    pub fn scope_size(&self) -> usize {
        self.frame.len()
    }

    /// Take the pending frame, if any. Each frame is returned once.
    pub fn consume_if_ready(&mut self) -> Option<&[f32]> {
        if self.slot.try_take(&mut self.frame) {
            Some(&self.frame)
        } else {
            None
        }
    }

    /// The most recently consumed frame (silence before the first)
    pub fn last_frame(&self) -> &[f32] {
        &self.frame
    }
}
