//! Planar multi-channel sample buffer

/// Non-interleaved audio, one `Vec` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    len: usize,
}

impl AudioBuffer {
    /// Allocate a silent buffer
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            len: num_samples,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames currently in use
    pub fn num_samples(&self) -> usize {
        self.len
    }

    /// Allocated frames per channel
    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Use the first `len` frames of the allocation. Never reallocates.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.capacity());
    }

    /// Zero the frames in use
    pub fn clear(&mut self) {
        let len = self.len;
        for channel in &mut self.channels {
            channel[..len].fill(0.0);
        }
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.len]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let len = self.len;
        &mut self.channels[index][..len]
    }

    /// Accumulate into one sample. Out-of-range positions are ignored.
    pub fn add_sample(&mut self, channel: usize, index: usize, value: f32) {
        if index >= self.len {
            return;
        }
        if let Some(samples) = self.channels.get_mut(channel) {
            samples[index] += value;
        }
    }

    /// Multiply every sample in use by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        let len = self.len;
        for channel in &mut self.channels {
            for sample in &mut channel[..len] {
                *sample *= gain;
            }
        }
    }

    /// Largest absolute sample in use
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c[..self.len].iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Sample for device channel `out_channel` at `frame`. A mono buffer
    /// feeds every device channel; device channels beyond the buffer get
    /// silence.
    pub fn output_sample(&self, frame: usize, out_channel: usize) -> f32 {
        if frame >= self.len {
            return 0.0;
        }
        if self.channels.len() == 1 {
            return self.channels[0][frame];
        }
        self.channels.get(out_channel).map_or(0.0, |c| c[frame])
    }
}
