/// A planar buffer of audio frames with a fixed channel count.
///
/// Channel `c` occupies `data[c * frames..(c + 1) * frames]`. Blocks are
/// allocated when an engine is prepared and reused for every render call
/// afterwards, so none of the per-block methods allocate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBlock {
    channels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl AudioBlock {
    /// Creates a silent block.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            data: vec![0.0; channels * frames],
        }
    }

    /// Creates a block from planar channel data. Channels longer than the
    /// shortest one are truncated.
    pub fn from_channels(channels: &[Vec<f32>]) -> Self {
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let mut block = Self::new(channels.len(), frames);
        for (c, channel) in channels.iter().enumerate() {
            block.channel_mut(c).copy_from_slice(&channel[..frames]);
        }
        block
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns true if both blocks have the same channel count and length.
    pub fn same_shape(&self, other: &AudioBlock) -> bool {
        self.channels == other.channels && self.frames == other.frames
    }

    /// Changes the shape of the block and silences it. This allocates when
    /// the block grows.
    pub fn resize(&mut self, channels: usize, frames: usize) {
        self.channels = channels;
        self.frames = frames;
        self.data.clear();
        self.data.resize(channels * frames, 0.0);
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    pub fn channels_iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.frames.max(1))
    }

    pub fn channels_iter_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_mut(self.frames.max(1))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Fills the block with silence.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Copies the samples of a block with the same shape into this one.
    pub fn copy_from(&mut self, other: &AudioBlock) {
        debug_assert!(self.same_shape(other));
        let len = self.data.len().min(other.data.len());
        self.data[..len].copy_from_slice(&other.data[..len]);
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|s| s.is_finite())
    }

    /// Root mean square over all channels.
    pub fn rms(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.data.iter().map(|s| s * s).sum();
        (sum / self.data.len() as f32).sqrt()
    }

    /// Writes the block into an interleaved buffer of `channels * frames`
    /// samples.
    pub fn write_interleaved(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.data.len());
        for (c, channel) in self.channels_iter().enumerate().take(self.channels) {
            for (n, sample) in channel.iter().enumerate() {
                if let Some(slot) = out.get_mut(n * self.channels + c) {
                    *slot = *sample;
                }
            }
        }
    }

    /// Reads an interleaved buffer of `channels * frames` samples into the
    /// block.
    pub fn read_interleaved(&mut self, input: &[f32]) {
        debug_assert_eq!(input.len(), self.data.len());
        let channels = self.channels;
        for (c, channel) in self.channels_iter_mut().enumerate().take(channels) {
            for (n, sample) in channel.iter_mut().enumerate() {
                *sample = input.get(n * channels + c).copied().unwrap_or(0.0);
            }
        }
    }
}
