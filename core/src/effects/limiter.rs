use crate::AudioBlock;

/// Follows the loudness of one channel and scales samples down when it
/// rises above full scale.
#[derive(Debug, Clone)]
struct ChannelLimiter {
    loudness: f32,
    attack: f32,
    falloff: f32,
    min_thresh: f32,
}

impl Default for ChannelLimiter {
    fn default() -> Self {
        ChannelLimiter {
            loudness: 1.0,
            attack: 100.0,
            falloff: 16000.0,
            min_thresh: 1.0,
        }
    }
}

impl ChannelLimiter {
    #[inline(always)]
    fn limit(&mut self, val: f32) -> f32 {
        let abs = val.abs();
        if self.loudness > abs {
            self.loudness = (self.loudness * self.falloff + abs) / (self.falloff + 1.0);
        } else {
            self.loudness = (self.loudness * self.attack + abs) / (self.attack + 1.0);
        }

        if self.loudness < self.min_thresh {
            self.loudness = self.min_thresh;
        }

        val / self.loudness
    }
}

/// A multi-channel output limiter.
///
/// Signals that stay within full scale pass unchanged. Louder signals are
/// pulled back by an envelope with a fast attack and a slow release.
#[derive(Debug, Clone)]
pub struct VolumeLimiter {
    channels: Vec<ChannelLimiter>,
}

impl VolumeLimiter {
    /// Initializes a new limiter with a specified audio channel count.
    pub fn new(channel_count: u16) -> VolumeLimiter {
        VolumeLimiter {
            channels: vec![ChannelLimiter::default(); channel_count.max(1) as usize],
        }
    }

    pub fn reset(&mut self) {
        self.channels.fill(ChannelLimiter::default());
    }

    /// Limits an interleaved sample buffer in place.
    pub fn limit(&mut self, samples: &mut [f32]) {
        let channel_count = self.channels.len();
        for (i, s) in samples.iter_mut().enumerate() {
            *s = self.channels[i % channel_count].limit(*s);
        }
    }

    /// Limits a planar block in place. Extra block channels share the last
    /// limiter.
    pub fn limit_block(&mut self, block: &mut AudioBlock) {
        let last = self.channels.len() - 1;
        for (c, samples) in block.channels_iter_mut().enumerate() {
            let limiter = &mut self.channels[c.min(last)];
            for s in samples.iter_mut() {
                *s = limiter.limit(*s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signals_pass_unchanged() {
        let mut limiter = VolumeLimiter::new(2);
        let mut samples: Vec<f32> = (0..256).map(|i| ((i as f32) * 0.1).sin() * 0.8).collect();
        let expected = samples.clone();
        limiter.limit(&mut samples);
        assert_eq!(samples, expected);
    }

    #[test]
    fn loud_signals_are_pulled_back() {
        let mut limiter = VolumeLimiter::new(1);
        let mut samples = vec![4.0f32; 4096];
        limiter.limit(&mut samples);
        assert!(samples[4095] < 1.1, "{}", samples[4095]);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn planar_and_interleaved_agree() {
        let left: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin() * 3.0).collect();
        let right: Vec<f32> = (0..64).map(|i| (i as f32 * 0.7).cos() * 2.0).collect();

        let mut block = AudioBlock::from_channels(&[left, right]);
        let mut interleaved = vec![0.0; 128];
        block.write_interleaved(&mut interleaved);

        VolumeLimiter::new(2).limit(&mut interleaved);
        VolumeLimiter::new(2).limit_block(&mut block);

        let mut expected = vec![0.0; 128];
        block.write_interleaved(&mut expected);
        assert_eq!(interleaved, expected);
    }
}
