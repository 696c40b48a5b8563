use crate::{params::ParameterSnapshot, AudioBlock};

mod filter;
pub use filter::*;

mod reverb;
pub use reverb::*;

mod limiter;
pub use limiter::*;

/// An in-place processor applied to the mixed block.
///
/// Buffers are allocated in `prepare`. `process` and `update_parameters` run
/// on the render thread and must not allocate.
pub trait EffectUnit: Send {
    type Params: Copy + PartialEq;

    fn prepare(&mut self, sample_rate: u32, block_size: usize, channels: usize);

    /// Clears all internal state (delay lines, filter memory).
    fn reset(&mut self);

    fn update_parameters(&mut self, params: &Self::Params);

    fn process(&mut self, block: &mut AudioBlock);
}

/// Runs one effect over `block`. If the effect produces a non-finite sample
/// it is reset and the block is restored from `dry`. Returns whether the
/// effect output was kept.
pub fn run_stage<E: EffectUnit>(
    unit: &mut E,
    block: &mut AudioBlock,
    dry: &mut AudioBlock,
) -> bool {
    dry.copy_from(block);
    unit.process(block);
    if block.is_finite() {
        true
    } else {
        unit.reset();
        block.copy_from(dry);
        false
    }
}

/// The low-pass filter followed by the reverb, each switched by the
/// parameter snapshot.
pub struct EffectChain {
    filter: LowPassFilter,
    reverb: Reverb,
    dry: AudioBlock,
    filter_params: FilterParams,
    reverb_params: ReverbParams,
    filter_enabled: bool,
    reverb_enabled: bool,
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectChain {
    pub fn new() -> Self {
        let filter_params = FilterParams::default();
        let reverb_params = ReverbParams::default();
        Self {
            filter: LowPassFilter::new(filter_params),
            reverb: Reverb::new(reverb_params),
            dry: AudioBlock::default(),
            filter_params,
            reverb_params,
            filter_enabled: false,
            reverb_enabled: false,
        }
    }

    pub fn prepare(&mut self, sample_rate: u32, block_size: usize, channels: usize) {
        self.dry.resize(channels, block_size);
        self.filter.prepare(sample_rate, block_size, channels);
        self.reverb.prepare(sample_rate, block_size, channels);
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.reverb.reset();
    }

    /// Applies the enabled effects to `block`.
    pub fn process(&mut self, block: &mut AudioBlock, snapshot: &ParameterSnapshot) {
        if !self.dry.same_shape(block) {
            return;
        }

        if snapshot.filter != self.filter_params {
            self.filter_params = snapshot.filter;
            self.filter.update_parameters(&self.filter_params);
        }
        if snapshot.reverb != self.reverb_params {
            self.reverb_params = snapshot.reverb;
            self.reverb.update_parameters(&self.reverb_params);
        }

        // Stale tails from a previous activation are dropped.
        if snapshot.filter_enabled && !self.filter_enabled {
            self.filter.reset();
        }
        if snapshot.reverb_enabled && !self.reverb_enabled {
            self.reverb.reset();
        }
        self.filter_enabled = snapshot.filter_enabled;
        self.reverb_enabled = snapshot.reverb_enabled;

        if self.filter_enabled {
            run_stage(&mut self.filter, block, &mut self.dry);
        }
        if self.reverb_enabled {
            run_stage(&mut self.reverb, block, &mut self.dry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding {
        resets: usize,
    }

    impl EffectUnit for Exploding {
        type Params = ();

        fn prepare(&mut self, _: u32, _: usize, _: usize) {}

        fn reset(&mut self) {
            self.resets += 1;
        }

        fn update_parameters(&mut self, _: &()) {}

        fn process(&mut self, block: &mut AudioBlock) {
            block.channel_mut(0)[1] = f32::INFINITY;
        }
    }

    #[test]
    fn non_finite_output_is_replaced_by_dry() {
        let mut unit = Exploding { resets: 0 };
        let mut block = AudioBlock::from_channels(&[vec![0.1, 0.2, 0.3]]);
        let mut dry = AudioBlock::new(1, 3);

        assert!(!run_stage(&mut unit, &mut block, &mut dry));
        assert_eq!(block.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(unit.resets, 1);
    }

    #[test]
    fn disabled_chain_is_transparent() {
        let mut chain = EffectChain::new();
        chain.prepare(48000, 4, 2);
        let mut block = AudioBlock::from_channels(&[vec![0.5; 4], vec![-0.5; 4]]);
        let expected = block.clone();

        chain.process(&mut block, &ParameterSnapshot::default());
        assert_eq!(block, expected);
    }

    #[test]
    fn enabled_chain_changes_the_signal() {
        let mut chain = EffectChain::new();
        chain.prepare(48000, 64, 1);
        let snapshot = ParameterSnapshot {
            filter_enabled: true,
            filter: FilterParams {
                cutoff_hz: 200.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut block = AudioBlock::new(1, 64);
        for (n, sample) in block.channel_mut(0).iter_mut().enumerate() {
            *sample = if n % 2 == 0 { 1.0 } else { -1.0 };
        }
        let input_rms = block.rms();

        chain.process(&mut block, &snapshot);
        assert!(block.is_finite());
        assert!(block.rms() < input_rms * 0.1);
    }
}
