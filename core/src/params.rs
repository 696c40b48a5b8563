use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::{
    effects::{FilterParams, ReverbParams},
    GrainTuning, MixWeights,
};

/// A note event carried by a snapshot.
///
/// Every change gets a new serial number so the render side applies it once,
/// even though the snapshot holding it may be read many times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchChange {
    /// Playback rate ratio for every voice.
    pub ratio: f32,

    /// Rewind and start every voice.
    pub retrigger: bool,

    pub serial: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Play,
    Stop,
}

/// A play or stop request carried by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportChange {
    pub action: TransportAction,
    pub serial: u64,
}

/// The complete set of parameters the render side reads at the start of a
/// block. It is a plain value, so a snapshot is always seen whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub weights: MixWeights,
    pub loop_enabled: bool,
    pub grain_enabled: bool,
    pub grain_tuning: GrainTuning,
    pub reverb_enabled: bool,
    pub reverb: ReverbParams,
    pub filter_enabled: bool,
    pub filter: FilterParams,

    /// The most recent note, if any.
    pub pending_pitch: Option<PitchChange>,

    /// The most recent play or stop request, if any.
    pub pending_transport: Option<TransportChange>,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            weights: MixWeights::default(),
            loop_enabled: true,
            grain_enabled: false,
            grain_tuning: GrainTuning::default(),
            reverb_enabled: false,
            reverb: ReverbParams::default(),
            filter_enabled: false,
            filter: FilterParams::default(),
            pending_pitch: None,
            pending_transport: None,
        }
    }
}

/// Creates the two ends of a parameter handoff, starting from `initial`.
///
/// The channel holds at most one snapshot. Publishing replaces a snapshot the
/// render side has not read yet, and neither side ever blocks.
pub fn parameter_channel(initial: ParameterSnapshot) -> (ParameterPublisher, ParameterReceiver) {
    let (sender, receiver) = bounded(1);
    (
        ParameterPublisher {
            sender,
            stale: receiver.clone(),
        },
        ParameterReceiver {
            receiver,
            current: initial,
        },
    )
}

/// The control side of the parameter handoff.
pub struct ParameterPublisher {
    sender: Sender<ParameterSnapshot>,
    stale: Receiver<ParameterSnapshot>,
}

impl ParameterPublisher {
    /// Hands a snapshot to the render side, replacing any unread one.
    pub fn publish(&self, snapshot: ParameterSnapshot) {
        let mut snapshot = snapshot;
        loop {
            match self.sender.try_send(snapshot) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.stale.try_recv();
                    snapshot = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// The render side of the parameter handoff.
pub struct ParameterReceiver {
    receiver: Receiver<ParameterSnapshot>,
    current: ParameterSnapshot,
}

impl ParameterReceiver {
    /// Returns the newest published snapshot, or the previous one if nothing
    /// was published since the last call.
    pub fn consume_latest(&mut self) -> ParameterSnapshot {
        for snapshot in self.receiver.try_iter() {
            self.current = snapshot;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{compute_weights, QuadrantPosition};

    fn numbered(i: u64) -> ParameterSnapshot {
        let position = QuadrantPosition::new((i % 100) as f32 / 100.0, (i % 37) as f32 / 37.0);
        ParameterSnapshot {
            weights: compute_weights(position),
            grain_enabled: i % 2 == 0,
            filter: FilterParams {
                cutoff_hz: i as f32,
                ..Default::default()
            },
            pending_pitch: Some(PitchChange {
                ratio: 1.0,
                retrigger: true,
                serial: i,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn nothing_published_keeps_the_initial_snapshot() {
        let (_publisher, mut receiver) = parameter_channel(ParameterSnapshot::default());
        assert_eq!(receiver.consume_latest(), ParameterSnapshot::default());
    }

    #[test]
    fn last_writer_wins() {
        let (publisher, mut receiver) = parameter_channel(ParameterSnapshot::default());
        for i in 0..10 {
            publisher.publish(numbered(i));
        }
        assert_eq!(receiver.consume_latest(), numbered(9));
        assert_eq!(receiver.consume_latest(), numbered(9));
    }

    #[test]
    fn dropped_publisher_leaves_last_snapshot() {
        let (publisher, mut receiver) = parameter_channel(ParameterSnapshot::default());
        publisher.publish(numbered(3));
        drop(publisher);
        assert_eq!(receiver.consume_latest(), numbered(3));
    }

    #[test]
    fn concurrent_reads_never_see_torn_snapshots() {
        let (publisher, mut receiver) = parameter_channel(ParameterSnapshot::default());
        let count = 20_000u64;

        let writer = thread::spawn(move || {
            for i in 1..=count {
                publisher.publish(numbered(i));
            }
        });

        let mut last_serial = 0;
        loop {
            let snapshot = receiver.consume_latest();
            if let Some(pitch) = snapshot.pending_pitch {
                assert_eq!(snapshot, numbered(pitch.serial));
                assert!(pitch.serial >= last_serial);
                last_serial = pitch.serial;
            }
            if last_serial == count {
                break;
            }
            if writer.is_finished() {
                let snapshot = receiver.consume_latest();
                assert_eq!(snapshot, numbered(count));
                break;
            }
        }

        writer.join().unwrap();
    }
}
