use std::fmt;

/// Dataset split an epoch runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    /// Shuffled, with optimizer steps.
    Train,
    /// Fixed order, no gradients.
    Val,
}

impl Split {
    /// Tag prefix and checkpoint name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the training loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerPhase {
    /// Constructed, nothing run yet.
    Init,
    /// Inside a training epoch.
    TrainEpoch,
    /// Inside a validation epoch.
    ValEpoch,
    /// Writing a best-so-far checkpoint.
    Checkpoint,
    /// All epochs finished.
    Done,
    /// Aborted on a non-finite loss. Absorbing.
    Failed,
}

/// Counters and best-loss trackers of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerState {
    /// Epochs completed.
    pub epoch: usize,
    /// Training batches processed over the run.
    pub train_step: usize,
    /// Validation batches processed over the run.
    pub val_step: usize,
    /// Lowest epoch-mean training total so far.
    pub best_train_loss: f32,
    /// Lowest epoch-mean validation total so far.
    pub best_val_loss: f32,
    /// Current phase.
    pub phase: TrainerPhase,
}

impl Default for TrainerState {
    fn default() -> Self {
        Self {
            epoch: 0,
            train_step: 0,
            val_step: 0,
            best_train_loss: f32::INFINITY,
            best_val_loss: f32::INFINITY,
            phase: TrainerPhase::Init,
        }
    }
}

impl TrainerState {
    /// Fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Step counter of `split`.
    pub fn step(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_step,
            Split::Val => self.val_step,
        }
    }

    /// Advance the step counter of `split`.
    pub fn advance_step(&mut self, split: Split) {
        match split {
            Split::Train => self.train_step += 1,
            Split::Val => self.val_step += 1,
        }
    }

    /// Best loss tracked for `split`.
    pub fn best(&self, split: Split) -> f32 {
        match split {
            Split::Train => self.best_train_loss,
            Split::Val => self.best_val_loss,
        }
    }

    /// Record an epoch loss and report whether a checkpoint is due.
    ///
    /// The tracker moves only on strict improvement. `force` makes every epoch
    /// due without touching the tracker otherwise.
    pub fn record_epoch_loss(&mut self, split: Split, loss: f32, force: bool) -> bool {
        let best = match split {
            Split::Train => &mut self.best_train_loss,
            Split::Val => &mut self.best_val_loss,
        };
        let improved = loss < *best;
        if improved {
            *best = loss;
        }
        improved || force
    }

    /// Whether the run aborted.
    pub fn is_failed(&self) -> bool {
        self.phase == TrainerPhase::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_improvement() {
        let mut state = TrainerState::new();
        assert!(state.record_epoch_loss(Split::Train, 1.0, false));
        assert!(!state.record_epoch_loss(Split::Train, 1.0, false));
        assert!(!state.record_epoch_loss(Split::Train, 1.5, false));
        assert!(state.record_epoch_loss(Split::Train, 0.5, false));
        assert_eq!(state.best(Split::Train), 0.5);
        assert_eq!(state.best(Split::Val), f32::INFINITY);
    }

    #[test]
    fn test_forced_checkpoint() {
        let mut state = TrainerState::new();
        state.record_epoch_loss(Split::Val, 1.0, true);
        assert!(state.record_epoch_loss(Split::Val, 2.0, true));
        assert_eq!(state.best(Split::Val), 1.0);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut state = TrainerState::new();
        assert!(!state.record_epoch_loss(Split::Val, f32::NAN, false));
        assert_eq!(state.best(Split::Val), f32::INFINITY);
    }

    #[test]
    fn test_step_counters() {
        let mut state = TrainerState::new();
        state.advance_step(Split::Train);
        state.advance_step(Split::Train);
        state.advance_step(Split::Val);
        assert_eq!(state.step(Split::Train), 2);
        assert_eq!(state.step(Split::Val), 1);
        assert_eq!(state.phase, TrainerPhase::Init);
    }
}
