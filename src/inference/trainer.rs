//! Training steps over caller supplied batches

use std::path::PathBuf;

use candle_core::Device;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use tracing::{debug, info};

use super::checkpoint::{parse_step, CheckpointStore};
use super::session::Session;
use super::summary::SummaryWriter;
use crate::config::Config;
use crate::error::{Result, TacotronError};
use crate::models::tacotron::LossValues;
use crate::models::{Inputs, Mode};

/// Optimizer state plus the session it updates.
///
/// Snapshots and the training summary stream live in the load run, so an
/// inference run that saves elsewhere never touches them.
pub struct Trainer {
    session: Session,
    optimizer: AdamW,
    store: CheckpointStore,
    summary: SummaryWriter,
    step: usize,
    checkpoint_every: usize,
}

impl Trainer {
    /// Start from freshly initialized parameters
    pub fn new(config: &Config, device: Device) -> Result<Self> {
        let session = Session::new(config, device)?;
        Self::with_session(config, session, 0)
    }

    /// Continue from the latest snapshot of the load run
    pub fn resume(config: &Config, device: Device) -> Result<Self> {
        let store = CheckpointStore::new(config.load_run_dir());
        let checkpoint = store.resolve(None)?;
        let step = parse_step(&checkpoint).unwrap_or(0);
        let session = Session::restore(config, device, &checkpoint)?;
        Self::with_session(config, session, step)
    }

    fn with_session(config: &Config, session: Session, step: usize) -> Result<Self> {
        let params = ParamsAdamW {
            lr: config.model.learning_rate,
            ..Default::default()
        };
        let optimizer = AdamW::new(session.varmap().all_vars(), params)?;
        let run_dir = config.load_run_dir();
        info!("Trainer at step {} writing to {:?}", step, run_dir);
        Ok(Self {
            session,
            optimizer,
            store: CheckpointStore::new(&run_dir),
            summary: SummaryWriter::create(&run_dir)?,
            step,
            checkpoint_every: config.model.checkpoint_every,
        })
    }

    /// Steps taken so far
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Session being trained
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Forward in TRAIN mode, backward pass and parameter update.
    /// Saves a snapshot every `checkpoint_every` steps.
    pub fn step(&mut self, inputs: Inputs) -> Result<LossValues> {
        let graph = self.session.model().build(inputs, Mode::Train)?;
        let loss = graph.loss.as_ref().ok_or(TacotronError::MissingTarget("train"))?;
        self.optimizer.backward_step(&loss.total)?;
        self.step += 1;

        let values = loss.values()?;
        debug!("Step {}: loss {:.5}", self.step, values.total);
        self.summary.write(self.step, &graph.summary()?)?;

        if self.checkpoint_every > 0 && self.step % self.checkpoint_every == 0 {
            self.save()?;
        }
        Ok(values)
    }

    /// Loss in EVAL mode, parameters untouched
    pub fn evaluate(&self, inputs: Inputs) -> Result<LossValues> {
        let graph = self.session.model().build(inputs, Mode::Eval)?;
        graph.loss.ok_or(TacotronError::MissingTarget("eval"))?.values()
    }

    /// Snapshot the current parameters
    pub fn save(&self) -> Result<PathBuf> {
        self.store.save(self.session.varmap(), self.step)
    }
}
