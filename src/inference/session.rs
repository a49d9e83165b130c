//! Scoped model session: device, parameters and model for one run

use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::Tacotron;

/// Owns the parameters of one inference or training run.
///
/// Parameters live as long as the session; dropping it releases them on
/// every exit path, including early returns through `?`.
pub struct Session {
    device: Device,
    varmap: VarMap,
    model: Tacotron,
    checkpoint: Option<PathBuf>,
}

impl Session {
    /// Freshly initialized parameters
    pub fn new(config: &Config, device: Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Tacotron::new(config, vb)?;
        info!("Opened session with {} parameter tensors on {:?}", varmap.all_vars().len(), device);
        Ok(Self {
            device,
            varmap,
            model,
            checkpoint: None,
        })
    }

    /// Parameters restored from a snapshot
    pub fn restore<P: AsRef<Path>>(config: &Config, device: Device, checkpoint: P) -> Result<Self> {
        let checkpoint = checkpoint.as_ref();
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Tacotron::new(config, vb)?;
        varmap.load(checkpoint)?;
        info!("Restored session from {:?}", checkpoint);
        Ok(Self {
            device,
            varmap,
            model,
            checkpoint: Some(checkpoint.to_path_buf()),
        })
    }

    /// Model
    pub fn model(&self) -> &Tacotron {
        &self.model
    }

    /// Parameters
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Snapshot the parameters were restored from
    pub fn checkpoint(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!("Releasing session ({} parameter tensors)", self.varmap.all_vars().len());
    }
}
