use crate::{
    model::ModelConfig,
    sample::{read_samples, Sample, NUM_OUTPUTS},
    sim::compute_proxy,
};
use anyhow::{Context, Result};
use burn::prelude::*;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct SpotCheck {
    pub sample: Sample,
    pub calculated: (f64, f64),
    pub predicted: [f32; NUM_OUTPUTS],
}

impl SpotCheck {
    pub fn error(&self) -> (f64, f64) {
        (
            (self.predicted[0] as f64 - self.calculated.0).abs(),
            (self.predicted[1] as f64 - self.calculated.1).abs(),
        )
    }
}

/// Runs one random recorded sample through the checkpoint and compares the
/// prediction with the analytic proxy.
pub fn spot_check<B: Backend>(
    data_path: &Path,
    checkpoint: &Path,
    model_config: &ModelConfig,
    device: &B::Device,
    rng: &mut Pcg64,
) -> Result<SpotCheck> {
    let model = model_config.load::<B>(checkpoint, device)?;
    let samples = read_samples(data_path)?;
    let sample = *samples
        .choose(rng)
        .context("no samples to check against")?;

    let calculated = compute_proxy(sample.target_x, sample.target_y, &sample.profile());
    let predicted = model.predict(&sample.features())?;
    let check = SpotCheck {
        sample,
        calculated,
        predicted,
    };
    log::info!(
        "Tested model:\nCalculated: {:?}\nModel output: {:?}\nAbsolute error: {:?}",
        check.calculated,
        check.predicted,
        check.error()
    );
    Ok(check)
}
