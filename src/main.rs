use anyhow::Result;
use burn::{
    backend::{Autodiff, NdArray, Wgpu},
    prelude::*,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;

mod check;
mod config;
mod generate;
mod model;
mod recorder;
mod sample;
mod sim;
mod train;
mod viz;

use config::{BackendKind, Config};

fn main() -> Result<()> {
    init_logger();
    let config = config::load_config_from_file(config::CONFIG_PATH)?;

    let mut rng = match config.seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    };

    if config.delete_prev_data {
        recorder::delete_previous(&[
            config.data_path.as_path(),
            config.checkpoint_file().as_path(),
        ])?;
    }

    if config.generation.enabled {
        generate_data(&config, &mut rng)?;
    }

    match config.backend {
        BackendKind::NdArray => run_model_stages::<NdArray<f32>>(&config, &mut rng),
        BackendKind::Wgpu => run_model_stages::<Wgpu<f32, i32>>(&config, &mut rng),
    }
}

/// Info by default, `RUST_LOG` still wins.
fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn generate_data(config: &Config, rng: &mut Pcg64) -> Result<()> {
    let recorder = recorder::Recorder::spawn(&config.data_path, config.queue_capacity)?;
    let visualizer = if config.generation.visualize {
        Some(viz::Visualizer::spawn(config.generation.draw_line)?)
    } else {
        None
    };

    let mut generator = generate::Generator::new(config, rng);
    let produced = generate::run(
        &config.generation,
        &mut generator,
        &recorder,
        visualizer.as_ref(),
        rng,
    );

    // Shut the workers down even when generation failed.
    if let Some(visualizer) = visualizer {
        visualizer.stop();
    }
    let written = recorder.stop()?;
    let produced = produced?;
    log::info!(
        "Generated {} samples, wrote {} to {}",
        produced,
        written,
        config.data_path.display()
    );
    Ok(())
}

fn run_model_stages<B: Backend>(config: &Config, rng: &mut Pcg64) -> Result<()> {
    let device = B::Device::default();
    let model_config = model::ModelConfig::new().with_hidden_size(config.train.hidden_size);
    let checkpoint = config.checkpoint_file();

    if config.train.enabled {
        let samples = sample::read_samples(&config.data_path)?;
        let (model, losses) = train::train::<Autodiff<B>>(
            &samples,
            &model_config,
            &config.train,
            &device,
            rng,
        );
        model.save(&checkpoint)?;
        if config.train.plot_loss {
            viz::show_loss_curve(&losses);
        }
    }

    if config.check.enabled {
        check::spot_check::<B>(&config.data_path, &checkpoint, &model_config, &device, rng)?;
    }
    Ok(())
}
