use crate::{
    config::{Config, Generation},
    recorder::Recorder,
    sample::Sample,
    sim::{ParameterRandomizer, ScreenProfile, Target},
    viz::{Frame, Visualizer},
};
use anyhow::Result;
use rand_pcg::Pcg64;
use std::time::{Duration, Instant};

/// Simulation state owned by the generation loop.
pub struct Generator {
    randomizer: ParameterRandomizer,
    pub profile: ScreenProfile,
    pub target: Target,
    /// Ticks whose resolution change forced a full target re-roll.
    pub resolution_changes: u64,
}

impl Generator {
    pub fn new(config: &Config, rng: &mut Pcg64) -> Self {
        let profile = ScreenProfile::from_config(&config.screen);
        let target = Target::spawn(config.target, &profile, rng);
        Self {
            randomizer: ParameterRandomizer::new(config.screen),
            profile,
            target,
            resolution_changes: 0,
        }
    }

    pub fn tick(&mut self, rng: &mut Pcg64) -> Sample {
        if self.randomizer.randomize(&mut self.profile, rng) {
            self.target.randomize(&self.profile, rng);
            self.resolution_changes += 1;
        }
        self.target.advance(&self.profile);
        // Size first so the new position is valid for the new size.
        self.target.randomize_size(&self.profile, rng);
        self.target.randomize_position(&self.profile, rng);
        self.target.randomize_velocity(rng);

        let sample = Sample::record(&self.profile, &self.target);
        log::trace!("{}", sample);
        sample
    }
}

/// Ticks until `duration_secs` have passed, always at least once. Returns the
/// number of samples produced.
pub fn run(
    config: &Generation,
    generator: &mut Generator,
    recorder: &Recorder,
    visualizer: Option<&Visualizer>,
    rng: &mut Pcg64,
) -> Result<u64> {
    let duration = Duration::from_secs(config.duration_secs);
    let start = Instant::now();
    let mut last_report = start;
    let mut produced = 0u64;
    log::info!("Generating data for {} seconds", config.duration_secs);

    loop {
        let sample = generator.tick(rng);
        if let Some(visualizer) = visualizer {
            visualizer.show(Frame::new(&generator.profile, &generator.target));
        }
        recorder.enqueue(sample)?;
        produced += 1;

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(1) {
            last_report = now;
            log::info!(
                "Data generation: {}/{}s, {} samples",
                now.duration_since(start).as_secs(),
                config.duration_secs,
                produced
            );
        }
        if now.duration_since(start) >= duration {
            break;
        }
    }
    log::debug!(
        "{} of {} ticks changed resolution",
        generator.resolution_changes,
        produced
    );
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, sample::read_samples, sim::compute_proxy};
    use rand::SeedableRng;

    #[test]
    fn ticks_produce_consistent_samples() {
        let config = test_config();
        let mut rng = Pcg64::seed_from_u64(11);
        let mut generator = Generator::new(&config, &mut rng);
        for _ in 0..2000 {
            let s = generator.tick(&mut rng);
            assert_eq!(s.screen_x_center, (s.screen_width as u32 / 2) as f64);
            assert_eq!(s.screen_y_center, (s.screen_height as u32 / 2) as f64);
            assert_eq!(
                (s.proxy_dx, s.proxy_dy),
                compute_proxy(s.target_x, s.target_y, &s.profile())
            );

            let t = &generator.target;
            assert!(t.w as f64 <= s.screen_width && t.h as f64 <= s.screen_height);
            assert!(s.target_x - (t.w / 2) as f64 >= 0.0);
            assert!(s.target_x + (t.w / 2) as f64 <= s.screen_width);
            assert!(s.target_y - (t.h / 2) as f64 >= 0.0);
            assert!(s.target_y + (t.h / 2) as f64 <= s.screen_height);
        }
    }

    #[test]
    fn resolution_change_rerolls_target() {
        let mut config = test_config();
        let res = &mut config.screen.random_resolution;
        res.min_width = 1000;
        res.max_width = 1000;
        res.min_height = 800;
        res.max_height = 800;
        config.target.min_w = 600;
        config.target.max_w = 900;
        config.target.min_h = 600;
        config.target.max_h = 900;
        let mut rng = Pcg64::seed_from_u64(14);
        let mut generator = Generator::new(&config, &mut rng);
        // Spawned against the 384x216 base screen.
        assert_eq!((generator.target.w, generator.target.h), (384, 216));

        let s = generator.tick(&mut rng);
        assert_eq!(generator.resolution_changes, 1);
        assert_eq!((s.screen_width, s.screen_height), (1000.0, 800.0));
        let t = &generator.target;
        assert!(t.w >= 600 && t.h >= 600);
        assert!(s.target_x + (t.w / 2) as f64 <= 1000.0);
        assert!(s.target_y + (t.h / 2) as f64 <= 800.0);

        for _ in 0..20 {
            generator.tick(&mut rng);
        }
        assert_eq!(generator.resolution_changes, 1);
    }

    #[test]
    fn fixed_resolution_never_rerolls() {
        let mut config = test_config();
        config.screen.random_resolution.enabled = false;
        let mut rng = Pcg64::seed_from_u64(15);
        let mut generator = Generator::new(&config, &mut rng);
        for _ in 0..100 {
            generator.tick(&mut rng);
        }
        assert_eq!(generator.resolution_changes, 0);
    }

    #[test]
    fn same_seed_same_samples() {
        let config = test_config();
        let run = |seed| {
            let mut rng = Pcg64::seed_from_u64(seed);
            let mut generator = Generator::new(&config, &mut rng);
            (0..50).map(|_| generator.tick(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }

    #[test]
    fn zero_duration_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut config = test_config();
        config.generation.duration_secs = 0;
        let mut rng = Pcg64::seed_from_u64(12);
        let mut generator = Generator::new(&config, &mut rng);
        let recorder = Recorder::spawn(&path, None).unwrap();
        let produced = run(&config.generation, &mut generator, &recorder, None, &mut rng).unwrap();
        assert_eq!(produced, 1);
        assert_eq!(recorder.stop().unwrap(), 1);
        assert_eq!(read_samples(&path).unwrap().len(), 1);
    }

    #[test]
    fn timed_run_records_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut config = test_config();
        config.generation.duration_secs = 1;
        let mut rng = Pcg64::seed_from_u64(13);
        let mut generator = Generator::new(&config, &mut rng);
        let recorder = Recorder::spawn(&path, Some(256)).unwrap();
        let produced = run(&config.generation, &mut generator, &recorder, None, &mut rng).unwrap();
        assert!(produced > 1);
        assert_eq!(recorder.stop().unwrap() as u64, produced);
        assert_eq!(read_samples(&path).unwrap().len() as u64, produced);
    }
}
