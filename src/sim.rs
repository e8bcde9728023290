use crate::config::{ScreenConfig, TargetConfig};
use rand::Rng;
use rand_pcg::Pcg64;

/// The screen and mouse settings a sample was generated under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProfile {
    pub screen_width: u32,
    pub screen_height: u32,
    pub screen_x_center: u32,
    pub screen_y_center: u32,
    pub fov_x: f64,
    pub fov_y: f64,
    pub mouse_dpi: u32,
    pub mouse_sensitivity: f64,
}

impl ScreenProfile {
    pub fn new(
        screen_width: u32,
        screen_height: u32,
        fov_x: f64,
        fov_y: f64,
        mouse_dpi: u32,
        mouse_sensitivity: f64,
    ) -> Self {
        Self {
            screen_width,
            screen_height,
            screen_x_center: screen_width / 2,
            screen_y_center: screen_height / 2,
            fov_x,
            fov_y,
            mouse_dpi,
            mouse_sensitivity,
        }
    }

    /// Base values, before any randomization.
    pub fn from_config(config: &ScreenConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            config.fov_x,
            config.fov_y,
            config.mouse_dpi,
            config.mouse_sensitivity,
        )
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.screen_width = width;
        self.screen_height = height;
        self.recenter();
    }

    fn recenter(&mut self) {
        self.screen_x_center = self.screen_width / 2;
        self.screen_y_center = self.screen_height / 2;
    }
}

/// Redraws the parts of a [`ScreenProfile`] whose randomization is enabled.
#[derive(Debug, Clone, Copy)]
pub struct ParameterRandomizer {
    config: ScreenConfig,
}

impl ParameterRandomizer {
    pub fn new(config: ScreenConfig) -> Self {
        Self { config }
    }

    /// Returns whether the resolution changed. When it did, the caller must
    /// re-randomize the target since it may now be out of bounds.
    pub fn randomize(&self, profile: &mut ScreenProfile, rng: &mut Pcg64) -> bool {
        let old = (profile.screen_width, profile.screen_height);

        let res = &self.config.random_resolution;
        if res.enabled {
            let width = rng.gen_range(res.min_width..=res.max_width);
            let height = rng.gen_range(res.min_height..=res.max_height);
            profile.set_resolution(width, height);
        } else {
            profile.recenter();
        }

        let fov = &self.config.random_fov;
        if fov.enabled {
            profile.fov_x = rng.gen_range(fov.min_x..=fov.max_x) as f64;
            profile.fov_y = rng.gen_range(fov.min_y..=fov.max_y) as f64;
        }

        let dpi = &self.config.random_dpi;
        if dpi.enabled {
            profile.mouse_dpi = rng.gen_range(dpi.min..=dpi.max);
        }

        let sens = &self.config.random_sensitivity;
        if sens.enabled {
            profile.mouse_sensitivity = uniform(rng, sens.min, sens.max);
        }

        old != (profile.screen_width, profile.screen_height)
    }
}

/// Which axes bounced during a [`Target::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounce {
    pub x: bool,
    pub y: bool,
}

/// A rectangle bouncing around the screen. `x`/`y` is its center.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    pub dx: f64,
    pub dy: f64,
    config: TargetConfig,
}

impl Target {
    pub fn spawn(config: TargetConfig, profile: &ScreenProfile, rng: &mut Pcg64) -> Self {
        let mut target = Self {
            x: 0.0,
            y: 0.0,
            w: config.min_w,
            h: config.min_h,
            dx: uniform(rng, config.min_speed_x, config.max_speed_x),
            dy: uniform(rng, config.min_speed_y, config.max_speed_y),
            config,
        };
        target.randomize_size(profile, rng);
        target.randomize_position(profile, rng);
        target.dx = target.dx.clamp(-1.0, 1.0);
        target.dy = target.dy.clamp(-1.0, 1.0);
        log::trace!("Spawned target {:?}", target);
        target
    }

    fn half_w(&self) -> f64 {
        (self.w / 2) as f64
    }

    fn half_h(&self) -> f64 {
        (self.h / 2) as f64
    }

    /// Steps by the current velocity and bounces off each screen edge.
    pub fn advance(&mut self, profile: &ScreenProfile) -> Bounce {
        let mut bounce = Bounce::default();
        let width = profile.screen_width as f64;
        let height = profile.screen_height as f64;
        self.x += self.dx;
        self.y += self.dy;

        if self.x + self.half_w() > width {
            self.x = width - self.half_w();
            self.dx = -self.dx;
            bounce.x = true;
        }
        if self.x - self.half_w() < 0.0 {
            self.x = self.half_w();
            self.dx = -self.dx;
            bounce.x = true;
        }
        if self.y + self.half_h() > height {
            self.y = height - self.half_h();
            self.dy = -self.dy;
            bounce.y = true;
        }
        if self.y - self.half_h() < 0.0 {
            self.y = self.half_h();
            self.dy = -self.dy;
            bounce.y = true;
        }
        bounce
    }

    pub fn randomize_position(&mut self, profile: &ScreenProfile, rng: &mut Pcg64) {
        let (hw, hh) = (self.half_w(), self.half_h());
        self.x = uniform(rng, hw, profile.screen_width as f64 - hw);
        self.y = uniform(rng, hh, profile.screen_height as f64 - hh);
    }

    /// Sizes are clamped to the live screen, so a later resolution change
    /// can never leave the target larger than the screen.
    pub fn randomize_size(&mut self, profile: &ScreenProfile, rng: &mut Pcg64) {
        self.w = rng
            .gen_range(self.config.min_w..=self.config.max_w)
            .min(profile.screen_width);
        self.h = rng
            .gen_range(self.config.min_h..=self.config.max_h)
            .min(profile.screen_height);
    }

    pub fn randomize_velocity(&mut self, rng: &mut Pcg64) {
        let c = &self.config;
        self.dx += uniform(rng, c.min_speed_x, c.max_speed_x);
        self.dy += uniform(rng, c.min_speed_y, c.max_speed_y);
        self.dx = self.dx.clamp(-1.0, 1.0);
        self.dy = self.dy.clamp(-1.0, 1.0);
    }

    /// Full re-roll after a resolution change.
    pub fn randomize(&mut self, profile: &ScreenProfile, rng: &mut Pcg64) {
        self.randomize_size(profile, rng);
        self.randomize_position(profile, rng);
        self.randomize_velocity(rng);
    }
}

/// Mouse movement, in DPI units, that puts the crosshair on the target.
pub fn compute_proxy(target_x: f64, target_y: f64, profile: &ScreenProfile) -> (f64, f64) {
    let offset_x = target_x - profile.screen_x_center as f64;
    let offset_y = target_y - profile.screen_y_center as f64;

    let degrees_per_pixel_x = profile.fov_x / profile.screen_width as f64;
    let degrees_per_pixel_y = profile.fov_y / profile.screen_height as f64;

    let counts_per_degree = profile.mouse_dpi as f64 / profile.mouse_sensitivity / 360.0;
    (
        offset_x * degrees_per_pixel_x * counts_per_degree,
        offset_y * degrees_per_pixel_y * counts_per_degree,
    )
}

/// Inclusive uniform draw that collapses to `lo` for an empty range.
fn uniform(rng: &mut Pcg64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}
