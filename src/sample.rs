use crate::sim::{compute_proxy, ScreenProfile, Target};
use anyhow::{bail, Context, Result};
use std::{fmt, path::Path, str::FromStr};

pub const NUM_FIELDS: usize = 12;
pub const NUM_INPUTS: usize = 10;
pub const NUM_OUTPUTS: usize = NUM_FIELDS - NUM_INPUTS;

/// One generated training example, in on-disk field order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub screen_width: f64,
    pub screen_height: f64,
    pub screen_x_center: f64,
    pub screen_y_center: f64,
    pub mouse_dpi: f64,
    pub mouse_sensitivity: f64,
    pub fov_x: f64,
    pub fov_y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub proxy_dx: f64,
    pub proxy_dy: f64,
}

impl Sample {
    pub fn record(profile: &ScreenProfile, target: &Target) -> Self {
        let (proxy_dx, proxy_dy) = compute_proxy(target.x, target.y, profile);
        Self {
            screen_width: profile.screen_width as f64,
            screen_height: profile.screen_height as f64,
            screen_x_center: profile.screen_x_center as f64,
            screen_y_center: profile.screen_y_center as f64,
            mouse_dpi: profile.mouse_dpi as f64,
            mouse_sensitivity: profile.mouse_sensitivity,
            fov_x: profile.fov_x,
            fov_y: profile.fov_y,
            target_x: target.x,
            target_y: target.y,
            proxy_dx,
            proxy_dy,
        }
    }

    pub fn to_array(&self) -> [f64; NUM_FIELDS] {
        [
            self.screen_width,
            self.screen_height,
            self.screen_x_center,
            self.screen_y_center,
            self.mouse_dpi,
            self.mouse_sensitivity,
            self.fov_x,
            self.fov_y,
            self.target_x,
            self.target_y,
            self.proxy_dx,
            self.proxy_dy,
        ]
    }

    pub fn from_array(v: [f64; NUM_FIELDS]) -> Self {
        Self {
            screen_width: v[0],
            screen_height: v[1],
            screen_x_center: v[2],
            screen_y_center: v[3],
            mouse_dpi: v[4],
            mouse_sensitivity: v[5],
            fov_x: v[6],
            fov_y: v[7],
            target_x: v[8],
            target_y: v[9],
            proxy_dx: v[10],
            proxy_dy: v[11],
        }
    }

    /// Network inputs: everything but the proxy.
    pub fn features(&self) -> [f32; NUM_INPUTS] {
        let v = self.to_array();
        std::array::from_fn(|i| v[i] as f32)
    }

    pub fn labels(&self) -> [f32; NUM_OUTPUTS] {
        [self.proxy_dx as f32, self.proxy_dy as f32]
    }

    /// Rebuilds the profile the sample was generated under.
    pub fn profile(&self) -> ScreenProfile {
        ScreenProfile::new(
            self.screen_width as u32,
            self.screen_height as u32,
            self.fov_x,
            self.fov_y,
            self.mouse_dpi as u32,
            self.mouse_sensitivity,
        )
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.to_array().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl FromStr for Sample {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut values = [0.0; NUM_FIELDS];
        let mut count = 0;
        for token in line.split_whitespace() {
            if count == NUM_FIELDS {
                bail!("expected {} values, found more", NUM_FIELDS);
            }
            values[count] = token
                .parse()
                .with_context(|| format!("invalid number {:?}", token))?;
            count += 1;
        }
        if count != NUM_FIELDS {
            bail!("expected {} values, found {}", NUM_FIELDS, count);
        }
        Ok(Self::from_array(values))
    }
}

/// Loads every sample in the data file. An empty file is an error.
pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let samples = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            line.parse::<Sample>()
                .with_context(|| format!("{}:{}: malformed sample", path.display(), i + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    if samples.is_empty() {
        bail!("data file {} holds no samples", path.display());
    }
    log::debug!("Read {} samples from {}", samples.len(), path.display());
    Ok(samples)
}
