use crate::sim::{ScreenProfile, Target};
use anyhow::{Context, Result};
use std::{sync::mpsc, thread, time::Duration};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const WINDOW_TITLE: &str = "train_mouse_net";

/// Everything needed to draw one generation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(not(feature = "visualize"), allow(dead_code))]
pub struct Frame {
    pub screen_width: u32,
    pub screen_height: u32,
    pub center: (f32, f32),
    pub target: (f32, f32),
    pub size: (f32, f32),
}

impl Frame {
    pub fn new(profile: &ScreenProfile, target: &Target) -> Self {
        Self {
            screen_width: profile.screen_width,
            screen_height: profile.screen_height,
            center: (
                profile.screen_x_center as f32,
                profile.screen_y_center as f32,
            ),
            target: (target.x as f32, target.y as f32),
            size: (target.w as f32, target.h as f32),
        }
    }

    /// Top-left corner and size of the target box, snapped to pixels.
    pub fn rect(&self) -> (i32, i32, i32, i32) {
        let (hw, hh) = ((self.size.0 / 2.0).floor(), (self.size.1 / 2.0).floor());
        (
            (self.target.0 - hw) as i32,
            (self.target.1 - hh) as i32,
            (2.0 * hw) as i32,
            (2.0 * hh) as i32,
        )
    }
}

enum Message {
    Frame(Frame),
    Stop,
}

enum Poll {
    Frame(Frame),
    Idle,
    Stop,
}

/// Waits up to [`POLL_TIMEOUT`] for a frame, then skips to the newest one
/// pending. A stop anywhere in the queue wins.
fn poll_latest(rx: &mpsc::Receiver<Message>) -> Poll {
    let mut latest = match rx.recv_timeout(POLL_TIMEOUT) {
        Ok(Message::Frame(frame)) => frame,
        Ok(Message::Stop) | Err(mpsc::RecvTimeoutError::Disconnected) => return Poll::Stop,
        Err(mpsc::RecvTimeoutError::Timeout) => return Poll::Idle,
    };
    for msg in rx.try_iter() {
        match msg {
            Message::Frame(frame) => latest = frame,
            Message::Stop => return Poll::Stop,
        }
    }
    Poll::Frame(latest)
}

/// Live view of the simulated target, drawn on its own thread.
pub struct Visualizer {
    tx: mpsc::SyncSender<Message>,
    handle: thread::JoinHandle<()>,
}

impl Visualizer {
    pub fn spawn(draw_line: bool) -> Result<Self> {
        // One slot: the producer never waits on drawing.
        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("visualizer".to_owned())
            .spawn(move || run_window(rx, draw_line))
            .context("failed to spawn visualizer thread")?;
        Ok(Self { tx, handle })
    }

    /// Drops the frame when one is already waiting or the window was
    /// closed. Returns whether it was queued.
    pub fn show(&self, frame: Frame) -> bool {
        self.tx.try_send(Message::Frame(frame)).is_ok()
    }

    pub fn stop(self) {
        let _ = self.tx.send(Message::Stop);
        if self.handle.join().is_err() {
            log::warn!("Visualizer thread panicked");
        }
    }
}

#[cfg(feature = "visualize")]
fn run_window(rx: mpsc::Receiver<Message>, draw_line: bool) {
    use raylib::consts::{KeyboardKey, TraceLogLevel};
    use raylib::prelude::*;

    let (mut rl, thread) = raylib::init()
        .log_level(TraceLogLevel::LOG_WARNING)
        .size(640, 480)
        .title(WINDOW_TITLE)
        .build();
    let mut size = (0, 0);

    while !rl.window_should_close() && !rl.is_key_pressed(KeyboardKey::KEY_Q) {
        let frame = match poll_latest(&rx) {
            Poll::Frame(frame) => frame,
            Poll::Idle => continue,
            Poll::Stop => break,
        };
        if size != (frame.screen_width, frame.screen_height) {
            size = (frame.screen_width, frame.screen_height);
            rl.set_window_size(size.0 as i32, size.1 as i32);
        }

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);
        if draw_line {
            d.draw_line_ex(
                Vector2::new(frame.center.0, frame.center.1),
                Vector2::new(frame.target.0, frame.target.1),
                2.0,
                Color::YELLOW,
            );
        }
        let (x, y, w, h) = frame.rect();
        d.draw_rectangle_lines(x, y, w, h, Color::GREEN);
    }
    log::debug!("Visualizer window closed");
}

#[cfg(not(feature = "visualize"))]
fn run_window(rx: mpsc::Receiver<Message>, _draw_line: bool) {
    log::warn!(
        "{} needs the `visualize` feature, frames will be dropped",
        WINDOW_TITLE
    );
    loop {
        match poll_latest(&rx) {
            Poll::Frame(frame) => log::trace!("Dropped frame {:?}", frame),
            Poll::Idle => {}
            Poll::Stop => break,
        }
    }
}

/// Plots mean loss per epoch. Blocks until the window is closed.
#[cfg(feature = "visualize")]
pub fn show_loss_curve(losses: &[f32]) {
    use raylib::consts::TraceLogLevel;
    use raylib::prelude::*;

    const WIDTH: i32 = 800;
    const HEIGHT: i32 = 500;
    const MARGIN: f32 = 50.0;

    if losses.is_empty() {
        return;
    }
    let (mut rl, thread) = raylib::init()
        .log_level(TraceLogLevel::LOG_WARNING)
        .size(WIDTH, HEIGHT)
        .title("Training complete")
        .build();
    rl.set_target_fps(30);

    let max = losses.iter().cloned().fold(f32::MIN_POSITIVE, f32::max);
    let span_x = (losses.len().max(2) - 1) as f32;
    let plot_w = WIDTH as f32 - 2.0 * MARGIN;
    let plot_h = HEIGHT as f32 - 2.0 * MARGIN;
    let points: Vec<Vector2> = losses
        .iter()
        .enumerate()
        .map(|(i, &loss)| {
            Vector2::new(
                MARGIN + plot_w * i as f32 / span_x,
                HEIGHT as f32 - MARGIN - plot_h * loss / max,
            )
        })
        .collect();

    while !rl.window_should_close() {
        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::WHITE);
        d.draw_text("Loss over epochs", WIDTH / 2 - 90, 15, 20, Color::BLACK);
        d.draw_text("Epoch", WIDTH / 2 - 25, HEIGHT - 30, 16, Color::DARKGRAY);
        d.draw_text("Loss", 5, HEIGHT / 2, 16, Color::DARKGRAY);
        d.draw_text(&format!("{:.3}", max), 5, MARGIN as i32 - 20, 12, Color::DARKGRAY);
        let origin = Vector2::new(MARGIN, HEIGHT as f32 - MARGIN);
        d.draw_line_v(origin, Vector2::new(MARGIN, MARGIN), Color::BLACK);
        d.draw_line_v(origin, Vector2::new(WIDTH as f32 - MARGIN, origin.y), Color::BLACK);
        for pair in points.windows(2) {
            d.draw_line_ex(pair[0], pair[1], 2.0, Color::BLUE);
        }
    }
}

#[cfg(not(feature = "visualize"))]
pub fn show_loss_curve(losses: &[f32]) {
    for line in loss_bars(losses, 40) {
        log::info!("{}", line);
    }
}

/// Console rendering of the loss curve, one bar per epoch.
#[cfg_attr(feature = "visualize", allow(dead_code))]
fn loss_bars(losses: &[f32], width: usize) -> Vec<String> {
    let max = losses.iter().cloned().fold(0.0, f32::max);
    losses
        .iter()
        .enumerate()
        .map(|(i, &loss)| {
            let len = if max > 0.0 {
                (loss / max * width as f32).round() as usize
            } else {
                0
            };
            format!("{:>4} {:<width$} {:.5}", i + 1, "#".repeat(len), loss)
        })
        .collect()
}
