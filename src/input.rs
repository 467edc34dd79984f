//! Keyboard and mouse handling
//!
//! Terminal events become discrete commands. [`ViewCommand`]s change the
//! camera; [`AppCommand`]s toggle configuration or UI panels.

use crate::config::GlobeConfig;
use crate::sim::ViewState;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Degrees of rotation per reference pixel of drag
pub const DRAG_SENSITIVITY: f64 = 0.25;
pub const ZOOM_STEP: f64 = 0.1;

/// Arrow keys move the globe like a drag of this many reference pixels.
const KEY_ROTATE_STEP: f64 = 20.0;

const INTENSITY_STEP: usize = 5;
const SPEED_STEP: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewCommand {
    /// Drag deltas in reference pixels
    Rotate { dx: f64, dy: f64 },
    /// Positive zooms out, negative zooms in; only the sign matters
    Zoom { delta: f64 },
}

impl ViewCommand {
    pub fn apply(self, view: &mut ViewState) {
        match self {
            ViewCommand::Rotate { dx, dy } => {
                view.rotation[0] += dx * DRAG_SENSITIVITY;
                view.set_phi(view.phi() - dy * DRAG_SENSITIVITY);
            }
            ViewCommand::Zoom { delta } => {
                if delta != 0.0 {
                    view.set_zoom(view.zoom - delta.signum() * ZOOM_STEP);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AppCommand {
    Quit,
    TogglePlay,
    ToggleGraticule,
    ToggleSatellites,
    ToggleHubsOnly,
    CycleTheme,
    SatelliteCount(i32),
    Intensity(i32),
    RotationSpeed(i32),
    ToggleLog,
    ToggleHelp,
}

impl AppCommand {
    /// Apply the configuration part of a command. Returns false for
    /// commands the host has to handle itself (quit, theme, panels).
    pub fn apply(self, config: &mut GlobeConfig) -> bool {
        match self {
            AppCommand::TogglePlay => config.is_playing = !config.is_playing,
            AppCommand::ToggleGraticule => config.show_graticule = !config.show_graticule,
            AppCommand::ToggleSatellites => config.show_satellites = !config.show_satellites,
            AppCommand::ToggleHubsOnly => config.major_cities_only = !config.major_cities_only,
            AppCommand::SatelliteCount(step) => {
                config.satellite_count = step_count(config.satellite_count, step, 1, GlobeConfig::MAX_SATELLITES);
            }
            AppCommand::Intensity(step) => {
                config.attack_intensity =
                    step_count(config.attack_intensity, step, INTENSITY_STEP, GlobeConfig::MAX_INTENSITY);
            }
            AppCommand::RotationSpeed(step) => {
                let speed = config.rotation_speed + step as f64 * SPEED_STEP;
                // Snap to 0.05 multiples.
                config.rotation_speed = ((speed / SPEED_STEP).round() * SPEED_STEP).clamp(0.0, GlobeConfig::MAX_ROTATION_SPEED);
            }
            AppCommand::Quit | AppCommand::CycleTheme | AppCommand::ToggleLog | AppCommand::ToggleHelp => {
                return false
            }
        }
        true
    }
}

fn step_count(value: usize, step: i32, unit: usize, max: usize) -> usize {
    let delta = step.unsigned_abs() as usize * unit;
    if step < 0 {
        value.saturating_sub(delta)
    } else {
        (value + delta).min(max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    View(ViewCommand),
    App(AppCommand),
}

/// Map a key press to a command.
pub fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(Command::App(AppCommand::Quit));
    }

    let rotate = |dx: f64, dy: f64| Some(Command::View(ViewCommand::Rotate { dx, dy }));
    let app = |cmd: AppCommand| Some(Command::App(cmd));

    match code {
        KeyCode::Left | KeyCode::Char('h') => rotate(-KEY_ROTATE_STEP, 0.0),
        KeyCode::Right | KeyCode::Char('l') => rotate(KEY_ROTATE_STEP, 0.0),
        KeyCode::Up | KeyCode::Char('k') => rotate(0.0, -KEY_ROTATE_STEP),
        KeyCode::Down | KeyCode::Char('j') => rotate(0.0, KEY_ROTATE_STEP),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Command::View(ViewCommand::Zoom { delta: -1.0 })),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(Command::View(ViewCommand::Zoom { delta: 1.0 })),
        KeyCode::Char(' ') => app(AppCommand::TogglePlay),
        KeyCode::Char('g') => app(AppCommand::ToggleGraticule),
        KeyCode::Char('s') => app(AppCommand::ToggleSatellites),
        KeyCode::Char('c') => app(AppCommand::ToggleHubsOnly),
        KeyCode::Char('t') => app(AppCommand::CycleTheme),
        KeyCode::Char('[') => app(AppCommand::SatelliteCount(-1)),
        KeyCode::Char(']') => app(AppCommand::SatelliteCount(1)),
        KeyCode::Char('<') => app(AppCommand::Intensity(-1)),
        KeyCode::Char('>') => app(AppCommand::Intensity(1)),
        KeyCode::Char(',') => app(AppCommand::RotationSpeed(-1)),
        KeyCode::Char('.') => app(AppCommand::RotationSpeed(1)),
        KeyCode::Char('a') => app(AppCommand::ToggleLog),
        KeyCode::Char('?') => app(AppCommand::ToggleHelp),
        KeyCode::Char('q') | KeyCode::Esc => app(AppCommand::Quit),
        _ => None,
    }
}

/// Turns left-button drags and wheel ticks into view commands.
///
/// Terminal cells are one logical pixel wide and two tall; deltas are
/// divided by `ui_scale` so a drag covers the same angle at any size.
#[derive(Debug, Default)]
pub struct PointerTracker {
    last: Option<(u16, u16)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &MouseEvent, ui_scale: f64) -> Option<ViewCommand> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.last = Some((event.column, event.row));
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (col, row) = (event.column, event.row);
                let prev = self.last.replace((col, row))?;
                let scale = ui_scale.max(f64::EPSILON);
                let dx = (col as f64 - prev.0 as f64) / scale;
                let dy = 2.0 * (row as f64 - prev.1 as f64) / scale;
                if dx == 0.0 && dy == 0.0 {
                    None
                } else {
                    Some(ViewCommand::Rotate { dx, dy })
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.last = None;
                None
            }
            MouseEventKind::ScrollUp => Some(ViewCommand::Zoom { delta: -1.0 }),
            MouseEventKind::ScrollDown => Some(ViewCommand::Zoom { delta: 1.0 }),
            _ => None,
        }
    }
}
