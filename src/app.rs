//! Host side: the interactive terminal loop and headless snapshots.

use crate::config::{GlobeConfig, RunConfig, SnapshotConfig};
use crate::geo::atlas::AtlasCache;
use crate::input::{map_key, AppCommand, Command, PointerTracker};
use crate::lighting::LightingSync;
use crate::overlay::{self, AttackLog};
use crate::projection::Projection;
use crate::render::canvas::MAX_DENSITY;
use crate::render::{Canvas, FrameRenderer};
use crate::sim::{self, SimState, ViewState};
use crate::terminal::Terminal;
use crate::theme::Theme;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{Event, KeyEventKind};
use std::io;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Longest a snapshot waits on an atlas load started elsewhere.
const ATLAS_WAIT: Duration = Duration::from_secs(15);

pub fn resolve_theme(id: &str) -> Result<&'static Theme> {
    Theme::by_id(id).ok_or_else(|| anyhow!("unknown theme '{}' (see `netwatch themes`)", id))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn initial_view(globe: &GlobeConfig) -> ViewState {
    ViewState::new(ViewState::default().rotation, globe.zoom)
}

/// Drives one terminal: input, tick, render, present, sleep.
pub struct FrameLoop<'t> {
    term: &'t mut Terminal,
    config: GlobeConfig,
    theme: &'static Theme,
    renderer: FrameRenderer,
    canvas: Canvas,
    pointer: PointerTracker,
    log: AttackLog,
    lighting: LightingSync,
    show_log: bool,
    show_help: bool,
    frame_interval: Duration,
    frame_limit: Option<u64>,
    frames: u64,
    running: bool,
}

impl<'t> FrameLoop<'t> {
    pub fn new(term: &'t mut Terminal, run: &RunConfig, theme: &'static Theme, seed: u64) -> Self {
        let (w, h) = term.pixel_size();
        let lighting = &run.lighting;
        Self {
            term,
            config: run.globe.clamped(),
            theme,
            renderer: FrameRenderer::new(seed),
            canvas: Canvas::new(w, h, 1),
            pointer: PointerTracker::new(),
            log: AttackLog::new(),
            lighting: LightingSync::new(lighting.ip.clone(), lighting.brightness, lighting.effect),
            show_log: true,
            show_help: false,
            frame_interval: Duration::from_secs_f64(1.0 / run.fps.max(1) as f64),
            frame_limit: run.frames,
            frames: 0,
            running: false,
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    fn limit_reached(&self) -> bool {
        self.frame_limit.is_some_and(|limit| self.frames >= limit)
    }

    /// Run until quit or the frame limit; hands back the final state.
    pub fn run(&mut self, mut sim: SimState) -> io::Result<SimState> {
        self.running = true;
        self.lighting.theme_changed(self.theme);
        log::info!("frame loop started: theme {}, {:?} per frame", self.theme.id, self.frame_interval);

        while self.running {
            if self.limit_reached() {
                self.stop();
                break;
            }
            let started = Instant::now();

            self.term.refresh_size()?;
            self.drain_events(&mut sim.view)?;
            if !self.running {
                break;
            }

            sim = self.advance(sim);
            self.compose(&sim);
            self.term.present()?;

            self.frames += 1;

            if let Some(rest) = self.frame_interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        log::info!("frame loop stopped after {} frames", self.frames);
        Ok(sim)
    }

    fn drain_events(&mut self, view: &mut ViewState) -> io::Result<()> {
        while let Some(event) = self.term.poll_event(Duration::ZERO)? {
            match event {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if let Some(command) = map_key(key.code, key.modifiers) {
                        self.handle_command(command, view);
                    }
                }
                Event::Mouse(mouse) => {
                    let (w, h) = self.term.pixel_size();
                    let ui_scale = Projection::new(view, w as f64, h as f64).ui_scale();
                    if let Some(command) = self.pointer.handle(&mouse, ui_scale) {
                        command.apply(view);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: Command, view: &mut ViewState) {
        let app = match command {
            Command::View(cmd) => {
                cmd.apply(view);
                return;
            }
            Command::App(app) => app,
        };

        if app.apply(&mut self.config) {
            log::debug!("{:?} -> {:?}", app, self.config);
            return;
        }

        match app {
            AppCommand::Quit => self.stop(),
            AppCommand::CycleTheme => {
                self.theme = Theme::next_after(self.theme.id);
                log::info!("theme switched to {}", self.theme.id);
                self.lighting.theme_changed(self.theme);
            }
            AppCommand::ToggleLog => self.show_log = !self.show_log,
            AppCommand::ToggleHelp => self.show_help = !self.show_help,
            _ => {}
        }
    }

    fn advance(&mut self, sim: SimState) -> SimState {
        let log = &mut self.log;
        let sim = sim::tick(sim, &self.config, self.theme, |attack| log.push(attack));
        self.lighting.poll();
        sim
    }

    /// Paint the globe and panels into the terminal buffer.
    fn compose(&mut self, sim: &SimState) {
        let (w, h) = self.term.pixel_size();
        if (self.canvas.width(), self.canvas.height()) != (w, h) {
            self.canvas.resize(w, h);
        }

        let atlas = AtlasCache::global().atlas();
        self.renderer.render(&mut self.canvas, sim, &self.config, self.theme, atlas.as_deref());

        let term = &mut *self.term;
        term.blit_image(&self.canvas.to_logical_image());
        overlay::render_status(
            term,
            self.theme,
            &self.config,
            sim.attacks.len(),
            self.lighting.status(),
            &AtlasCache::global().state(),
        );
        if self.show_log {
            overlay::render_attack_log(term, &self.log, self.theme);
        }
        if self.show_help {
            overlay::render_help(term, self.theme);
        }
    }
}

/// Interactive session on the current terminal.
pub fn run(config: RunConfig) -> Result<()> {
    let theme = resolve_theme(&config.theme_id)?;
    let seed = config.seed.unwrap_or_else(clock_seed);
    log::info!("starting netwatch: seed {}, theme {}", seed, theme.id);

    if let Some(source) = config.geography.clone() {
        AtlasCache::global().spawn_load(source);
    }

    let mut term = Terminal::new(true, true).context("setting up terminal")?;
    term.clear_screen()?;

    let sim = SimState::new(initial_view(&config.globe), seed);
    let mut frame_loop = FrameLoop::new(&mut term, &config, theme, seed);
    let sim = frame_loop.run(sim)?;
    log::info!("exit with {} live attacks, {} ripples", sim.attacks.len(), sim.ripples.len());
    Ok(())
}

/// Advance the simulation headlessly and write one frame as PNG.
pub fn run_snapshot(config: SnapshotConfig) -> Result<()> {
    let run = &config.run;
    let theme = resolve_theme(&run.theme_id)?;
    let globe = run.globe.clamped();
    let seed = run.seed.unwrap_or_else(clock_seed);

    let mut spawned = 0usize;
    let mut sim = SimState::new(initial_view(&globe), seed);
    for _ in 0..config.ticks {
        sim = sim::tick(sim, &globe, theme, |_| spawned += 1);
    }
    log::info!(
        "snapshot after {} ticks: {} spawned, {} live, {} ripples",
        config.ticks,
        spawned,
        sim.attacks.len(),
        sim.ripples.len()
    );

    let atlas = match &run.geography {
        Some(source) => {
            let cache = AtlasCache::global();
            if cache.try_begin() {
                cache.finish(source.load());
                cache.atlas()
            } else {
                cache.wait(ATLAS_WAIT)
            }
        }
        None => None,
    };

    let mut canvas = Canvas::new(config.width.max(1), config.height.max(1), config.density.max(1));
    if config.density > MAX_DENSITY || (canvas.width(), canvas.height()) != (config.width.max(1), config.height.max(1)) {
        log::warn!(
            "snapshot size {}x{} at density {} clamped to {}x{} at density {}",
            config.width,
            config.height,
            config.density,
            canvas.width(),
            canvas.height(),
            config.density.clamp(1, MAX_DENSITY)
        );
    }
    let mut renderer = FrameRenderer::new(seed);
    renderer.render(&mut canvas, &sim, &globe, theme, atlas.as_deref());

    canvas
        .to_image()
        .save(&config.out)
        .with_context(|| format!("writing snapshot to {}", config.out.display()))?;
    log::info!("snapshot written to {}", config.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ViewCommand;

    fn run_config() -> RunConfig {
        RunConfig {
            seed: Some(5),
            geography: None,
            ..RunConfig::default()
        }
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(resolve_theme("sepia").is_err());
        assert_eq!(resolve_theme("matrix").unwrap().id, "matrix");
    }

    #[test]
    fn commands_reach_view_config_and_host() {
        let mut term = Terminal::offscreen(60, 20);
        let run = run_config();
        let mut frame_loop = FrameLoop::new(&mut term, &run, resolve_theme("cyber").unwrap(), 5);
        frame_loop.running = true;
        let mut view = ViewState::default();

        frame_loop.handle_command(Command::View(ViewCommand::Zoom { delta: -1.0 }), &mut view);
        assert!((view.zoom - 1.1).abs() < 1e-9);

        frame_loop.handle_command(Command::App(AppCommand::TogglePlay), &mut view);
        assert!(!frame_loop.config.is_playing);

        frame_loop.handle_command(Command::App(AppCommand::CycleTheme), &mut view);
        assert_ne!(frame_loop.theme.id, "cyber");

        frame_loop.handle_command(Command::App(AppCommand::ToggleHelp), &mut view);
        assert!(frame_loop.show_help);

        frame_loop.handle_command(Command::App(AppCommand::Quit), &mut view);
        assert!(!frame_loop.running);
    }

    #[test]
    fn zero_frame_limit_renders_nothing() {
        let mut term = Terminal::offscreen(60, 20);
        let run = RunConfig { frames: Some(0), ..run_config() };
        let sim = {
            let mut frame_loop = FrameLoop::new(&mut term, &run, resolve_theme("cyber").unwrap(), 5);
            let sim = frame_loop.run(SimState::new(ViewState::default(), 5)).unwrap();
            assert_eq!(frame_loop.frames, 0);
            assert!(!frame_loop.running);
            sim
        };
        assert!(sim.attacks.is_empty() && sim.satellites.is_empty());
        assert_eq!(term.cell(15, 10).unwrap().ch, ' ');
    }

    #[test]
    fn frame_limit_counts_rendered_frames() {
        let mut term = Terminal::offscreen(60, 20);
        let run = RunConfig { frames: Some(2), ..run_config() };
        let mut frame_loop = FrameLoop::new(&mut term, &run, resolve_theme("cyber").unwrap(), 5);
        assert!(!frame_loop.limit_reached());
        frame_loop.frames = 2;
        assert!(frame_loop.limit_reached());
    }

    #[test]
    fn advancing_feeds_the_attack_log() {
        let mut term = Terminal::offscreen(60, 20);
        let run = run_config();
        let mut frame_loop = FrameLoop::new(&mut term, &run, resolve_theme("cyber").unwrap(), 5);

        let mut sim = SimState::new(ViewState::default(), 5);
        for _ in 0..300 {
            sim = frame_loop.advance(sim);
        }
        assert!(!frame_loop.log.is_empty());
        assert!(frame_loop.log.len() <= overlay::LOG_CAPACITY);
    }

    #[test]
    fn compose_draws_globe_and_status() {
        let mut term = Terminal::offscreen(60, 20);
        let run = run_config();
        {
            let mut frame_loop = FrameLoop::new(&mut term, &run, resolve_theme("cyber").unwrap(), 5);
            let sim = SimState::new(ViewState::default(), 5);
            frame_loop.compose(&sim);
        }

        let status: String = (0..60).filter_map(|x| term.cell(x, 0)).map(|c| c.ch).collect();
        assert!(status.starts_with(" NETWATCH"));
        let center = term.cell(15, 10).unwrap();
        assert_eq!(center.ch, crate::terminal::HALF_BLOCK);
    }

    #[test]
    fn snapshot_writes_png() {
        let out = std::env::temp_dir().join(format!("netwatch-snapshot-{}.png", std::process::id()));
        let config = SnapshotConfig {
            run: run_config(),
            out: out.clone(),
            ticks: 20,
            width: 80,
            height: 60,
            density: 2,
        };
        run_snapshot(config).unwrap();

        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (160, 120));
        let _ = std::fs::remove_file(&out);
    }
}
