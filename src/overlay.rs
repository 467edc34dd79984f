//! Text panels drawn over the globe: status line, live attack log, help box.

use crate::config::GlobeConfig;
use crate::geo::atlas::AtlasState;
use crate::lighting::LightingStatus;
use crate::sim::{Attack, AttackType};
use crate::terminal::{rgb, Terminal};
use crate::theme::{Rgba, Theme};
use crossterm::style::Color;
use std::collections::VecDeque;
use std::net::Ipv4Addr;

pub const LOG_CAPACITY: usize = 30;
const LOG_WIDTH: usize = 36;

pub const HELP_TEXT: &str = "\
NETWATCH CONTROLS

drag / arrows / hjkl   rotate globe
wheel / + -            zoom
space                  play / pause
g                      graticule
s                      satellites
c                      major hubs only
t                      next theme
[ ]                    satellite count
< >                    attack intensity
, .                    rotation speed
a                      attack log
?                      close help
q / Esc                quit";

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub kind: AttackType,
    pub technique: &'static str,
    pub port: u16,
    pub source_ip: Ipv4Addr,
    pub target_ip: Ipv4Addr,
    pub critical: bool,
}

impl From<&Attack> for LogEntry {
    fn from(attack: &Attack) -> Self {
        Self {
            id: attack.id,
            kind: attack.kind,
            technique: attack.technique,
            port: attack.port,
            source_ip: attack.source_ip,
            target_ip: attack.target_ip,
            critical: attack.critical,
        }
    }
}

/// Most recent attacks first, capped at [`LOG_CAPACITY`].
#[derive(Debug, Default)]
pub struct AttackLog {
    entries: VecDeque<LogEntry>,
}

impl AttackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attack: &Attack) {
        self.entries.push_front(LogEntry::from(attack));
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Terminal colours for panels in the active theme
struct PanelStyle {
    bg: Color,
    border: Color,
    text: Color,
    dim: Color,
    accent: Color,
}

impl PanelStyle {
    fn for_theme(theme: &Theme) -> Self {
        let c = &theme.colors;
        Self {
            bg: solid(c.panel_bg, c.background),
            border: solid(c.panel_border, c.background),
            text: solid(c.text_primary, c.background),
            dim: solid(c.text_secondary, c.background),
            accent: solid(c.accent, c.background),
        }
    }
}

/// Flatten a translucent colour over `under`.
fn solid(color: Rgba, under: Rgba) -> Color {
    let mixed = under.lerp(color.with_alpha(1.0), color.a);
    rgb(mixed.r, mixed.g, mixed.b)
}

/// Filled box with a single-line border and an optional title in the top edge.
fn draw_panel(term: &mut Terminal, x: usize, y: usize, w: usize, h: usize, title: &str, style: &PanelStyle) {
    if w < 2 || h < 2 {
        return;
    }
    let (x, y) = (x as i32, y as i32);
    let (right, bottom) = (x + w as i32 - 1, y + h as i32 - 1);
    let bg = Some(style.bg);
    let border = Some(style.border);

    for row in y..=bottom {
        for col in x..=right {
            let ch = match (col == x, col == right, row == y, row == bottom) {
                (true, _, true, _) => '┌',
                (_, true, true, _) => '┐',
                (true, _, _, true) => '└',
                (_, true, _, true) => '┘',
                (_, _, true, _) | (_, _, _, true) => '─',
                (true, _, _, _) | (_, true, _, _) => '│',
                _ => ' ',
            };
            term.set_with_bg(col, row, ch, border, bg, false);
        }
    }

    if !title.is_empty() && w > 4 {
        let title: String = format!(" {} ", title).chars().take(w - 4).collect();
        term.set_str_with_bg(x + 2, y, &title, Some(style.accent), bg, true);
    }
}

fn attack_color(theme: &Theme, kind: AttackType) -> Color {
    solid(theme.attack_color(kind), theme.colors.background)
}

/// One-line title bar across the top row.
pub fn render_status(
    term: &mut Terminal,
    theme: &Theme,
    config: &GlobeConfig,
    live_attacks: usize,
    lighting: &LightingStatus,
    atlas: &AtlasState,
) {
    let (width, _) = term.size();
    let style = PanelStyle::for_theme(theme);
    let bg = Some(style.bg);

    let mut left = format!(
        " NETWATCH │ {} │ live {:>2}/{} │ sats {}",
        theme.name, live_attacks, config.attack_intensity, config.satellite_count
    );
    if !config.is_playing {
        left.push_str(" │ PAUSED");
    }
    let mut right = String::new();
    for label in [atlas.label(), lighting.label()] {
        if !label.is_empty() {
            right.push_str(&label);
            right.push_str(" │ ");
        }
    }
    right.push_str("? help ");

    term.set_str_with_bg(0, 0, &" ".repeat(width as usize), None, bg, false);
    term.set_str_with_bg(0, 0, &left, Some(style.text), bg, false);
    term.set_str_with_bg(0, 0, " NETWATCH", Some(style.accent), bg, true);

    let right_x = width as i32 - right.chars().count() as i32;
    if right_x > left.chars().count() as i32 {
        term.set_str_with_bg(right_x, 0, &right, Some(style.dim), bg, false);
    }
}

/// Right-hand panel listing the latest attacks, two rows per entry.
pub fn render_attack_log(term: &mut Terminal, log: &AttackLog, theme: &Theme) {
    let (width, height) = term.size();
    let (width, height) = (width as usize, height as usize);
    if width < 20 || height < 6 {
        return;
    }

    let style = PanelStyle::for_theme(theme);
    let box_width = LOG_WIDTH.min(width - 2);
    let box_height = height - 2;
    let start_x = width - box_width - 1;
    let start_y = 1;
    draw_panel(term, start_x, start_y, box_width, box_height, "LIVE INTERCEPTS", &style);

    let bg = Some(style.bg);
    let x = start_x as i32 + 2;
    let inner = box_width.saturating_sub(4);

    if log.is_empty() {
        term.set_str_with_bg(x, start_y as i32 + 2, "Scanning network...", Some(style.dim), bg, false);
        return;
    }

    let rows = (box_height - 2) / 2;
    for (i, entry) in log.entries().take(rows).enumerate() {
        let y = (start_y + 1 + i * 2) as i32;
        let label = entry.kind.label();
        let marker = if entry.critical { "!" } else { " " };
        term.set_str_with_bg(x, y, marker, Some(style.accent), bg, true);
        term.set_str_with_bg(x + 1, y, label, Some(attack_color(theme, entry.kind)), bg, true);

        let detail = format!("{} :{}", entry.technique, entry.port);
        let detail_x = x + 1 + label.len() as i32 + 1;
        let room = inner.saturating_sub(label.len() + 2);
        let detail: String = detail.chars().take(room).collect();
        term.set_str_with_bg(detail_x, y, &detail, Some(style.text), bg, false);

        let route = format!(" {} → {}", entry.source_ip, entry.target_ip);
        let route: String = route.chars().take(inner).collect();
        term.set_str_with_bg(x, y + 1, &route, Some(style.dim), bg, false);
    }
}

/// Centered box with [`HELP_TEXT`].
pub fn render_help(term: &mut Terminal, theme: &Theme) {
    let (width, height) = term.size();
    let style = PanelStyle::for_theme(theme);

    let lines: Vec<&str> = HELP_TEXT.lines().collect();
    let max_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_width = max_width + 4;
    let box_height = lines.len() + 2;

    let start_x = (width as usize).saturating_sub(box_width) / 2;
    let start_y = (height as usize).saturating_sub(box_height) / 2;
    draw_panel(term, start_x, start_y, box_width, box_height, "", &style);

    for (i, line) in lines.iter().enumerate() {
        let y = (start_y + 1 + i) as i32;
        let color = if i == 0 { style.accent } else { style.text };
        term.set_str_with_bg(start_x as i32 + 2, y, line, Some(color), Some(style.bg), i == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoCoord;
    use crate::theme::THEMES;

    fn attack(id: u64) -> Attack {
        Attack {
            id,
            source: GeoCoord::new(0.0, 0.0),
            target: GeoCoord::new(10.0, 10.0),
            source_ip: Ipv4Addr::new(10, 0, 0, 1),
            target_ip: Ipv4Addr::new(192, 168, 1, 9),
            technique: "SYN Flood",
            port: 443,
            progress: 0.0,
            speed: 0.01,
            kind: AttackType::Ddos,
            critical: id % 2 == 0,
            via_satellite: false,
        }
    }

    fn row_text(term: &Terminal, y: u16) -> String {
        let (w, _) = term.size();
        (0..w).filter_map(|x| term.cell(x, y)).map(|c| c.ch).collect()
    }

    fn screen_text(term: &Terminal) -> String {
        let (_, h) = term.size();
        (0..h).map(|y| row_text(term, y)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn log_keeps_newest_thirty() {
        let mut log = AttackLog::new();
        for id in 0..45 {
            log.push(&attack(id));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        let ids: Vec<u64> = log.entries().map(|e| e.id).collect();
        assert_eq!(ids.first(), Some(&44));
        assert_eq!(ids.last(), Some(&15));
    }

    #[test]
    fn empty_log_shows_scanning() {
        let mut term = Terminal::offscreen(80, 24);
        render_attack_log(&mut term, &AttackLog::new(), &THEMES[0]);
        let text = screen_text(&term);
        assert!(text.contains("LIVE INTERCEPTS"));
        assert!(text.contains("Scanning network..."));
    }

    #[test]
    fn log_rows_show_type_and_route() {
        let mut term = Terminal::offscreen(80, 24);
        let mut log = AttackLog::new();
        log.push(&attack(2));
        render_attack_log(&mut term, &log, &THEMES[0]);
        let text = screen_text(&term);
        assert!(text.contains("!DDOS SYN Flood :443"));
        assert!(text.contains("10.0.0.1 → 192.168.1.9"));
    }

    #[test]
    fn tiny_terminal_skips_log() {
        let mut term = Terminal::offscreen(10, 4);
        render_attack_log(&mut term, &AttackLog::new(), &THEMES[0]);
        assert!(!screen_text(&term).contains('┌'));
    }

    #[test]
    fn help_box_lists_quit() {
        let mut term = Terminal::offscreen(80, 24);
        render_help(&mut term, &THEMES[2]);
        let text = screen_text(&term);
        assert!(text.contains("NETWATCH CONTROLS"));
        assert!(text.contains("q / Esc                quit"));
        assert!(text.contains('┘'));
    }

    #[test]
    fn status_line_reports_pause_and_lighting() {
        let mut term = Terminal::offscreen(100, 3);
        let config = GlobeConfig { is_playing: false, ..GlobeConfig::default() };
        render_status(&mut term, &THEMES[0], &config, 3, &LightingStatus::Synced, &AtlasState::Uninitialized);
        let line = row_text(&term, 0);
        assert!(line.starts_with(" NETWATCH"));
        assert!(line.contains("PAUSED"));
        assert!(line.contains("WLED: synced"));
        assert!(line.contains(THEMES[0].name));
        assert!(!line.contains("map"));
    }

    #[test]
    fn status_line_reports_map_outage() {
        let mut term = Terminal::offscreen(120, 3);
        let failed = AtlasState::Failed("fetching world atlas: connection refused by upstream host".into());
        render_status(&mut term, &THEMES[0], &GlobeConfig::default(), 0, &LightingStatus::Disabled, &failed);
        let line = row_text(&term, 0);
        assert!(line.contains("map offline: fetching world atlas: connection… │ ? help"));
        assert!(line.ends_with("? help "));

        render_status(&mut term, &THEMES[0], &GlobeConfig::default(), 0, &LightingStatus::Disabled, &AtlasState::Loading);
        assert!(row_text(&term, 0).contains("map loading │ ? help"));
    }
}
