use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use image::RgbaImage;
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Upper half block: foreground paints the top pixel, background the bottom
pub const HALF_BLOCK: char = '▀';

/// Terminal abstraction for rendering
pub struct Terminal {
    width: u16,
    height: u16,
    buffer: Vec<Vec<Cell>>,
    alternate_screen: bool,
    mouse_capture: bool,
}

/// A single cell in the terminal buffer
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: None,
            bg: None,
            bold: false,
        }
    }
}

impl Terminal {
    /// Initialize the terminal for drawing
    pub fn new(alternate_screen: bool, mouse_capture: bool) -> io::Result<Self> {
        let (width, height) = size()?;

        if alternate_screen {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
        }
        if mouse_capture {
            execute!(stdout(), EnableMouseCapture)?;
        }

        Ok(Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            alternate_screen,
            mouse_capture,
        })
    }

    /// Buffer-only terminal that never touches the real screen
    #[cfg(test)]
    pub fn offscreen(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            alternate_screen: false,
            mouse_capture: false,
        }
    }

    /// Get terminal dimensions
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Canvas size in logical pixels: one column wide, two per row
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32 * 2)
    }

    /// Resize the buffer; returns true when the size actually changed
    pub fn resize(&mut self, width: u16, height: u16) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.buffer = vec![vec![Cell::default(); width as usize]; height as usize];
        true
    }

    /// Pick up a size change from the real terminal
    pub fn refresh_size(&mut self) -> io::Result<bool> {
        let (width, height) = size()?;
        let changed = self.resize(width, height);
        if changed {
            self.clear_screen()?;
        }
        Ok(changed)
    }

    /// Clear the actual terminal
    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(stdout(), Clear(ClearType::All))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.get(y as usize)?.get(x as usize)
    }

    pub fn set_with_bg(&mut self, x: i32, y: i32, ch: char, fg: Option<Color>, bg: Option<Color>, bold: bool) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize][x as usize] = Cell { ch, fg, bg, bold };
        }
    }

    pub fn set_str_with_bg(&mut self, x: i32, y: i32, s: &str, fg: Option<Color>, bg: Option<Color>, bold: bool) {
        for (i, ch) in s.chars().enumerate() {
            self.set_with_bg(x + i as i32, y, ch, fg, bg, bold);
        }
    }

    /// Fill the buffer from an image of `pixel_size()`, two pixels per cell
    pub fn blit_image(&mut self, img: &RgbaImage) {
        let rows = (img.height() / 2).min(self.height as u32);
        let cols = img.width().min(self.width as u32);
        for cy in 0..rows {
            for cx in 0..cols {
                let top = img.get_pixel(cx, cy * 2).0;
                let bottom = img.get_pixel(cx, cy * 2 + 1).0;
                self.buffer[cy as usize][cx as usize] = Cell {
                    ch: HALF_BLOCK,
                    fg: Some(rgb(top[0], top[1], top[2])),
                    bg: Some(rgb(bottom[0], bottom[1], bottom[2])),
                    bold: false,
                };
            }
        }
    }

    /// Render the entire buffer to screen
    pub fn present(&self) -> io::Result<()> {
        let mut out = stdout().lock();
        let mut fg: Option<Color> = None;
        let mut bg: Option<Color> = None;
        let mut bold = false;

        for (y, row) in self.buffer.iter().enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in row {
                if cell.bold != bold {
                    queue!(out, SetAttribute(if cell.bold { Attribute::Bold } else { Attribute::NormalIntensity }))?;
                    bold = cell.bold;
                }
                if cell.fg != fg {
                    match cell.fg {
                        Some(color) => queue!(out, SetForegroundColor(color))?,
                        None => queue!(out, SetForegroundColor(Color::Reset))?,
                    }
                    fg = cell.fg;
                }
                if cell.bg != bg {
                    match cell.bg {
                        Some(color) => queue!(out, SetBackgroundColor(color))?,
                        None => queue!(out, SetBackgroundColor(Color::Reset))?,
                    }
                    bg = cell.bg;
                }
                queue!(out, Print(cell.ch))?;
            }
        }

        queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        out.flush()
    }

    /// Next input event, waiting at most `timeout`
    pub fn poll_event(&self, timeout: Duration) -> io::Result<Option<Event>> {
        if poll(timeout)? {
            return Ok(Some(read()?));
        }
        Ok(None)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.mouse_capture {
            let _ = execute!(stdout(), DisableMouseCapture);
        }
        if self.alternate_screen {
            let _ = execute!(stdout(), ResetColor, Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

/// Helper to create RGB colors
pub fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}
