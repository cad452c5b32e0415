use minifb::{Key, ScaleMode, Window, WindowOptions};

use crate::display::domain::display_surface::{DisplayError, DisplaySurface};
use crate::shared::frame::Frame;

/// A `minifb` window.
///
/// The preview window is a normal resizable window; the output window is
/// borderless and stays on top so it can sit behind the two-way glass.
pub struct WindowSurface {
    window: Option<Window>,
    title: String,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
    quit: bool,
}

impl WindowSurface {
    pub fn open_preview(title: &str, width: usize, height: usize) -> Result<Self, DisplayError> {
        let options = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        };
        Self::open(title, width, height, options)
    }

    /// minifb has no fullscreen mode; size the window to the display instead.
    pub fn open_output(title: &str, width: usize, height: usize) -> Result<Self, DisplayError> {
        let options = WindowOptions {
            borderless: true,
            topmost: true,
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        };
        Self::open(title, width, height, options)
    }

    fn open(
        title: &str,
        width: usize,
        height: usize,
        options: WindowOptions,
    ) -> Result<Self, DisplayError> {
        let window = Window::new(title, width, height, options).map_err(|e| DisplayError::Open {
            title: title.to_string(),
            reason: e.to_string(),
        })?;
        log::info!("Opened window '{title}' ({width}x{height})");
        Ok(Self {
            window: Some(window),
            title: title.to_string(),
            width,
            height,
            buffer: Vec::new(),
            quit: false,
        })
    }

    fn poll_quit(&mut self) {
        if let Some(window) = &self.window {
            if !window.is_open()
                || window.is_key_down(Key::Escape)
                || window.is_key_down(Key::Q)
            {
                if !self.quit {
                    log::info!("Quit requested from window '{}'", self.title);
                }
                self.quit = true;
            }
        }
    }
}

impl DisplaySurface for WindowSurface {
    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        rgb_to_0rgb(frame, &mut self.buffer);
        window
            .update_with_buffer(&self.buffer, frame.width() as usize, frame.height() as usize)
            .map_err(|e| DisplayError::Present(e.to_string()))?;
        self.width = frame.width() as usize;
        self.height = frame.height() as usize;
        self.poll_quit();
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        self.present(&Frame::black(self.width as u32, self.height as u32))
    }

    fn quit_requested(&mut self) -> bool {
        // Pump events so key presses register while nothing is being presented
        if let Some(window) = self.window.as_mut() {
            window.update();
        }
        self.poll_quit();
        self.quit
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::debug!("Closed window '{}'", self.title);
        }
    }
}

/// Packs RGB(A) bytes into the `0RGB` words `minifb` expects, reusing `out`.
pub fn rgb_to_0rgb(frame: &Frame, out: &mut Vec<u32>) {
    let channels = frame.channels().max(1) as usize;
    out.clear();
    out.extend(frame.data().chunks_exact(channels).map(|px| {
        let (r, g, b) = if channels >= 3 {
            (px[0], px[1], px[2])
        } else {
            (px[0], px[0], px[0])
        };
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }));
}
