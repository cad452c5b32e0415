use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to open window '{title}': {reason}")]
    Open { title: String, reason: String },
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// An on-screen surface: the live preview or the mirror output.
///
/// Surfaces are also where the operator asks to quit, so the loop polls
/// [`DisplaySurface::quit_requested`] at every checkpoint.
pub trait DisplaySurface {
    /// Shows `frame`, scaled to the surface.
    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Shows a black frame.
    fn blank(&mut self) -> Result<(), DisplayError>;

    /// True once the operator pressed quit or closed the surface.
    fn quit_requested(&mut self) -> bool;

    /// Releases the surface. Idempotent.
    fn close(&mut self);
}
