use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::archive::domain::snapshot_archive::SnapshotArchive;
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::presence_detector::PresenceDetector;
use crate::display::domain::display_surface::DisplaySurface;
use crate::display::domain::overlay::draw_regions;
use crate::lighting::domain::lighting_controller::{
    LightingCommand, LightingController, NoLighting,
};
use crate::mirror::mirror_config::MirrorConfig;
use crate::mirror::session_logger::{NullSessionLogger, SessionLogger};
use crate::shared::crop::CropBounds;
use crate::shared::frame::Frame;
use crate::transform::domain::image_transformer::{ImageTransformer, TransformError};

/// Fatal loop errors. Everything else is logged and the loop keeps watching.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    IdleWatch,
    SettleDelay,
    Recapture,
    TransformPending,
    DisplayResult,
    Shutdown,
}

/// Counters for one session, returned when the loop ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_watched: usize,
    /// Detections that started a capture cycle.
    pub episodes: usize,
    pub successes: usize,
    pub failed_transforms: usize,
    pub persistence_failures: usize,
}

/// Blocks the loop while a result is on screen.
pub type Sleeper = Box<dyn FnMut(Duration)>;

struct LoopSettings {
    mirror_flip: bool,
    crop: CropBounds,
    catch_up: Duration,
    settle: Duration,
    display: Duration,
}

impl LoopSettings {
    fn from_config(config: &MirrorConfig) -> Self {
        Self {
            mirror_flip: config.mirror_flip,
            crop: config.crop,
            catch_up: config.catch_up(),
            settle: config.settle(),
            display: config.display(),
        }
    }
}

/// The watch → settle → capture → transform → display cycle.
///
/// Single-threaded: every collaborator is owned by the loop and called in
/// order. The only way out is the quit signal (the shared flag or either
/// surface) or a capture failure; both release every resource before
/// [`MirrorLoop::run`] returns.
pub struct MirrorLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn PresenceDetector>,
    transformer: Box<dyn ImageTransformer>,
    preview: Box<dyn DisplaySurface>,
    output: Box<dyn DisplaySurface>,
    lighting: Box<dyn LightingController>,
    archive: Option<SnapshotArchive>,
    logger: Box<dyn SessionLogger>,
    cancelled: Arc<AtomicBool>,
    sleep: Sleeper,
    settings: LoopSettings,
    state: MirrorState,
    report: SessionReport,
}

impl MirrorLoop {
    pub fn new(
        config: &MirrorConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn PresenceDetector>,
        transformer: Box<dyn ImageTransformer>,
        preview: Box<dyn DisplaySurface>,
        output: Box<dyn DisplaySurface>,
    ) -> Self {
        Self {
            source,
            detector,
            transformer,
            preview,
            output,
            lighting: Box::new(NoLighting),
            archive: None,
            logger: Box::new(NullSessionLogger),
            cancelled: Arc::new(AtomicBool::new(false)),
            sleep: Box::new(std::thread::sleep),
            settings: LoopSettings::from_config(config),
            state: MirrorState::IdleWatch,
            report: SessionReport::default(),
        }
    }

    pub fn with_lighting(mut self, lighting: Box<dyn LightingController>) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_archive(mut self, archive: SnapshotArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn SessionLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Shares a quit flag with the caller (e.g. a Ctrl-C handler).
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_sleeper(mut self, sleep: Sleeper) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn state(&self) -> MirrorState {
        self.state
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Runs until quit is requested or the camera fails.
    pub fn run(&mut self) -> Result<SessionReport, MirrorError> {
        self.logger.info("Mirror is watching");
        let result = self.run_cycles();
        self.shutdown();
        match result {
            Ok(()) => Ok(self.report.clone()),
            Err(e) => {
                log::error!("Capture failed, shutting down: {e}");
                Err(e.into())
            }
        }
    }

    fn run_cycles(&mut self) -> Result<(), CaptureError> {
        loop {
            self.state = MirrorState::IdleWatch;
            if self.quit_requested() {
                return Ok(());
            }
            if !self.watch()? {
                continue;
            }
            self.report.episodes += 1;

            self.state = MirrorState::SettleDelay;
            self.settle()?;
            if self.quit_requested() {
                return Ok(());
            }

            self.state = MirrorState::Recapture;
            let captured = self.recapture()?;

            self.state = MirrorState::TransformPending;
            let outcome = self.transform(captured);
            if self.quit_requested() {
                return Ok(());
            }

            if let Some(result) = outcome {
                self.state = MirrorState::DisplayResult;
                self.display(&result);
                if self.quit_requested() {
                    return Ok(());
                }
            }
        }
    }

    /// One watch iteration. Returns whether anyone is in front of the mirror.
    fn watch(&mut self) -> Result<bool, CaptureError> {
        self.source.drain(self.settings.catch_up)?;
        let mut frame = self.source.read_frame()?;
        self.report.frames_watched += 1;
        self.logger.frame(frame.index());

        let start = Instant::now();
        let regions = self.detector.detect(&frame);
        self.logger.timing("detect", elapsed_ms(start));
        self.logger.metric("faces", regions.len() as f64);

        draw_regions(&mut frame, &regions);
        if let Err(e) = self.preview.present(&frame) {
            log::debug!("Preview update failed: {e}");
        }

        if regions.is_empty() {
            return Ok(false);
        }
        log::info!(
            "{} face(s) in frame {}, starting capture cycle",
            regions.len(),
            frame.index()
        );
        Ok(true)
    }

    fn settle(&mut self) -> Result<(), CaptureError> {
        let start = Instant::now();
        let discarded = self.source.drain(self.settings.settle)?;
        log::debug!("Settled, discarded {discarded} frame(s)");
        self.logger.timing("settle", elapsed_ms(start));
        Ok(())
    }

    fn recapture(&mut self) -> Result<Frame, CaptureError> {
        self.lighting.send(LightingCommand::Flicker);
        let frame = self.source.read_frame()?;
        Ok(if self.settings.mirror_flip {
            frame.flip_horizontal()
        } else {
            frame
        })
    }

    /// Returns the decoded result, or `None` after logging the failure.
    fn transform(&mut self, captured: Frame) -> Option<Frame> {
        let start = Instant::now();
        let outcome = self.attempt_transform(captured);
        let took = elapsed_ms(start);
        self.logger.timing("transform", took);

        match outcome {
            Ok((source, result)) => {
                self.report.successes += 1;
                log::info!("Transform succeeded in {took:.0}ms");
                self.persist(&source, &result);
                Some(result)
            }
            Err(e) => {
                self.report.failed_transforms += 1;
                log::warn!("Transform failed, back to watching: {e}");
                None
            }
        }
    }

    /// Crops, encodes, sends and decodes. Yields the frame that was sent
    /// alongside the decoded result.
    fn attempt_transform(&self, captured: Frame) -> Result<(Frame, Frame), TransformError> {
        let source = if self.settings.crop.is_identity() {
            captured
        } else {
            captured
                .crop(&self.settings.crop)
                .map_err(|e| TransformError::Encode(e.to_string()))?
        };
        let png = source
            .to_png()
            .map_err(|e| TransformError::Encode(e.to_string()))?;
        let bytes = self.transformer.transform(&png)?;
        let result = Frame::from_encoded(&bytes, source.index())
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        Ok((source, result))
    }

    fn persist(&mut self, source: &Frame, result: &Frame) {
        let Some(archive) = self.archive.as_mut() else {
            return;
        };
        if let Err(e) = archive.save(source, result) {
            self.report.persistence_failures += 1;
            log::warn!("{e}");
        }
    }

    fn display(&mut self, result: &Frame) {
        self.lighting.send(LightingCommand::Dark);
        if let Err(e) = self.output.present(result) {
            log::warn!("Failed to show result: {e}");
        }
        (self.sleep)(self.settings.display);
        if let Err(e) = self.output.blank() {
            log::warn!("Failed to blank output: {e}");
        }
        self.lighting.send(LightingCommand::Lit);
    }

    fn quit_requested(&mut self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        if self.preview.quit_requested() || self.output.quit_requested() {
            self.cancelled.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn shutdown(&mut self) {
        self.state = MirrorState::Shutdown;
        self.source.close();
        self.preview.close();
        self.output.close();
        self.lighting.close();
        let r = &self.report;
        self.logger.info(&format!(
            "Mirror stopped: {} frames watched, {} cycles, {} shown, {} failed",
            r.frames_watched, r.episodes, r.successes, r.failed_transforms
        ));
        self.logger.summary();
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
