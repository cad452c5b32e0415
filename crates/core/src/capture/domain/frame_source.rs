use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device {device} unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("failed to grab frame: {0}")]
    CaptureFailed(String),
}

/// Which capture device to open: a numeric index or a platform device path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceId {
    Index(u32),
    Path(String),
}

impl Default for DeviceId {
    fn default() -> Self {
        DeviceId::Index(0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    /// Numeric strings select by index, anything else is a device path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u32>() {
            Ok(index) => DeviceId::Index(index),
            Err(_) => DeviceId::Path(s.to_string()),
        })
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(i) => write!(f, "#{i}"),
            DeviceId::Path(p) => write!(f, "{p}"),
        }
    }
}

/// Live capture device producing frames on demand.
///
/// `read_frame` is expected to return at roughly the device's native frame
/// rate. Opening happens in the implementation's constructor.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Reads and discards frames for approximately `duration`.
    ///
    /// Keeps the next `read_frame` close to real time on devices that buffer
    /// several frames internally. Returns the number of frames discarded.
    fn drain(&mut self, duration: Duration) -> Result<usize, CaptureError> {
        drain_for(duration, || self.read_frame().map(|_| ()))
    }

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}

/// Calls `grab` until `duration` has elapsed and returns how many times it ran.
///
/// Sources that can fetch a frame without decoding it override
/// [`FrameSource::drain`] with a cheaper `grab`.
pub fn drain_for(
    duration: Duration,
    mut grab: impl FnMut() -> Result<(), CaptureError>,
) -> Result<usize, CaptureError> {
    let start = Instant::now();
    let mut discarded = 0;
    while start.elapsed() < duration {
        grab()?;
        discarded += 1;
    }
    Ok(discarded)
}
