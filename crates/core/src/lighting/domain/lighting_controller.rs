use std::fmt;

/// Cue sent to the viewer-facing light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightingCommand {
    /// Normal vanity lighting: the glass reads as a mirror.
    Lit,
    /// Flickering while the backend works.
    Flicker,
    /// Lights off so the display behind the glass shows through.
    Dark,
}

impl LightingCommand {
    /// Single byte written to the lighting channel.
    pub fn byte(self) -> u8 {
        match self {
            LightingCommand::Lit => b'L',
            LightingCommand::Flicker => b'F',
            LightingCommand::Dark => b'D',
        }
    }
}

impl fmt::Display for LightingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightingCommand::Lit => write!(f, "lit"),
            LightingCommand::Flicker => write!(f, "flicker"),
            LightingCommand::Dark => write!(f, "dark"),
        }
    }
}

/// Best-effort lighting accessory.
///
/// Fire-and-forget: implementations swallow and log their own failures, so
/// the loop never has to care whether lighting is present or working.
pub trait LightingController {
    fn send(&mut self, command: LightingCommand);

    /// Releases the channel. Cues sent afterwards are dropped.
    fn close(&mut self) {}
}

/// Lighting controller used when no lighting port is configured.
pub struct NoLighting;

impl LightingController for NoLighting {
    fn send(&mut self, _command: LightingCommand) {}
}
