use crate::lighting::domain::lighting_controller::{LightingController, NoLighting};

use super::serial_lighting::SerialLighting;

/// Builds the lighting capability for the configured port.
///
/// No port, or a port that cannot be opened, yields [`NoLighting`]: lighting
/// is cosmetic and never stops the installation from starting.
pub fn create_lighting(port: Option<&str>, baud_rate: u32) -> Box<dyn LightingController> {
    match port {
        None => {
            log::info!("No lighting port configured; lighting cues disabled");
            Box::new(NoLighting)
        }
        Some(name) => match SerialLighting::open(name, baud_rate) {
            Ok(lighting) => Box::new(lighting),
            Err(e) => {
                log::warn!("{e}; continuing without lighting");
                Box::new(NoLighting)
            }
        },
    }
}
