pub mod lighting_factory;
pub mod serial_lighting;
