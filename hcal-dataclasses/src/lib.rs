//! HCal dataclasses
//!
//! Everything the HCal digitization and reconstruction chain
//! needs to know before the first event is processed:
//!
//! * the module-wide constant bank (PE per MIP, MIP energy, clock)
//! * the HGCROC chip parameters derived from it for a given gain
//! * the producer configurations for digitization, reconstruction
//!   and clustering
//! * condition tables (pedestals, gains) and the process-wide
//!   registry of conditions providers
//! * the geometry presets and the singleton geometry provider
//! * the pipeline (process) description which is handed to the
//!   run loop
//!
//! The reconstruction and clustering steps which turn digis into
//! hits and hits into clusters are implemented here as well, the 
//! digitization itself (pulse shape, ADC/TOT emulation) is not.
//!

#[macro_use] extern crate log;

pub mod constants;
pub mod errors;
pub mod ids;
pub mod hgcroc;
pub mod conditions;
pub mod geometry;
pub mod digis;
pub mod producers;
pub mod reconstruction;
pub mod clustering;
pub mod process;

pub use ids::{HcalID,
              HcalDigiID};
pub use hgcroc::HgcrocSettings;
pub use producers::{HcalDigiProducer,
                    HcalRecProducer,
                    HcalClusterProducer};
pub use geometry::{GeometryPreset,
                   HcalGeometryProvider,
                   HcalReadout,
                   StripGeometry};
pub use process::Process;

/// Create a random instance of a dataclass,
/// used in tests and for debugging purposes
#[cfg(feature = "random")]
pub trait FromRandom {
  fn from_random() -> Self;
}
