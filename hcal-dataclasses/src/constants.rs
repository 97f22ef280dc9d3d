//! Module-wide physical constants for the HCal
//!
//! These are fixed for the lifetime of the process,
//! the chip parameters and unit conversions of the 
//! producers are derived from them.
//!

/// Number of PE created for each MIP in a 20 mm 
/// scintillator bar
pub const N_PE_PER_MIP : f64 = 68.0;

/// Energy [MeV] of a single MIP on average in a 20 mm 
/// scintillator bar.
/// Measured 1.4 MeV for a 6mm thick tile, so for a 
/// 20mm bar = 1.4*20/6
pub const MIP_SI_ENERGY : f64 = 4.66;

/// Time for one DAQ clock cycle to pass [ns].
/// Needs to match the setting on the chip
pub const CLOCK_CYCLE : f64 = 25.0;

/// Voltage [mV] of the signal created by a single PE
pub const VOLTAGE_PER_PE : f64 = 5.0;

/// Number of TOA/TOT counts within one clock cycle (10 bits)
pub const TOA_COUNTS_PER_CLOCK : f64 = 1024.0;

/// Readout capacitance of the chip [pF]
pub const READOUT_PAD_CAPACITANCE_HCAL : f64 = 20.0;

/// Number of scintillator layers in the v12 geometry
pub const N_HCAL_LAYERS_V12 : usize = 101;

/// The second order energy correction for v12 was
/// determined comparing the mean of 1M single 4GeV
/// muon events
pub const SECOND_ORDER_ENERGY_CORRECTION_V12 : f64 = 4000.0/4010.0;

/// Name under which the recon conditions table is 
/// registered
pub const HCAL_RECON_CONDITIONS : &str = "HcalReconConditions";

/// Name under which the geometry (HcalReadout) is 
/// provided
pub const HCAL_GEOMETRY_PROVIDER : &str = "HcalGeometryProvider";

/// Default collection names on the event bus
pub const HCAL_DIGIS    : &str = "HcalDigis";
pub const HCAL_SIM_HITS : &str = "HcalSimHits";
pub const HCAL_REC_HITS : &str = "HcalRecHits";
pub const HCAL_CLUSTERS : &str = "HcalClusters";
