//! Configuration of the HCal producers
//!
//! The digitization, reconstruction and clustering
//! producers as they appear in the sequence of the 
//! process. The numbers are derived from the constant
//! bank and the chip gain.
//!

use std::fmt;

use crate::constants::{
  N_PE_PER_MIP,
  MIP_SI_ENERGY,
  CLOCK_CYCLE,
  VOLTAGE_PER_PE,
  TOA_COUNTS_PER_CLOCK,
  N_HCAL_LAYERS_V12,
  HCAL_DIGIS,
  HCAL_SIM_HITS,
  HCAL_REC_HITS,
  HCAL_CLUSTERS,
};
use crate::errors::SettingsError;
use crate::geometry::GeometryPreset;
use crate::hgcroc::HgcrocSettings;

/// Serialize to toml for the Display impls,
/// falling back to an error marker
fn toml_repr<T : serde::Serialize>(value : &T) -> String {
  match toml::to_string(value) {
    Err(err) => {
      error!("Serialization error! {err}");
      String::from("-- SERIALIZATION ERROR! --")
    }
    Ok(repr) => repr
  }
}

/// Configuration for the HcalDigiProducer
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HcalDigiProducer {
  pub instance_name       : String,
  pub class_name          : String,
  pub module_name         : String,
  /// Conversion between energy [MeV] and voltage [mV]
  pub mev                 : f64,
  /// Number of scintillator layers, needed to 
  /// generate noise ids
  pub n_hcal_layers       : usize,
  pub n_modules_per_layer : usize,
  pub n_cells_per_module  : usize,
  /// Configuration of the chip emulator
  pub hgcroc              : HgcrocSettings,
}

impl HcalDigiProducer {
  pub fn new(gain : f64, instance_name : &str) -> Self {
    let hgcroc = HgcrocSettings::hcal(gain);
    // energy [MeV] ( 1 MIP / energy per MIP [MeV] ) ( voltage per MIP [mV] / 1 MIP ) = voltage [mV]
    // with 1 PE ~ 5 mV this is 72.961 mV/MeV
    let mev = hgcroc.calculate_voltage_hcal(N_PE_PER_MIP)/MIP_SI_ENERGY;
    Self {
      instance_name       : String::from(instance_name),
      class_name          : String::from("ldmx::HcalDigiProducer"),
      module_name         : String::from("Hcal"),
      mev,
      n_hcal_layers       : N_HCAL_LAYERS_V12,
      n_modules_per_layer : 1,
      n_cells_per_module  : 60,
      hgcroc,
    }
  }

  /// Change the gain of the chip, all derived 
  /// parameters are calculated again
  pub fn set_gain(&mut self, gain : f64) {
    self.hgcroc.set_gain(gain);
    self.mev = self.hgcroc.calculate_voltage_hcal(N_PE_PER_MIP)/MIP_SI_ENERGY;
  }

  /// Voltage [mV] for a deposited energy [MeV]
  pub fn energy_to_voltage(&self, edep : f64) -> f64 {
    edep*self.mev
  }

  /// Number of PE created by a deposited 
  /// energy [MeV], truncated
  pub fn energy_to_pe(&self, edep : f64) -> u32 {
    (edep/MIP_SI_ENERGY*N_PE_PER_MIP) as u32
  }

  /// Time [ns] to counts of the internal clock
  pub fn ns_to_clock_counts(&self, time : f64) -> f64 {
    time*TOA_COUNTS_PER_CLOCK/self.hgcroc.clock_cycle
  }
}

impl Default for HcalDigiProducer {
  fn default() -> Self {
    Self::new(1.0, "hcalDigis")
  }
}

impl fmt::Display for HcalDigiProducer {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalDigiProducer :\n{}>", toml_repr(self))
  }
}

/*************************************/

/// Configuration for the HcalRecProducer
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HcalRecProducer {
  pub instance_name                  : String,
  pub class_name                     : String,
  pub module_name                    : String,
  /// Conversion from voltage [mV] to number of MIPs
  pub voltage_per_mip                : f64,
  /// Energy [MeV] of a MIP
  pub mip_si_energy                  : f64,
  /// Time for one DAQ clock cycle [ns]
  pub clock_cycle                    : f64,
  pub digi_coll_name                 : String,
  pub digi_pass_name                 : String,
  pub sim_hit_coll_name              : String,
  pub sim_hit_pass_name              : String,
  pub rec_hit_coll_name              : String,
  /// The geometry the weights were calculated for
  pub preset                         : GeometryPreset,
  /// Correction to the weighted energy
  pub second_order_energy_correction : f64,
  /// Weighting factors depending on the layer index
  pub layer_weights                  : Vec<f64>,
}

impl HcalRecProducer {
  
  /// The v12 geometry is used by default
  pub fn new(instance_name : &str) -> Self {
    let mut rec = Self {
      instance_name                  : String::from(instance_name),
      class_name                     : String::from("ldmx::HcalRecProducer"),
      module_name                    : String::from("Hcal"),
      voltage_per_mip                : VOLTAGE_PER_PE*N_PE_PER_MIP,
      mip_si_energy                  : MIP_SI_ENERGY,
      clock_cycle                    : CLOCK_CYCLE,
      digi_coll_name                 : String::from(HCAL_DIGIS),
      digi_pass_name                 : String::from(""),
      sim_hit_coll_name              : String::from(HCAL_SIM_HITS),
      sim_hit_pass_name              : String::from(""),
      rec_hit_coll_name              : String::from(HCAL_REC_HITS),
      preset                         : GeometryPreset::V12,
      second_order_energy_correction : 1.0,
      layer_weights                  : Vec::new(),
    };
    rec.v12();
    rec
  }

  /// Layer weights and energy correction for the 
  /// v12 geometry
  pub fn v12(&mut self) {
    self.apply_preset(GeometryPreset::V12);
  }

  pub fn apply_preset(&mut self, preset : GeometryPreset) {
    self.preset                         = preset;
    self.second_order_energy_correction = preset.second_order_energy_correction();
    self.layer_weights                  = preset.layer_weights();
  }

  /// The layer weights have to match the number
  /// of layers of the geometry
  pub fn validate(&self) -> Result<(), SettingsError> {
    if self.layer_weights.len() != self.preset.n_layers() {
      error!("{} has {} layer weights, but geometry {} has {} layers!",
             self.instance_name, self.layer_weights.len(), self.preset, self.preset.n_layers());
      return Err(SettingsError::InvalidLayerWeights);
    }
    if !self.second_order_energy_correction.is_finite() || self.second_order_energy_correction <= 0.0 {
      error!("Second order energy correction {} of {} is not usable!",
             self.second_order_energy_correction, self.instance_name);
      return Err(SettingsError::InvalidEnergyCorrection);
    }
    Ok(())
  }
}

impl Default for HcalRecProducer {
  fn default() -> Self {
    Self::new("hcalRecon")
  }
}

impl fmt::Display for HcalRecProducer {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalRecProducer : {} ({}), voltage/MIP {} mV, MIP energy {} MeV, clock {} ns, {} layer weights, correction {:.5}>",
           self.instance_name,
           self.class_name,
           self.voltage_per_mip,
           self.mip_si_energy,
           self.clock_cycle,
           self.layer_weights.len(),
           self.second_order_energy_correction)
  }
}

/*************************************/

/// Configuration for the HcalClusterProducer
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HcalClusterProducer {
  pub instance_name     : String,
  pub class_name        : String,
  pub module_name       : String,
  /// Minimum energy [MeV] of a hit to seed a cluster
  pub e_min_seed        : f64,
  /// Hits below this energy [MeV] are noise
  pub e_noise_cut       : f64,
  /// Minimum energy [MeV] of a cluster to 
  /// absorb its neighbours
  pub e_min_cluster     : f64,
  /// Clusters closer than this [mm] get merged
  pub cut_off           : f64,
  pub rec_hit_coll_name : String,
  pub cluster_coll_name : String,
}

impl HcalClusterProducer {
  pub fn new(instance_name : &str) -> Self {
    Self {
      instance_name     : String::from(instance_name),
      class_name        : String::from("ldmx::HcalClusterProducer"),
      module_name       : String::from("Hcal"),
      e_min_seed        : 0.1,
      e_noise_cut       : 0.01,
      e_min_cluster     : 0.5,
      cut_off           : 100.0,
      rec_hit_coll_name : String::from(HCAL_REC_HITS),
      cluster_coll_name : String::from(HCAL_CLUSTERS),
    }
  }
}

impl Default for HcalClusterProducer {
  fn default() -> Self {
    Self::new("hcalClusters")
  }
}

impl fmt::Display for HcalClusterProducer {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalClusterProducer :\n{}>", toml_repr(self))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mev_does_not_depend_on_gain() {
    for gain in [0.1, 0.5, 1.0, 7.3] {
      let digi     = HcalDigiProducer::new(gain, "myHcalDigis");
      let expected = digi.hgcroc.calculate_voltage_hcal(68.0)/4.66;
      assert_eq!(digi.mev, expected);
      assert_eq!(digi.hgcroc.gain, gain);
    }
  }

  #[test]
  fn digi_gain_change_rederives_chip() {
    let mut digi = HcalDigiProducer::new(0.5, "myHcalDigis");
    let before   = digi.hgcroc.readout_threshold;
    digi.set_gain(1.0);
    assert_eq!(digi.hgcroc.gain, 1.0);
    assert!(digi.hgcroc.readout_threshold > before);
  }

  #[test]
  fn unit_conversions() {
    let digi = HcalDigiProducer::new(0.5, "myHcalDigis");
    assert_eq!(digi.energy_to_pe(4.66), 68);
    assert_eq!(digi.ns_to_clock_counts(25.0), 1024.0);
    assert_eq!(digi.energy_to_voltage(4.66), 4.66*digi.mev);
  }

  #[test]
  fn rec_defaults_to_v12() {
    let rec = HcalRecProducer::new("myHcalRecHits");
    assert_eq!(rec.voltage_per_mip, 340.0);
    assert_eq!(rec.mip_si_energy, 4.66);
    assert_eq!(rec.clock_cycle, 25.0);
    assert_eq!(rec.layer_weights.len(), 101);
    assert!(rec.layer_weights.iter().all(|w| *w == 1.0));
    assert_eq!(rec.second_order_energy_correction, 4000.0/4010.0);
    assert_eq!(rec.digi_coll_name, "HcalDigis");
    assert!(rec.validate().is_ok());
    // the chip gain belongs to the digitization only
    assert!(!toml::to_string(&rec).unwrap().contains("gain"));
  }

  #[test]
  fn rec_validation() {
    let mut rec = HcalRecProducer::new("myHcalRecHits");
    rec.layer_weights.pop();
    assert_eq!(rec.validate(), Err(SettingsError::InvalidLayerWeights));
    rec.v12();
    rec.second_order_energy_correction = f64::NAN;
    assert_eq!(rec.validate(), Err(SettingsError::InvalidEnergyCorrection));
  }
}
