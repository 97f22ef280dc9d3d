//! Parameters of the HGCROC readout chip emulator
//!
//! The emulation itself (pulse shape, ADC and TOT
//! mode) happens in the digitizer of the run loop,
//! here we only derive the numbers it is configured 
//! with.
//!

use std::fmt;

use crate::constants::{
  VOLTAGE_PER_PE,
  CLOCK_CYCLE,
  READOUT_PAD_CAPACITANCE_HCAL,
};

/// Thresholds in units of PE for the HCal
pub const READOUT_THRESHOLD_PE : f64 = 1.0;
pub const TOA_THRESHOLD_PE     : f64 = 5.0;
pub const TOT_THRESHOLD_PE     : f64 = 10000.0;

/// Chip parameters consumed by the digitizer
///
/// Derived once from the constant bank and a 
/// gain. If the gain changes, the thresholds 
/// have to be derived again (use set_gain).
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HgcrocSettings {
  /// Pedestal [ADC counts]
  pub pedestal                : f64,
  /// Gain [mV/ADC count]
  pub gain                    : f64,
  /// Length of one clock cycle [ns]
  pub clock_cycle             : f64,
  /// Depth of the ADC buffer
  pub n_adcs                  : usize,
  /// Index of the sample of interest
  pub i_soi                   : usize,
  /// Put noise into the channels
  pub noise                   : bool,
  /// Noise RMS [mV]
  pub noise_rms               : f64,
  /// Readout pad capacitance [pF]
  pub readout_pad_capacitance : f64,
  /// Maximum charge the ADC can measure [fC]
  pub max_adc_range           : f64,
  /// Minimum voltage above which a channel
  /// is read out [mV]
  pub readout_threshold       : f64,
  /// Time of arrival threshold [mV]
  pub toa_threshold           : f64,
  /// Above this voltage the chip switches
  /// to TOT mode [mV]
  pub tot_threshold           : f64,
  /// Jitter of the timing measurement [ns]
  pub timing_jitter           : f64,
  // pulse shape 
  pub rate_up_slope           : f64,
  pub time_up_slope           : f64,
  pub rate_dn_slope           : f64,
  pub time_dn_slope           : f64,
  pub time_peak               : f64,
}

impl HgcrocSettings {

  /// Generic chip defaults
  pub fn new() -> Self {
    Self {
      pedestal                : 50.0,
      gain                    : 1.2,
      clock_cycle             : CLOCK_CYCLE,
      n_adcs                  : 10,
      i_soi                   : 0,
      noise                   : true,
      noise_rms               : 0.0,
      readout_pad_capacitance : 0.1,
      max_adc_range           : 320.0,
      readout_threshold       : 0.0,
      toa_threshold           : 0.0,
      tot_threshold           : 0.0,
      timing_jitter           : CLOCK_CYCLE/100.0,
      rate_up_slope           : -0.345,
      time_up_slope           : 70.6547,
      rate_dn_slope           : 0.140068,
      time_dn_slope           : 87.7649,
      time_peak               : 77.732,
    }
  }

  /// The chip configured for the HCal
  ///
  /// The pulse shape parameters are the ones from 
  /// a fit to a test readout of an HCal module, the
  /// readout threshold is set to 1 PE.
  pub fn hcal(gain : f64) -> Self {
    let mut hgcroc = Self::new();
    hgcroc.readout_pad_capacitance = READOUT_PAD_CAPACITANCE_HCAL;
    hgcroc.set_threshold_defaults_hcal(gain);
    hgcroc.rate_up_slope = -0.1141;
    hgcroc.time_up_slope = -9.897;
    hgcroc.rate_dn_slope = 0.0279;
    hgcroc.time_dn_slope = 45.037;
    hgcroc.time_peak     = 9.747;
    hgcroc
  }

  /// Voltage [mV] created by a number of PE
  pub fn calculate_voltage_hcal(&self, n_pe : f64) -> f64 {
    n_pe*VOLTAGE_PER_PE
  }

  /// Set the gain and the readout, TOA and TOT
  /// thresholds which go with it.
  ///
  /// The gain is not range checked.
  pub fn set_threshold_defaults_hcal(&mut self, gain : f64) {
    if !gain.is_finite() || gain <= 0.0 {
      warn!("Gain {gain} does not look physical, the emulator might not accept it!");
    }
    self.gain              = gain;
    let baseline           = self.gain*self.pedestal;
    self.readout_threshold = baseline + self.calculate_voltage_hcal(READOUT_THRESHOLD_PE);
    self.toa_threshold     = baseline + self.calculate_voltage_hcal(TOA_THRESHOLD_PE);
    self.tot_threshold     = baseline + self.calculate_voltage_hcal(TOT_THRESHOLD_PE);
    debug!("Set HCal thresholds for gain {} : readout {} mV, toa {} mV, tot {} mV",
           self.gain, self.readout_threshold, self.toa_threshold, self.tot_threshold);
  }

  /// Change the gain, the thresholds get 
  /// derived again
  pub fn set_gain(&mut self, gain : f64) {
    self.set_threshold_defaults_hcal(gain);
  }
}

impl Default for HgcrocSettings {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for HgcrocSettings {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut repr = String::from("<HgcrocSettings:");
    repr += &(format!("\n  pedestal     : {:.2} ADC", self.pedestal));
    repr += &(format!("\n  gain         : {:.3} mV/ADC", self.gain));
    repr += &(format!("\n  clock cycle  : {:.1} ns", self.clock_cycle));
    repr += &(format!("\n  nADCs / SOI  : {} / {}", self.n_adcs, self.i_soi));
    repr += &(format!("\n  capacitance  : {:.1} pF", self.readout_pad_capacitance));
    repr += &(format!("\n  thresholds   : readout {:.2}, toa {:.2}, tot {:.2} mV",
                      self.readout_threshold,
                      self.toa_threshold,
                      self.tot_threshold));
    repr += &(format!("\n  pulse shape  : {} {} {} {} {}>",
                      self.rate_up_slope,
                      self.time_up_slope,
                      self.rate_dn_slope,
                      self.time_dn_slope,
                      self.time_peak));
    write!(f, "{}", repr)
  }
}

#[test]
fn voltage_is_five_mv_per_pe() {
  let hgcroc = HgcrocSettings::new();
  assert_eq!(hgcroc.calculate_voltage_hcal(1.0), 5.0);
  assert_eq!(hgcroc.calculate_voltage_hcal(68.0), 340.0);
}

#[test]
fn hcal_chip_parameters() {
  let hgcroc = HgcrocSettings::hcal(0.5);
  assert_eq!(hgcroc.gain, 0.5);
  assert_eq!(hgcroc.readout_pad_capacitance, 20.0);
  assert_eq!(hgcroc.readout_threshold, 0.5*50.0 + 5.0);
  assert_eq!(hgcroc.toa_threshold, 0.5*50.0 + 25.0);
  assert_eq!(hgcroc.tot_threshold, 0.5*50.0 + 50000.0);
  assert_eq!(hgcroc.rate_up_slope, -0.1141);
  assert_eq!(hgcroc.time_peak, 9.747);
}

#[test]
fn thresholds_follow_gain() {
  let mut hgcroc = HgcrocSettings::hcal(0.5);
  hgcroc.set_gain(2.0);
  assert_eq!(hgcroc.gain, 2.0);
  assert_eq!(hgcroc.readout_threshold, 2.0*50.0 + 5.0);
}
