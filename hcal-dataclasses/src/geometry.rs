//! HCal geometry - presets, readout and the 
//! geometry provider
//!
//! There is exactly one HcalGeometryProvider per
//! process. It is created on first access and 
//! declares itself in the conditions registry.
//! The provider selects the HcalReadout which 
//! matches the detector of the run.
//!

use std::fmt;
use std::str::FromStr;
use std::sync::{
  Arc,
  Mutex,
  MutexGuard,
  OnceLock,
};

use regex::RegexBuilder;

use crate::constants::{
  N_HCAL_LAYERS_V12,
  SECOND_ORDER_ENERGY_CORRECTION_V12,
  HCAL_GEOMETRY_PROVIDER,
};
use crate::conditions::{
  ConditionsIov,
  ConditionsProviderDeclaration,
  ProviderParameters,
  declare_conditions_provider,
};
use crate::errors::GeometryError;
use crate::ids::{
  HcalID,
  BACK,
};

/// Geometry dependent settings for the 
/// reconstruction
#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum GeometryPreset {
  V12,
}

impl GeometryPreset {
  pub fn n_layers(&self) -> usize {
    match self {
      GeometryPreset::V12 => N_HCAL_LAYERS_V12,
    }
  }

  /// Weighting factors depending on the layer index
  pub fn layer_weights(&self) -> Vec<f64> {
    match self {
      GeometryPreset::V12 => vec![1.0;N_HCAL_LAYERS_V12],
    }
  }

  /// Correction to the weighted energy
  pub fn second_order_energy_correction(&self) -> f64 {
    match self {
      GeometryPreset::V12 => SECOND_ORDER_ENERGY_CORRECTION_V12,
    }
  }
}

impl FromStr for GeometryPreset {
  type Err = GeometryError;

  fn from_str(s : &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "v12" => Ok(GeometryPreset::V12),
      _     => {
        error!("There is no geometry preset '{s}'!");
        Err(GeometryError::UnknownPreset)
      }
    }
  }
}

impl fmt::Display for GeometryPreset {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this GeometryPreset"));
    write!(f, "<GeometryPreset: {}>", r)
  }
}

/*************************************/

/// Anything which can place a strip in space
pub trait StripGeometry {
  /// Center of the strip (x,y,z) [mm]
  fn strip_absolute_position(&self, id : HcalID) -> Result<(f64, f64, f64), GeometryError>;
}

/// Layout of the back HCal for one detector version
///
/// The bars of odd layers run along x (and measure y),
/// the bars of even layers run along y.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HcalReadout {
  pub version         : String,
  /// Position of the front face of the back HCal [mm]
  pub z_front         : f64,
  /// Absorber, scintillator and air gaps [mm]
  pub layer_thickness : f64,
  pub strip_width     : f64,
  pub n_layers        : usize,
  pub n_strips        : usize,
  /// Detector names (regular expressions) this 
  /// readout is valid for
  pub detectors_valid : Vec<String>,
}

impl HcalReadout {
  
  pub fn v12() -> Self {
    Self {
      version         : String::from("v12"),
      z_front         : 870.0,
      // 25 mm absorber, 20 mm scintillator, 2 x 2 mm air
      layer_thickness : 49.0,
      strip_width     : 50.0,
      n_layers        : N_HCAL_LAYERS_V12,
      n_strips        : 60,
      detectors_valid : vec![String::from("ldmx-det-v12[.].*"),
                             String::from("ldmx-det-v12")],
    }
  }

  /// Total width of a layer [mm]
  pub fn layer_width(&self) -> f64 {
    self.n_strips as f64*self.strip_width
  }

  /// Check if this readout is valid for the detector. 
  /// The patterns are anchored at both ends and match 
  /// case insensitive. 
  pub fn matches_detector(&self, detector_name : &str) -> Result<bool, GeometryError> {
    for pattern in &self.detectors_valid {
      if pattern.is_empty() {
        continue;
      }
      let mut anchored = pattern.clone();
      if !anchored.starts_with('^') {
        anchored.insert(0, '^');
      }
      if !anchored.ends_with('$') {
        anchored.push('$');
      }
      match RegexBuilder::new(&anchored).case_insensitive(true).build() {
        Err(err) => {
          error!("Invalid detector regular expression : '{anchored}' {err}");
          return Err(GeometryError::InvalidDetectorRegex);
        }
        Ok(re) => {
          if re.is_match(detector_name) {
            return Ok(true);
          }
        }
      }
    }
    Ok(false)
  }
}

impl StripGeometry for HcalReadout {
  fn strip_absolute_position(&self, id : HcalID) -> Result<(f64, f64, f64), GeometryError> {
    if id.section() != BACK {
      error!("Only the back HCal is described by HcalReadout {}, got {}", self.version, id);
      return Err(GeometryError::StripOutOfRange);
    }
    let layer = id.layer() as usize;
    let strip = id.strip() as usize;
    if layer >= self.n_layers || strip >= self.n_strips {
      error!("{} is outside of HcalReadout {} ({} layers, {} strips)", id, self.version, self.n_layers, self.n_strips);
      return Err(GeometryError::StripOutOfRange);
    }
    let z      = self.z_front + (layer as f64 + 0.5)*self.layer_thickness;
    let across = -self.layer_width()/2.0 + (strip as f64 + 0.5)*self.strip_width;
    if layer % 2 == 1 {
      Ok((0.0, across, z))
    } else {
      Ok((across, 0.0, z))
    }
  }
}

impl fmt::Display for HcalReadout {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalReadout {}: {} layers x {} strips, valid for {:?}>",
           self.version, self.n_layers, self.n_strips, self.detectors_valid)
  }
}

/*************************************/

#[derive(Debug, Default)]
struct GeometryState {
  detector_geometry : Option<String>,
  readout           : Option<Arc<HcalReadout>>,
}

/// Provides the HcalReadout for the detector of 
/// the current run.
///
/// This is a singleton, use get_instance.
#[derive(Debug)]
pub struct HcalGeometryProvider {
  pub object_name : String,
  pub class_name  : String,
  pub module_name : String,
  pub tag_name    : String,
  readouts        : Vec<HcalReadout>,
  state           : Mutex<GeometryState>,
}

static HCAL_GEOMETRY_PROVIDER_INSTANCE : OnceLock<HcalGeometryProvider> = OnceLock::new();

impl HcalGeometryProvider {
  
  fn build() -> Self {
    Self {
      object_name : String::from(HCAL_GEOMETRY_PROVIDER),
      class_name  : String::from("ldmx::HcalGeometryProvider"),
      module_name : String::from("Hcal"),
      tag_name    : String::from("HcalGeometryProvider"),
      readouts    : vec![HcalReadout::v12()],
      state       : Mutex::new(GeometryState::default()),
    }
  }

  fn declare(&self) {
    if let Err(err) = declare_conditions_provider(self.declaration()) {
      error!("Unable to declare {}! {err}", self.object_name);
    }
  }

  /// Get the single instance of the provider, it
  /// is created and declared on first access.
  pub fn get_instance() -> &'static HcalGeometryProvider {
    HCAL_GEOMETRY_PROVIDER_INSTANCE.get_or_init(|| {
      let provider = HcalGeometryProvider::build();
      provider.declare();
      provider
    })
  }

  /// Explicitly create the provider. 
  ///
  /// Fails if an instance exists already.
  pub fn create() -> Result<&'static HcalGeometryProvider, GeometryError> {
    let mut created = false;
    let instance = HCAL_GEOMETRY_PROVIDER_INSTANCE.get_or_init(|| {
      created = true;
      let provider = HcalGeometryProvider::build();
      provider.declare();
      provider
    });
    if !created {
      error!("HcalGeometryProvider is a singleton and should only be retrieved using get_instance!");
      return Err(GeometryError::AlreadyInitialized);
    }
    Ok(instance)
  }

  pub fn readouts(&self) -> &[HcalReadout] {
    &self.readouts
  }

  pub fn declaration(&self) -> ConditionsProviderDeclaration {
    ConditionsProviderDeclaration {
      object_name : self.object_name.clone(),
      class_name  : self.class_name.clone(),
      module_name : self.module_name.clone(),
      tag_name    : self.tag_name.clone(),
      parameters  : ProviderParameters::HcalGeometry {
        readouts : self.readouts.clone()
      },
    }
  }

  fn lock(&self) -> MutexGuard<'_, GeometryState> {
    match self.state.lock() {
      Ok(guard) => guard,
      Err(poisoned) => {
        warn!("Geometry provider lock was poisoned, continuing anyway!");
        poisoned.into_inner()
      }
    }
  }

  /// The detector this job runs on. 
  ///
  /// A single job can not switch geometries once
  /// a readout has been selected.
  pub fn on_new_run(&self, detector_name : &str) -> Result<(), GeometryError> {
    let mut state = self.lock();
    match state.detector_geometry.clone() {
      None => {
        if !detector_name.is_empty() {
          state.detector_geometry = Some(String::from(detector_name));
        }
      }
      Some(current) => {
        if state.readout.is_some() && current.as_str() != detector_name {
          error!("Attempting to run a single job with multiple geometries {} and '{}'", current, detector_name);
          return Err(GeometryError::MultipleGeometries);
        }
      }
    }
    if state.detector_geometry.is_none() {
      error!("HcalGeometryProvider unable to get the name of the detector from the run!");
      return Err(GeometryError::NoDetectorName);
    }
    Ok(())
  }

  /// The readout for the detector of the current 
  /// run. The selection is cached for the rest
  /// of the job.
  pub fn get_condition(&self, run : i32) -> Result<(Arc<HcalReadout>, ConditionsIov), GeometryError> {
    let mut state = self.lock();
    if state.readout.is_none() {
      let detector = match &state.detector_geometry {
        Some(name) => name.clone(),
        None => {
          error!("No detector known, call on_new_run first!");
          return Err(GeometryError::NoDetectorName);
        }
      };
      for readout in &self.readouts {
        if readout.detectors_valid.is_empty() {
          warn!("No detectors_valid found in HcalReadout {}", readout.version);
          continue;
        }
        if readout.matches_detector(&detector)? {
          info!("Selected {} for detector {}", readout, detector);
          state.readout = Some(Arc::new(readout.clone()));
          break;
        }
      }
    }
    match &state.readout {
      Some(readout) => Ok((Arc::clone(readout), ConditionsIov::new(run, run, true, true))),
      None => {
        error!("Unable to create HcalReadout for {:?}", state.detector_geometry);
        Err(GeometryError::NoMatchingReadout)
      }
    }
  }
}

impl fmt::Display for HcalGeometryProvider {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalGeometryProvider: {} readouts, tag {}>", self.readouts.len(), self.tag_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::conditions::declared_conditions_providers;

  #[test]
  fn singleton_is_unique() {
    let first  = HcalGeometryProvider::get_instance();
    let second = HcalGeometryProvider::get_instance();
    assert!(std::ptr::eq(first, second));
    assert_eq!(HcalGeometryProvider::create().err(), Some(GeometryError::AlreadyInitialized));
    assert!(std::ptr::eq(first, HcalGeometryProvider::get_instance()));
    let n = declared_conditions_providers().iter()
      .filter(|p| p.object_name == HCAL_GEOMETRY_PROVIDER).count();
    assert_eq!(n, 1);
  }

  #[test]
  fn v12_preset() {
    let weights = GeometryPreset::V12.layer_weights();
    assert_eq!(weights.len(), 101);
    assert!(weights.iter().all(|w| *w == 1.0));
    assert_eq!(GeometryPreset::V12.second_order_energy_correction(), 4000.0/4010.0);
    assert_eq!("v12".parse::<GeometryPreset>(), Ok(GeometryPreset::V12));
    assert!("v9".parse::<GeometryPreset>().is_err());
  }

  #[test]
  fn select_readout_for_detector() {
    let provider = HcalGeometryProvider::build();
    assert_eq!(provider.get_condition(1).err(), Some(GeometryError::NoDetectorName));
    provider.on_new_run("LDMX-DET-V12").unwrap();
    let (readout, iov) = provider.get_condition(1).unwrap();
    assert_eq!(readout.version, "v12");
    assert_eq!(iov.first_run, 1);
    // same detector again is fine
    assert!(provider.on_new_run("LDMX-DET-V12").is_ok());
    assert_eq!(provider.on_new_run("ldmx-det-v14"), Err(GeometryError::MultipleGeometries));
  }

  #[test]
  fn no_readout_for_unknown_detector() {
    let provider = HcalGeometryProvider::build();
    assert_eq!(provider.on_new_run(""), Err(GeometryError::NoDetectorName));
    provider.on_new_run("ldmx-det-v9").unwrap();
    assert_eq!(provider.get_condition(1).err(), Some(GeometryError::NoMatchingReadout));
  }

  #[test]
  fn invalid_regex() {
    let mut readout = HcalReadout::v12();
    readout.detectors_valid = vec![String::from("ldmx-(det")];
    assert_eq!(readout.matches_detector("ldmx-det-v12"), Err(GeometryError::InvalidDetectorRegex));
  }

  #[test]
  fn strip_positions() {
    let readout = HcalReadout::v12();
    let (x, y, z) = readout.strip_absolute_position(HcalID::new(BACK, 0, 0)).unwrap();
    assert_eq!((x, y, z), (-1475.0, 0.0, 870.0 + 24.5));
    let (x, y, _) = readout.strip_absolute_position(HcalID::new(BACK, 1, 59)).unwrap();
    assert_eq!((x, y), (0.0, 1475.0));
    assert!(readout.strip_absolute_position(HcalID::new(BACK, 101, 0)).is_err());
    assert!(readout.strip_absolute_position(HcalID::new(1, 0, 0)).is_err());
  }
}
