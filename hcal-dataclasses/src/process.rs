//! The process - a description of the full pipeline
//!
//! The process lists the stages which are run in 
//! sequence (simulation, digitization, reconstruction),
//! the conditions providers declared for this job and
//! where the output goes. It is written to a toml file
//! which is then handed to the run loop.
//!

use std::fs::File;
use std::io::{
  Read,
  Write,
};
use std::fmt;

use crate::conditions::{
  ConditionsProviderDeclaration,
  declared_conditions_providers,
  hcal_recon_conditions_hardcode,
};
use crate::errors::SettingsError;
use crate::geometry::HcalGeometryProvider;
use crate::producers::{
  HcalDigiProducer,
  HcalRecProducer,
  HcalClusterProducer,
};

/// Shoots single particles 
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ParticleGun {
  pub name       : String,
  pub class_name : String,
  pub particle   : String,
  /// [mm]
  pub position   : [f64;3],
  pub direction  : [f64;3],
  /// [GeV]
  pub energy     : f64,
}

impl ParticleGun {
  pub fn new(name : &str) -> Self {
    Self {
      name       : String::from(name),
      class_name : String::from("simcore::generators::ParticleGun"),
      particle   : String::from("e-"),
      position   : [0.0, 0.0, 0.0],
      direction  : [0.0, 0.0, 1.0],
      energy     : 4.0,
    }
  }
}

/// Configuration of the simulation stage
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Simulator {
  pub instance_name          : String,
  pub class_name             : String,
  pub module_name            : String,
  pub detector               : String,
  pub include_scoring_planes : bool,
  pub description            : String,
  /// Smearing of the beam spot (x,y,z) [mm]
  pub beam_spot_smear        : [f64;3],
  pub generators             : Vec<ParticleGun>,
}

impl Simulator {
  pub fn new(instance_name : &str) -> Self {
    Self {
      instance_name          : String::from(instance_name),
      class_name             : String::from("simcore::Simulator"),
      module_name            : String::from("SimCore"),
      detector               : String::from(""),
      include_scoring_planes : false,
      description            : String::from(""),
      beam_spot_smear        : [0.0, 0.0, 0.0],
      generators             : Vec::new(),
    }
  }

  pub fn set_detector(&mut self, detector : &str, include_scoring_planes : bool) {
    self.detector               = String::from(detector);
    self.include_scoring_planes = include_scoring_planes;
  }
}

/// A single step of the pipeline
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type")]
pub enum Stage {
  Simulation(Simulator),
  HcalDigi(HcalDigiProducer),
  HcalRec(HcalRecProducer),
  HcalCluster(HcalClusterProducer),
}

impl Stage {
  pub fn instance_name(&self) -> &str {
    match self {
      Stage::Simulation(sim)  => &sim.instance_name,
      Stage::HcalDigi(digi)   => &digi.instance_name,
      Stage::HcalRec(rec)     => &rec.instance_name,
      Stage::HcalCluster(cl)  => &cl.instance_name,
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Stage::Simulation(sim)  => write!(f, "<Stage: Simulation {} on {}>", sim.instance_name, sim.detector),
      Stage::HcalDigi(digi)   => write!(f, "<Stage: HcalDigi {} gain {}>", digi.instance_name, digi.hgcroc.gain),
      Stage::HcalRec(rec)     => write!(f, "<Stage: HcalRec {} {}>", rec.instance_name, rec.preset),
      Stage::HcalCluster(cl)  => write!(f, "<Stage: HcalCluster {}>", cl.instance_name),
    }
  }
}

/// The full pipeline
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Process {
  pub pass_name            : String,
  pub run                  : i32,
  /// Maximum number of events to process
  pub max_events           : u64,
  /// Print a status every log_frequency events
  pub log_frequency        : i64,
  pub output_files         : Vec<String>,
  pub sequence             : Vec<Stage>,
  pub conditions_providers : Vec<ConditionsProviderDeclaration>,
}

impl Process {
  pub fn new(pass_name : &str) -> Self {
    Self {
      pass_name            : String::from(pass_name),
      run                  : 0,
      max_events           : 1,
      log_frequency        : -1,
      output_files         : Vec::new(),
      sequence             : Vec::new(),
      conditions_providers : Vec::new(),
    }
  }

  /// The HCal digi pipeline, tested on a basic 
  /// neutron gun upstream of the target.
  ///
  /// # Arguments
  ///
  /// * gain   : gain of the HGCROC 
  /// * energy : energy of the neutrons [GeV]
  pub fn hcal_digi_pipeline(gain : f64, energy : f64) -> Self {
    let mut process = Process::new("v12");
    process.run     = 1;

    // the geometry and the hard-coded conditions
    // declare their providers on first access
    HcalGeometryProvider::get_instance();
    hcal_recon_conditions_hardcode();

    let mut sim     = Simulator::new("mySim");
    sim.set_detector("ldmx-det-v12", true);
    sim.description = String::from("HCal Digi Pipeline Tested on Basic 4GeV Gun");
    let mut particle_gun = ParticleGun::new("single_4gev_n_upstream_target");
    particle_gun.particle  = String::from("neutron");
    particle_gun.position  = [0.0, 0.0, -1.2];
    particle_gun.direction = [0.0, 0.0, 1.0];
    particle_gun.energy    = energy;
    sim.generators         = vec![particle_gun];
    sim.beam_spot_smear    = [80.0, 80.0, 0.0];

    let mut hcal_digi = HcalDigiProducer::new(gain, "myHcalDigis");
    hcal_digi.hgcroc.gain = gain;
    let hcal_rec = HcalRecProducer::new("myHcalRecHits");
    
    process.sequence     = vec![Stage::Simulation(sim),
                                Stage::HcalDigi(hcal_digi),
                                Stage::HcalRec(hcal_rec)];
    process.output_files = vec![String::from("tmp/hcal_digi_pipeline.root")];
    process.max_events   = 1;
    process.collect_conditions_providers();
    process
  }

  /// Pick up all conditions providers declared so far
  pub fn collect_conditions_providers(&mut self) {
    self.conditions_providers = declared_conditions_providers();
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.sequence.iter().map(|s| s.instance_name()).collect()
  }

  /// Check that the process can be run
  pub fn validate(&self) -> Result<(), SettingsError> {
    if self.sequence.is_empty() {
      error!("Process {} has no stages!", self.pass_name);
      return Err(SettingsError::EmptySequence);
    }
    if self.max_events == 0 {
      error!("Process {} would not process any events!", self.pass_name);
      return Err(SettingsError::InvalidMaxEvents);
    }
    for stage in &self.sequence {
      if let Stage::HcalRec(rec) = stage {
        rec.validate()?;
      }
    }
    Ok(())
  }

  /// Write the process to a toml file
  pub fn to_toml(&self, filename : &str) -> Result<(), SettingsError> {
    let mut filename = String::from(filename);
    if !filename.ends_with(".toml") {
      filename += ".toml";
    }
    info!("Will write to file {}!", filename);
    let toml_string = match toml::to_string_pretty(&self) {
      Err(err) => {
        error!("Unable to serialize toml! {err}");
        return Err(SettingsError::TomlEncodingError);
      }
      Ok(toml_string) => toml_string
    };
    let mut file = File::create(&filename)?;
    file.write_all(toml_string.as_bytes())?;
    debug!("Wrote process {} to {}!", self.pass_name, filename);
    Ok(())
  }

  /// Write the process to a json file
  pub fn to_json(&self, filename : &str) -> Result<(), SettingsError> {
    let mut filename = String::from(filename);
    if !filename.ends_with(".json") {
      filename += ".json";
    }
    info!("Will write to file {}!", filename);
    let json_string = match serde_json::to_string_pretty(&self) {
      Err(err) => {
        error!("Unable to serialize json! {err}");
        return Err(SettingsError::JsonEncodingError);
      }
      Ok(json_string) => json_string
    };
    let mut file = File::create(&filename)?;
    file.write_all(json_string.as_bytes())?;
    debug!("Wrote process {} to {}!", self.pass_name, filename);
    Ok(())
  }

  /// Read a process from a toml file
  pub fn from_toml(filename : &str) -> Result<Process, SettingsError> {
    let mut file = File::open(filename)?;
    let mut toml_string = String::from("");
    file.read_to_string(&mut toml_string)?;
    match toml::from_str(&toml_string) {
      Err(err) => {
        error!("Can't interpret toml! {}", err);
        Err(SettingsError::TomlDecodingError)
      }
      Ok(process) => Ok(process)
    }
  }
}

impl fmt::Display for Process {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut repr = format!("<Process {} (run {}):", self.pass_name, self.run);
    repr += &(format!("\n  max events    : {}", self.max_events));
    repr += &(format!("\n  output files  : {:?}", self.output_files));
    repr += "\n  sequence      :";
    for stage in &self.sequence {
      repr += &(format!("\n    {}", stage));
    }
    repr += "\n  conditions    :";
    for provider in &self.conditions_providers {
      repr += &(format!("\n    {}", provider));
    }
    write!(f, "{}>", repr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::{
    HCAL_GEOMETRY_PROVIDER,
    HCAL_RECON_CONDITIONS,
  };

  #[test]
  fn v12_pipeline() {
    let process = Process::hcal_digi_pipeline(0.5, 4.0);
    assert_eq!(process.pass_name, "v12");
    assert_eq!(process.run, 1);
    assert_eq!(process.max_events, 1);
    assert_eq!(process.stage_names(), vec!["mySim", "myHcalDigis", "myHcalRecHits"]);
    assert_eq!(process.output_files, vec![String::from("tmp/hcal_digi_pipeline.root")]);
    match &process.sequence[0] {
      Stage::Simulation(sim) => {
        assert_eq!(sim.detector, "ldmx-det-v12");
        assert_eq!(sim.generators[0].particle, "neutron");
        assert_eq!(sim.generators[0].position, [0.0, 0.0, -1.2]);
        assert_eq!(sim.beam_spot_smear, [80.0, 80.0, 0.0]);
      }
      _ => panic!("First stage has to be the simulation!")
    }
    let names : Vec<&str> = process.conditions_providers.iter().map(|p| p.object_name.as_str()).collect();
    assert!(names.contains(&HCAL_GEOMETRY_PROVIDER));
    assert!(names.contains(&HCAL_RECON_CONDITIONS));
    assert!(process.validate().is_ok());
  }

  #[test]
  fn invalid_processes() {
    let mut process = Process::new("empty");
    assert_eq!(process.validate(), Err(SettingsError::EmptySequence));
    process.sequence.push(Stage::HcalCluster(HcalClusterProducer::default()));
    process.max_events = 0;
    assert_eq!(process.validate(), Err(SettingsError::InvalidMaxEvents));
    process.max_events = 10;
    let mut rec = HcalRecProducer::default();
    rec.layer_weights = vec![1.0;3];
    process.sequence.push(Stage::HcalRec(rec));
    assert_eq!(process.validate(), Err(SettingsError::InvalidLayerWeights));
  }

  #[test]
  fn toml_round_trip() {
    let process  = Process::hcal_digi_pipeline(0.5, 4.0);
    let filename = std::env::temp_dir().join("hcal-digi-pipeline-unit-test.toml");
    let filename = filename.to_string_lossy().to_string();
    process.to_toml(&filename).unwrap();
    let read_back = Process::from_toml(&filename).unwrap();
    assert_eq!(read_back.sequence, process.sequence);
    assert_eq!(read_back.output_files, process.output_files);
    assert_eq!(read_back.conditions_providers.len(), process.conditions_providers.len());
  }

  #[test]
  fn missing_file() {
    assert_eq!(Process::from_toml("/this/file/does/not/exist.toml"), Err(SettingsError::IOError));
  }
}
