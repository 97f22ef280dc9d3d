//! Digitized HGCROC data and simulated hits
//!
//! An HgcrocDigi is the list of samples the chip
//! took for one channel (one end of a bar). Each 
//! sample either measures an amplitude (ADC mode)
//! or a time over threshold (TOT mode).
//!

use std::fmt;

use crate::errors::DigiError;
use crate::ids::HcalDigiID;

cfg_if::cfg_if! {
  if #[cfg(feature = "random")]  {
    use crate::FromRandom;
    extern crate rand;
    use rand::Rng;
  }
}

/// A single sample of the chip
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct HgcrocSample {
  /// ADC of the previous sample
  pub adc_tm1      : u16,
  /// ADC of this sample (10 bits)
  pub adc_t        : u16,
  /// Time over threshold (12 bits)
  pub tot          : u16,
  /// Time of arrival within the clock cycle (10 bits)
  pub toa          : u16,
  /// The chip is currently measuring TOT
  pub tot_progress : bool,
  /// The TOT measurement finished
  pub tot_complete : bool,
}

impl HgcrocSample {
  pub fn new() -> Self {
    Self::default()
  }
  
  /// A sample taken in ADC mode
  pub fn adc(adc_tm1 : u16, adc_t : u16, toa : u16) -> Self {
    Self {
      adc_tm1,
      adc_t,
      toa,
      ..Self::default()
    }
  }
}

impl fmt::Display for HgcrocSample {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HgcrocSample: adc_tm1 {} adc_t {} tot {} toa {} (tot progress {}, complete {})>",
           self.adc_tm1, self.adc_t, self.tot, self.toa, self.tot_progress, self.tot_complete)
  }
}

#[cfg(feature = "random")]
impl FromRandom for HgcrocSample {
  fn from_random() -> Self {
    let mut rng = rand::thread_rng();
    Self {
      adc_tm1      : rng.gen_range(0..1024),
      adc_t        : rng.gen_range(0..1024),
      tot          : 0,
      toa          : rng.gen_range(0..1024),
      tot_progress : false,
      tot_complete : false,
    }
  }
}

/*************************************/

/// All samples of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct HgcrocDigi {
  pub id      : u32,
  pub i_soi   : usize,
  pub samples : Vec<HgcrocSample>,
}

impl HgcrocDigi {
  pub fn new(id : u32, i_soi : usize, samples : Vec<HgcrocSample>) -> Self {
    Self {
      id,
      i_soi,
      samples
    }
  }

  pub fn digi_id(&self) -> HcalDigiID {
    HcalDigiID::from(self.id)
  }

  /// The sample of interest
  pub fn soi(&self) -> Result<&HgcrocSample, DigiError> {
    match self.samples.get(self.i_soi) {
      Some(sample) => Ok(sample),
      None => {
        error!("Sample of interest {} requested, but digi 0x{:08x} has only {} samples!", self.i_soi, self.id, self.samples.len());
        Err(DigiError::SampleOfInterestOutOfRange)
      }
    }
  }
  
  /// The first sample, its TOA is used for 
  /// the hit time
  pub fn first(&self) -> Result<&HgcrocSample, DigiError> {
    match self.samples.first() {
      Some(sample) => Ok(sample),
      None => {
        error!("Digi 0x{:08x} does not have any samples!", self.id);
        Err(DigiError::EmptyDigi)
      }
    }
  }

  /// The chip measured the sample of interest
  /// in ADC mode
  pub fn is_adc(&self) -> Result<bool, DigiError> {
    Ok(!self.soi()?.tot_complete)
  }

  /// The time over threshold (only meaningful 
  /// in TOT mode)
  pub fn tot(&self) -> Result<u16, DigiError> {
    Ok(self.soi()?.tot)
  }
}

impl fmt::Display for HgcrocDigi {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut repr = format!("<HgcrocDigi: {} ({} samples, soi {})", self.digi_id(), self.samples.len(), self.i_soi);
    for sample in &self.samples {
      repr += &(format!("\n  {}", sample));
    }
    write!(f, "{}>", repr)
  }
}

/*************************************/

/// The digis of one event, all with the 
/// same number of samples
#[derive(Debug, Clone, PartialEq)]
pub struct HgcrocDigiCollection {
  pub n_samples_per_digi : usize,
  pub i_soi              : usize,
  digis                  : Vec<HgcrocDigi>,
}

impl HgcrocDigiCollection {
  pub fn new(n_samples_per_digi : usize, i_soi : usize) -> Self {
    Self {
      n_samples_per_digi,
      i_soi,
      digis : Vec::new(),
    }
  }

  pub fn add_digi(&mut self, id : u32, samples : Vec<HgcrocSample>) -> Result<(), DigiError> {
    if samples.len() != self.n_samples_per_digi {
      error!("Digi 0x{id:08x} has {} samples, the collection expects {}!", samples.len(), self.n_samples_per_digi);
      return Err(DigiError::WrongNumberOfSamples);
    }
    self.digis.push(HgcrocDigi::new(id, self.i_soi, samples));
    Ok(())
  }

  pub fn num_digis(&self) -> usize {
    self.digis.len()
  }

  pub fn get_digi(&self, k : usize) -> Option<&HgcrocDigi> {
    self.digis.get(k)
  }

  pub fn digis(&self) -> &[HgcrocDigi] {
    &self.digis
  }
  
  pub fn is_empty(&self) -> bool {
    self.digis.is_empty()
  }
}

impl fmt::Display for HgcrocDigiCollection {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HgcrocDigiCollection: {} digis, {} samples per digi, soi {}>",
           self.digis.len(), self.n_samples_per_digi, self.i_soi)
  }
}

/*************************************/

/// Energy deposition in one bar as it comes 
/// out of the simulation
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SimCalorimeterHit {
  pub id       : u32,
  /// [MeV]
  pub edep     : f64,
  /// [ns]
  pub time     : f64,
  /// [mm]
  pub position : [f64;3],
}

impl fmt::Display for SimCalorimeterHit {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<SimCalorimeterHit: 0x{:08x} edep {:.3} MeV time {:.2} ns at {:?}>",
           self.id, self.edep, self.time, self.position)
  }
}

#[test]
fn collection_checks_sample_count() {
  let mut digis = HgcrocDigiCollection::new(10, 0);
  assert!(digis.add_digi(1, vec![HgcrocSample::new();10]).is_ok());
  assert_eq!(digis.add_digi(2, vec![HgcrocSample::new();3]), Err(DigiError::WrongNumberOfSamples));
  assert_eq!(digis.num_digis(), 1);
}

#[test]
fn adc_and_tot_mode() {
  let mut tot = HgcrocSample::new();
  tot.tot_complete = true;
  tot.tot          = 300;
  let digi = HgcrocDigi::new(1, 1, vec![HgcrocSample::adc(50, 60, 10), tot]);
  assert_eq!(digi.is_adc(), Ok(false));
  assert_eq!(digi.tot(), Ok(300));
  let empty = HgcrocDigi::new(1, 0, Vec::new());
  assert_eq!(empty.soi().err(), Some(DigiError::SampleOfInterestOutOfRange));
  assert_eq!(empty.first().err(), Some(DigiError::EmptyDigi));
}
