//! Reconstruction of HCal hits from digis
//!
//! Each bar is read out at both ends, so the digis
//! come in pairs (close end, far end). For each pair
//! the amplitudes are converted with the recon 
//! conditions, summed and translated into an energy
//! in units of MIP.
//!

use std::fmt;
use std::collections::HashSet;

use crate::conditions::HcalReconConditions;
use crate::digis::{
  HgcrocDigi,
  HgcrocDigiCollection,
  SimCalorimeterHit,
};
use crate::constants::TOA_COUNTS_PER_CLOCK;
use crate::errors::ReconstructionError;
use crate::geometry::StripGeometry;
use crate::ids::{
  HcalID,
  HcalDigiID,
};
use crate::producers::HcalRecProducer;

/// A reconstructed hit in a single bar
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct HcalHit {
  /// raw HcalID of the bar
  pub id        : u32,
  /// position of the bar [mm]
  pub x         : f64,
  pub y         : f64,
  pub z         : f64,
  /// energy deposited in the bar [MeV]
  pub amplitude : f64,
  /// weighted and corrected energy [MeV]
  pub energy    : f64,
  /// [ns]
  pub time      : f64,
  /// no simulated hit in this bar
  pub is_noise  : bool,
}

impl HcalHit {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hcal_id(&self) -> HcalID {
    HcalID::from(self.id)
  }

  pub fn position(&self) -> [f64;3] {
    [self.x, self.y, self.z]
  }
}

impl fmt::Display for HcalHit {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalHit:
  id        : {}
  position  : ({:.1}, {:.1}, {:.1}) mm
  amplitude : {:.4} MeV
  energy    : {:.4} MeV
  time      : {:.3} ns
  noise     : {}>",
            self.hcal_id(),
            self.x, self.y, self.z,
            self.amplitude,
            self.energy,
            self.time,
            self.is_noise)
  }
}

impl HcalRecProducer {

  /// Largest pedestal subtracted and gain corrected
  /// amplitude of all samples of the digi, at least 0
  fn max_amplitude(digi       : &HgcrocDigi,
                   conditions : &HcalReconConditions) -> Result<f64, ReconstructionError> {
    let pedestal = conditions.adc_pedestal(digi.id)?;
    let gain     = conditions.adc_gain(digi.id)?;
    let mut max_meas = 0.0f64;
    for sample in &digi.samples {
      let amplitude = (sample.adc_t as f64 - pedestal)*gain;
      if amplitude > max_meas {
        max_meas = amplitude;
      }
    }
    Ok(max_meas)
  }
  
  /// Time of arrival [ns] with respect to the clock 
  /// window, taken from the first sample
  fn time_of_arrival(&self, digi : &HgcrocDigi) -> Result<f64, ReconstructionError> {
    Ok(digi.first()?.toa as f64*(self.clock_cycle/TOA_COUNTS_PER_CLOCK))
  }

  /// Reconstruct the hits of one event
  ///
  /// # Arguments
  ///
  /// * digis      : digis, the two ends of each bar
  ///                following each other
  /// * conditions : pedestals and gains
  /// * geometry   : places the bars in space
  /// * sim_hits   : if given, hits in bars without a 
  ///                simulated hit are flagged as noise
  pub fn produce<G>(&self,
                    digis      : &HgcrocDigiCollection,
                    conditions : &HcalReconConditions,
                    geometry   : &G,
                    sim_hits   : Option<&[SimCalorimeterHit]>)
    -> Result<Vec<HcalHit>, ReconstructionError> 
    where G : StripGeometry + ?Sized {
    let mut rec_hits = Vec::<HcalHit>::with_capacity(digis.num_digis()/2);
    if digis.num_digis() % 2 != 0 {
      warn!("Odd number of digis ({}), the last one has no partner and will be ignored!", digis.num_digis());
    }
    for pair in digis.digis().chunks_exact(2) {
      let digi_close = &pair[0];
      let digi_far   = &pair[1];
      let id_close   = HcalDigiID::from(digi_close.id);
      let id_far     = HcalDigiID::from(digi_far.id);
      if !id_close.same_bar(&id_far) {
        warn!("Digis {} and {} are not the two ends of the same bar, skipping!", id_close, id_far);
        continue;
      }
      let id = HcalID::from(id_close);
      
      let time_close = self.time_of_arrival(digi_close)?;
      let time_far   = self.time_of_arrival(digi_far)?;
      let hit_time   = f64::abs(time_close - time_far)/2.0;
      
      let (x, y, z)  = geometry.strip_absolute_position(id)?;

      // just use the maximum measured amplitude for now
      let voltage    = Self::max_amplitude(digi_close, conditions)?
                     + Self::max_amplitude(digi_far, conditions)?;
      let num_mips_equivalent    = voltage/self.voltage_per_mip;
      let energy_deposited_in_si = num_mips_equivalent*self.mip_si_energy;
      
      // layer weights and the second order correction are not applied yet
      let reconstructed_energy = energy_deposited_in_si;
      trace!("{} : {} mV -> {} MIPs -> {} MeV", id, voltage, num_mips_equivalent, energy_deposited_in_si);

      let mut hit   = HcalHit::new();
      hit.id        = id.raw();
      hit.x         = x;
      hit.y         = y;
      hit.z         = z;
      hit.amplitude = energy_deposited_in_si;
      hit.energy    = reconstructed_energy;
      hit.time      = hit_time;
      rec_hits.push(hit);
    }

    if let Some(sim_hits) = sim_hits {
      let real_hits : HashSet<u32> = sim_hits.iter().map(|h| h.id).collect();
      for hit in rec_hits.iter_mut() {
        hit.is_noise = !real_hits.contains(&hit.id);
      }
    }
    debug!("Reconstructed {} hits from {} digis", rec_hits.len(), digis.num_digis());
    Ok(rec_hits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::conditions::hcal_recon_conditions_hardcode;
  use crate::digis::HgcrocSample;
  use crate::geometry::HcalReadout;
  use crate::ids::BACK;

  fn samples(adc_t : u16, toa : u16) -> Vec<HgcrocSample> {
    let mut samples = vec![HgcrocSample::adc(50, 50, 0);10];
    samples[0].toa   = toa;
    samples[2].adc_t = adc_t;
    samples
  }

  #[test]
  fn reconstruct_single_bar() {
    let rec        = HcalRecProducer::new("myHcalRecHits");
    let (table, _) = hcal_recon_conditions_hardcode().get_condition(1, false).unwrap();
    let conditions = HcalReconConditions::new(&table, true).unwrap();
    let readout    = HcalReadout::v12();
    let mut digis  = HgcrocDigiCollection::new(10, 0);
    digis.add_digi(HcalDigiID::new(BACK, 4, 10, 0).raw(), samples(730, 512)).unwrap();
    digis.add_digi(HcalDigiID::new(BACK, 4, 10, 1).raw(), samples(390, 256)).unwrap();
    let sim_hit = SimCalorimeterHit {
      id : HcalID::new(BACK, 4, 10).raw(),
      ..SimCalorimeterHit::default()
    };
    let sim_hits = vec![sim_hit];
    let hits = rec.produce(&digis, &conditions, &readout, Some(sim_hits.as_slice())).unwrap();
    assert_eq!(hits.len(), 1);
    let hit = hits[0];
    // (680 + 340)*0.5 mV = 510 mV = 1.5 MIP
    assert!((hit.amplitude - 1.5*4.66).abs() < 1e-9);
    assert_eq!(hit.energy, hit.amplitude);
    // 512 and 256 TOA counts are 12.5 and 6.25 ns
    assert!((hit.time - 3.125).abs() < 1e-9);
    assert_eq!(hit.hcal_id(), HcalID::new(BACK, 4, 10));
    assert!(!hit.is_noise);
    assert_eq!(hit.position(), [-975.0, 0.0, 870.0 + 4.5*49.0]);
  }

  #[test]
  fn noise_and_mismatched_pairs() {
    let rec        = HcalRecProducer::new("myHcalRecHits");
    let (table, _) = hcal_recon_conditions_hardcode().get_condition(1, false).unwrap();
    let conditions = HcalReconConditions::new(&table, true).unwrap();
    let readout    = HcalReadout::v12();
    let mut digis  = HgcrocDigiCollection::new(10, 0);
    digis.add_digi(HcalDigiID::new(BACK, 1, 1, 0).raw(), samples(40, 0)).unwrap();
    digis.add_digi(HcalDigiID::new(BACK, 1, 1, 1).raw(), samples(40, 0)).unwrap();
    digis.add_digi(HcalDigiID::new(BACK, 2, 1, 0).raw(), samples(60, 0)).unwrap();
    digis.add_digi(HcalDigiID::new(BACK, 3, 1, 1).raw(), samples(60, 0)).unwrap();
    let no_sim_hits = Vec::<SimCalorimeterHit>::new();
    let hits = rec.produce(&digis, &conditions, &readout, Some(no_sim_hits.as_slice())).unwrap();
    assert_eq!(hits.len(), 1);
    // below pedestal there is no amplitude
    assert_eq!(hits[0].amplitude, 0.0);
    assert!(hits[0].is_noise);
  }

  #[test]
  fn energy_is_not_weighted() {
    let mut rec    = HcalRecProducer::new("myHcalRecHits");
    rec.layer_weights = vec![2.0;101];
    rec.second_order_energy_correction = 0.5;
    let (table, _) = hcal_recon_conditions_hardcode().get_condition(1, false).unwrap();
    let conditions = HcalReconConditions::new(&table, true).unwrap();
    let mut digis  = HgcrocDigiCollection::new(10, 0);
    digis.add_digi(HcalDigiID::new(BACK, 5, 1, 0).raw(), samples(390, 0)).unwrap();
    digis.add_digi(HcalDigiID::new(BACK, 5, 1, 1).raw(), samples(390, 0)).unwrap();
    let hits = rec.produce(&digis, &conditions, &HcalReadout::v12(), None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].energy, hits[0].amplitude);
    assert!((hits[0].energy - 4.66).abs() < 1e-9);
  }

}
