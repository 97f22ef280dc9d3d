#[cfg(test)]
pub mod tests {

  extern crate rand;
  use rand::Rng;
  use hcal_dataclasses::FromRandom;
  use hcal_dataclasses::ids::{HcalID, HcalDigiID, BACK};
  use hcal_dataclasses::digis::{HgcrocSample, HgcrocDigiCollection};
  use hcal_dataclasses::conditions::{
    HcalReconConditions,
    hcal_recon_conditions_hardcode,
    declared_conditions_providers,
  };
  use hcal_dataclasses::constants::{
    N_PE_PER_MIP,
    MIP_SI_ENERGY,
    HCAL_GEOMETRY_PROVIDER,
    HCAL_RECON_CONDITIONS,
  };
  use hcal_dataclasses::process::{Process, Stage};
  use hcal_dataclasses::{
    HcalDigiProducer,
    HcalRecProducer,
    HcalClusterProducer,
    HcalGeometryProvider,
    HgcrocSettings,
  };

  #[test]
  fn hcal_id_fields_survive_packing() {
    for _ in 0..100 {
      let id   = HcalID::from_random();
      let back = HcalID::from(id.raw());
      assert_eq!(back, id);
      assert!(back.is_hcal());
      assert!(back.section() < 5);
      assert!(back.layer()   < 101);
      assert!(back.strip()   < 60);
    }
  }

  #[test]
  fn digi_id_ends_belong_to_one_bar() {
    for _ in 0..100 {
      let id    = HcalID::from_random();
      let close = HcalDigiID::new(id.section(), id.layer(), id.strip(), 0);
      let far   = HcalDigiID::new(id.section(), id.layer(), id.strip(), 1);
      assert!(close.same_bar(&far));
      assert_eq!(HcalID::from(far), id);
    }
  }

  #[test]
  fn mev_matches_mip_response_for_any_gain() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
      let gain = rng.gen_range(0.01..10.0);
      let digi = HcalDigiProducer::new(gain, "myHcalDigis");
      let expected = (N_PE_PER_MIP*5.0)/MIP_SI_ENERGY;
      assert!((digi.mev - expected).abs() < 1e-9);
      assert_eq!(digi.hgcroc.gain, gain);
    }
  }

  #[test]
  fn thresholds_are_ordered() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
      let gain     = rng.gen_range(0.01..10.0);
      let settings = HgcrocSettings::hcal(gain);
      assert!(settings.readout_threshold < settings.toa_threshold);
      assert!(settings.toa_threshold     < settings.tot_threshold);
      assert_eq!(settings.readout_pad_capacitance, 20.0);
    }
  }

  #[test]
  fn random_digis_reconstruct_to_non_negative_energies() {
    let provider   = hcal_recon_conditions_hardcode();
    let (table, _) = provider.get_condition(1, false).unwrap();
    let conditions = HcalReconConditions::new(&table, true).unwrap();
    let geometry   = HcalGeometryProvider::get_instance();
    geometry.on_new_run("ldmx-det-v12").unwrap();
    let (readout, _) = geometry.get_condition(1).unwrap();
    let rec        = HcalRecProducer::new("myHcalRecHits");
    let mut rng    = rand::thread_rng();
    let mut digis  = HgcrocDigiCollection::new(10, 2);
    for _ in 0..20 {
      let layer = rng.gen_range(0..101);
      let strip = rng.gen_range(0..60);
      for end in 0..2 {
        let samples : Vec<HgcrocSample> = (0..10).map(|_| HgcrocSample::from_random()).collect();
        digis.add_digi(HcalDigiID::new(BACK, layer, strip, end).raw(), samples).unwrap();
      }
    }
    let hits = rec.produce(&digis, &conditions, readout.as_ref(), None).unwrap();
    assert_eq!(hits.len(), 20);
    for hit in &hits {
      assert!(hit.energy    >= 0.0);
      assert!(hit.amplitude >= 0.0);
      assert!(hit.time      >= 0.0);
      assert!(!hit.is_noise);
    }
    let clusters = HcalClusterProducer::default().produce(&hits);
    let clustered : f64 = clusters.iter().map(|c| c.energy).sum();
    let total     : f64 = hits.iter().filter(|h| h.energy >= 0.01).map(|h| h.energy).sum();
    assert!(clustered <= total + 1e-6);
  }

  #[test]
  fn pipeline_round_trips_through_toml() {
    let process  = Process::hcal_digi_pipeline(0.5, 4.0);
    let filename = std::env::temp_dir().join("hcal-digi-pipeline-integration-test.toml");
    let filename = filename.to_string_lossy().to_string();
    process.to_toml(&filename).unwrap();
    let read_back = Process::from_toml(&filename).unwrap();
    assert!(read_back.validate().is_ok());
    assert_eq!(read_back.pass_name, "v12");
    assert_eq!(read_back.sequence, process.sequence);
    match &read_back.sequence[1] {
      Stage::HcalDigi(digi) => assert_eq!(digi.hgcroc.gain, 0.5),
      _ => panic!("Second stage has to be the digitization!")
    }
  }

  #[test]
  fn providers_are_declared_once() {
    let _ = Process::hcal_digi_pipeline(0.5, 4.0);
    let _ = Process::hcal_digi_pipeline(1.0, 2.0);
    let providers = declared_conditions_providers();
    for name in [HCAL_GEOMETRY_PROVIDER, HCAL_RECON_CONDITIONS] {
      assert_eq!(providers.iter().filter(|p| p.object_name == name).count(), 1);
    }
    assert!(HcalGeometryProvider::create().is_err());
  }
}
