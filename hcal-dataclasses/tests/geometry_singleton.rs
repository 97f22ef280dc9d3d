//! The geometry provider has to be created explicitly 
//! before anything else touches it, so this runs in 
//! its own test binary.

#[cfg(test)]
pub mod tests {

  use hcal_dataclasses::HcalGeometryProvider;
  use hcal_dataclasses::errors::GeometryError;
  use hcal_dataclasses::conditions::declared_conditions_providers;
  use hcal_dataclasses::constants::HCAL_GEOMETRY_PROVIDER;

  #[test]
  fn create_once_then_reuse() {
    let created = HcalGeometryProvider::create();
    assert!(created.is_ok());
    let created = created.unwrap();
    assert_eq!(HcalGeometryProvider::create().err(), Some(GeometryError::AlreadyInitialized));
    assert!(std::ptr::eq(created, HcalGeometryProvider::get_instance()));
    assert!(std::ptr::eq(HcalGeometryProvider::get_instance(), HcalGeometryProvider::get_instance()));
    let n = declared_conditions_providers().iter()
      .filter(|p| p.object_name == HCAL_GEOMETRY_PROVIDER).count();
    assert_eq!(n, 1);
  }
}
