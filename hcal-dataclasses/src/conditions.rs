//! Condition tables and the registry of 
//! conditions providers
//!
//! Conditions are looked up by the raw detector id,
//! a table holds a fixed number of double values
//! (one per column). The tables use a single row 
//! which is valid for all channels.
//!
//! Providers are declared once per process in a 
//! global registry, from which the process 
//! description picks them up.
//!

use std::fmt;
use std::sync::{
  Mutex,
  MutexGuard,
  OnceLock,
};

use crate::errors::ConditionsError;
use crate::geometry::HcalReadout;
use crate::constants::HCAL_RECON_CONDITIONS;

/// Hard-coded recon conditions, valid for all rows
///
/// * ADC pedestal - should match the HgcrocEmulator
/// * ADC gain     - 512 fC / 1024. counts, conversion to 
///                  estimated charge deposited in ADC mode
/// * TOT pedestal - same pedestal as ADC right now
/// * TOT gain     - 10240 fC / 4096 counts, conversion to 
///                  estimated charge deposited in TOT mode
pub const HCAL_RECON_CONDITIONS_HARDCODE : [f64;4] = [50.0, 0.5, 50.0, 2.5];

/*************************************/

/// Interval of validity of a condition
#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ConditionsIov {
  /// first run (-1 for unbounded)
  pub first_run      : i32,
  /// last run (-1 for unbounded)
  pub last_run       : i32,
  pub valid_for_data : bool,
  pub valid_for_mc   : bool,
}

impl ConditionsIov {
  pub fn new(first_run : i32, last_run : i32, valid_for_data : bool, valid_for_mc : bool) -> Self {
    Self {
      first_run,
      last_run,
      valid_for_data,
      valid_for_mc
    }
  }

  /// Valid for everything
  pub fn always() -> Self {
    Self::new(-1, -1, true, true)
  }

  /// Check if the condition can be used for 
  /// a run
  pub fn validates(&self, run : i32, is_data : bool) -> bool {
    if is_data && !self.valid_for_data {
      return false;
    }
    if !is_data && !self.valid_for_mc {
      return false;
    }
    (self.first_run == -1 || run >= self.first_run)
      && (self.last_run == -1 || run <= self.last_run)
  }
}

impl Default for ConditionsIov {
  fn default() -> Self {
    Self::always()
  }
}

impl fmt::Display for ConditionsIov {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<ConditionsIov: runs {}..{} data {} mc {}>",
           self.first_run, self.last_run, self.valid_for_data, self.valid_for_mc)
  }
}

/*************************************/

#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum RunType {
  Any,
  Data,
  MC,
}

/// One set of values of a table provider 
/// together with the runs it is valid for
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TableEntry {
  pub first_run : i32,
  pub last_run  : i32,
  pub run_type  : RunType,
  pub values    : Vec<f64>,
}

impl TableEntry {
  pub fn iov(&self) -> ConditionsIov {
    ConditionsIov::new(self.first_run,
                       self.last_run,
                       self.run_type != RunType::MC,
                       self.run_type != RunType::Data)
  }
}

/*************************************/

/// A table of double conditions, the same 
/// row is used for every detector id
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleTableCondition {
  pub name    : String,
  columns     : Vec<String>,
  default_row : Option<Vec<f64>>,
}

impl DoubleTableCondition {
  pub fn new(name : &str, columns : &[String]) -> Self {
    Self {
      name        : String::from(name),
      columns     : columns.to_vec(),
      default_row : None,
    }
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn n_columns(&self) -> usize {
    self.columns.len()
  }
  
  pub fn find_column(&self, name : &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  fn check_width(&self, values : &[f64]) -> Result<(), ConditionsError> {
    if values.len() != self.columns.len() {
      error!("Table {} has {} columns, but got {} values!", self.name, self.columns.len(), values.len());
      return Err(ConditionsError::WrongNumberOfValues);
    }
    Ok(())
  }

  /// Use these values for every channel
  pub fn set_default_row(&mut self, values : &[f64]) -> Result<(), ConditionsError> {
    self.check_width(values)?;
    self.default_row = Some(values.to_vec());
    Ok(())
  }

  pub fn get_row(&self, id : u32) -> Result<&[f64], ConditionsError> {
    match &self.default_row {
      Some(row) => Ok(row),
      None => {
        error!("No row for id {id} in table {}!", self.name);
        Err(ConditionsError::NoRowForId)
      }
    }
  }

  pub fn get(&self, id : u32, column : usize) -> Result<f64, ConditionsError> {
    if column >= self.columns.len() {
      error!("Column {column} requested, but table {} has only {} columns!", self.name, self.columns.len());
      return Err(ConditionsError::ColumnOutOfRange);
    }
    let row = self.get_row(id)?;
    Ok(row[column])
  }
}

impl fmt::Display for DoubleTableCondition {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<DoubleTableCondition: {} columns {:?}, row {:?}>",
           self.name, self.columns, self.default_row)
  }
}

/*************************************/

/// Provides a table of double conditions
/// which are given in the configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DoubleTableProvider {
  pub object_name : String,
  pub tag_name    : String,
  pub columns     : Vec<String>,
  pub entries     : Vec<TableEntry>,
}

impl DoubleTableProvider {
  pub fn new(object_name : &str, columns : &[&str]) -> Self {
    Self {
      object_name : String::from(object_name),
      tag_name    : String::from(""),
      columns     : columns.iter().map(|c| String::from(*c)).collect(),
      entries     : Vec::new(),
    }
  }

  /// Add a set of values valid for a range of runs
  pub fn add_entry(&mut self,
                   first_run : i32,
                   last_run  : i32,
                   run_type  : RunType,
                   values    : &[f64]) -> Result<(), ConditionsError> {
    if values.len() != self.columns.len() {
      error!("Provider {} expects {} values ({:?}), got {}!",
             self.object_name, self.columns.len(), self.columns, values.len());
      return Err(ConditionsError::WrongNumberOfValues);
    }
    self.entries.push(TableEntry {
      first_run,
      last_run,
      run_type,
      values : values.to_vec()
    });
    Ok(())
  }

  /// The values are used for every channel
  /// in every run
  pub fn valid_for_all_rows(&mut self, values : &[f64]) -> Result<(), ConditionsError> {
    self.add_entry(-1, -1, RunType::Any, values)
  }

  /// Get the table valid for the given run. 
  /// Later entries take precedence.
  pub fn get_condition(&self, run : i32, is_data : bool) 
    -> Result<(DoubleTableCondition, ConditionsIov), ConditionsError> {
    for entry in self.entries.iter().rev() {
      let iov = entry.iov();
      if iov.validates(run, is_data) {
        let mut table = DoubleTableCondition::new(&self.object_name, &self.columns);
        table.set_default_row(&entry.values)?;
        return Ok((table, iov));
      }
    }
    error!("No entry of {} is valid for run {run}!", self.object_name);
    Err(ConditionsError::NoValidEntry)
  }

  pub fn declaration(&self) -> ConditionsProviderDeclaration {
    ConditionsProviderDeclaration {
      object_name : self.object_name.clone(),
      class_name  : String::from("conditions::SimpleCSVDoubleTableProvider"),
      module_name : String::from("Conditions"),
      tag_name    : self.tag_name.clone(),
      parameters  : ProviderParameters::DoubleTable {
        columns : self.columns.clone(),
        entries : self.entries.clone()
      },
    }
  }
}

/*************************************/

/// Wrap a double table and access it by the 
/// HCal recon quantities.
///
/// The column indices are hard-coded, on construction
/// the names of the table columns can be checked 
/// against them.
pub struct HcalReconConditions<'a> {
  table : &'a DoubleTableCondition
}

impl<'a> HcalReconConditions<'a> {
  pub const IADC_PEDESTAL    : usize = 0;
  pub const IADC_GAIN        : usize = 1;
  pub const ITOT_PEDESTAL    : usize = 2;
  pub const ITOT_GAIN        : usize = 3;
  pub const EXPECTED_COLUMNS : [&'static str;4] = ["ADC_PEDESTAL", "ADC_GAIN", "TOT_PEDESTAL", "TOT_GAIN"];

  pub fn new(table : &'a DoubleTableCondition, validate : bool) -> Result<Self, ConditionsError> {
    if validate {
      if table.n_columns() != Self::EXPECTED_COLUMNS.len() {
        error!("Table {} has {} columns, expected {}!", table.name, table.n_columns(), Self::EXPECTED_COLUMNS.len());
        return Err(ConditionsError::ColumnMismatch);
      }
      for (k, expected) in Self::EXPECTED_COLUMNS.iter().enumerate() {
        if table.columns()[k] != *expected {
          error!("Expected column '{}' at index {k}, but table {} has '{}'!", expected, table.name, table.columns()[k]);
          return Err(ConditionsError::ColumnMismatch);
        }
      }
    }
    Ok(Self {
      table
    })
  }

  /// ADC pedestal [counts]
  pub fn adc_pedestal(&self, id : u32) -> Result<f64, ConditionsError> {
    self.table.get(id, Self::IADC_PEDESTAL)
  }

  /// Converts ADC counts into an estimate of
  /// the deposited charge [fC/count]
  pub fn adc_gain(&self, id : u32) -> Result<f64, ConditionsError> {
    self.table.get(id, Self::IADC_GAIN)
  }

  /// TOT pedestal [counts]
  pub fn tot_pedestal(&self, id : u32) -> Result<f64, ConditionsError> {
    self.table.get(id, Self::ITOT_PEDESTAL)
  }

  /// Converts TOT counts into an estimate of
  /// the deposited charge [fC/count]
  pub fn tot_gain(&self, id : u32) -> Result<f64, ConditionsError> {
    self.table.get(id, Self::ITOT_GAIN)
  }
}

/*************************************/

/// Parameters of a declared provider, as they
/// are handed to the run loop
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum ProviderParameters {
  DoubleTable {
    columns : Vec<String>,
    entries : Vec<TableEntry>,
  },
  HcalGeometry {
    readouts : Vec<HcalReadout>,
  },
}

/// A conditions provider declared for this process
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ConditionsProviderDeclaration {
  pub object_name : String,
  pub class_name  : String,
  pub module_name : String,
  pub tag_name    : String,
  pub parameters  : ProviderParameters,
}

impl fmt::Display for ConditionsProviderDeclaration {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<ConditionsProvider: {} ({} from {})>",
           self.object_name, self.class_name, self.module_name)
  }
}

static CONDITIONS_REGISTRY : OnceLock<Mutex<Vec<ConditionsProviderDeclaration>>> = OnceLock::new();

fn registry() -> MutexGuard<'static, Vec<ConditionsProviderDeclaration>> {
  let registry = CONDITIONS_REGISTRY.get_or_init(|| Mutex::new(Vec::new()));
  match registry.lock() {
    Ok(guard) => guard,
    Err(poisoned) => {
      warn!("Conditions registry lock was poisoned, continuing anyway!");
      poisoned.into_inner()
    }
  }
}

/// Declare a provider for the process. Each object
/// name can only be provided once.
pub fn declare_conditions_provider(declaration : ConditionsProviderDeclaration) 
  -> Result<(), ConditionsError> {
  let mut providers = registry();
  if providers.iter().any(|p| p.object_name == declaration.object_name) {
    error!("A provider for {} has been declared already!", declaration.object_name);
    return Err(ConditionsError::DuplicateProvider);
  }
  info!("Declaring conditions provider {}", declaration);
  providers.push(declaration);
  Ok(())
}

/// All providers declared so far
pub fn declared_conditions_providers() -> Vec<ConditionsProviderDeclaration> {
  registry().clone()
}

static HCAL_RECON_CONDITIONS_PROVIDER : OnceLock<DoubleTableProvider> = OnceLock::new();

/// The hard-coded HCal recon conditions.
///
/// The first access declares the provider.
pub fn hcal_recon_conditions_hardcode() -> &'static DoubleTableProvider {
  HCAL_RECON_CONDITIONS_PROVIDER.get_or_init(|| {
    let mut provider = DoubleTableProvider::new(HCAL_RECON_CONDITIONS,
                                                &HcalReconConditions::EXPECTED_COLUMNS);
    if let Err(err) = provider.valid_for_all_rows(&HCAL_RECON_CONDITIONS_HARDCODE) {
      error!("Unable to set hard-coded recon conditions! {err}");
    }
    if let Err(err) = declare_conditions_provider(provider.declaration()) {
      error!("Unable to declare the hard-coded recon conditions! {err}");
    }
    provider
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ids::HcalDigiID;

  #[test]
  fn hardcoded_table_uniform_for_all_channels() {
    let provider   = hcal_recon_conditions_hardcode();
    let (table, _) = provider.get_condition(1, false).unwrap();
    let conditions = HcalReconConditions::new(&table, true).unwrap();
    for id in [0u32, 1, 4242, HcalDigiID::new(0, 100, 59, 1).raw(), u32::MAX] {
      assert_eq!(conditions.adc_pedestal(id).unwrap(), 50.0);
      assert_eq!(conditions.adc_gain(id).unwrap(), 0.5);
      assert_eq!(conditions.tot_pedestal(id).unwrap(), 50.0);
      assert_eq!(conditions.tot_gain(id).unwrap(), 2.5);
    }
  }

  #[test]
  fn hardcoded_provider_is_declared_once() {
    let first  = hcal_recon_conditions_hardcode();
    let second = hcal_recon_conditions_hardcode();
    assert!(std::ptr::eq(first, second));
    let n = declared_conditions_providers().iter()
      .filter(|p| p.object_name == HCAL_RECON_CONDITIONS).count();
    assert_eq!(n, 1);
  }

  #[test]
  fn duplicate_declaration_fails() {
    let provider = DoubleTableProvider::new("TestDuplicateTable", &["A"]);
    assert!(declare_conditions_provider(provider.declaration()).is_ok());
    assert_eq!(declare_conditions_provider(provider.declaration()),
               Err(ConditionsError::DuplicateProvider));
  }

  #[test]
  fn wrong_number_of_values() {
    let mut provider = DoubleTableProvider::new("Test", &["A", "B"]);
    assert_eq!(provider.valid_for_all_rows(&[1.0]), Err(ConditionsError::WrongNumberOfValues));
    assert!(provider.entries.is_empty());
  }

  #[test]
  fn column_validation() {
    let columns = vec![String::from("ADC_GAIN"),
                       String::from("ADC_PEDESTAL"),
                       String::from("TOT_PEDESTAL"),
                       String::from("TOT_GAIN")];
    let table = DoubleTableCondition::new("Swapped", &columns);
    assert!(HcalReconConditions::new(&table, true).is_err());
    assert!(HcalReconConditions::new(&table, false).is_ok());
  }

  #[test]
  fn one_row_for_all_channels() {
    let columns   = vec![String::from("A"), String::from("B")];
    let mut table = DoubleTableCondition::new("Test", &columns);
    assert_eq!(table.get(7, 0), Err(ConditionsError::NoRowForId));
    assert_eq!(table.set_default_row(&[1.0]), Err(ConditionsError::WrongNumberOfValues));
    table.set_default_row(&[1.0, 2.0]).unwrap();
    assert_eq!(table.get(7, 1).unwrap(), 2.0);
    assert_eq!(table.get(8, 1).unwrap(), 2.0);
    assert_eq!(table.get(8, 2), Err(ConditionsError::ColumnOutOfRange));
  }

  #[test]
  fn later_entries_take_precedence() {
    let mut provider = DoubleTableProvider::new("Test", &["A"]);
    provider.valid_for_all_rows(&[1.0]).unwrap();
    provider.add_entry(10, 20, RunType::Data, &[2.0]).unwrap();
    let (table, iov) = provider.get_condition(15, true).unwrap();
    assert_eq!(table.get(0, 0).unwrap(), 2.0);
    assert_eq!(iov.first_run, 10);
    // the run range matches, but not for simulation
    let (table, iov) = provider.get_condition(15, false).unwrap();
    assert_eq!(table.get(0, 0).unwrap(), 1.0);
    assert_eq!(iov, ConditionsIov::always());
  }
}
