//! Error types for the different parts of the 
//! HCal conditions and reconstruction chain
//!
//! The variants carry no payload, the details 
//! are logged at the place where the error is
//! raised.

use std::error::Error;
use std::fmt;

/*************************************/

/// Issues with the geometry provider and the 
/// selection of the HcalReadout
#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum GeometryError {
  /// The singleton provider exists already,
  /// use HcalGeometryProvider::get_instance
  AlreadyInitialized,
  /// The run did not tell us which detector we
  /// are looking at
  NoDetectorName,
  /// A single job attempted to run with 
  /// multiple geometries
  MultipleGeometries,
  /// One of the detectors_valid patterns is 
  /// not a valid regular expression
  InvalidDetectorRegex,
  /// None of the configured readouts matches
  /// the detector
  NoMatchingReadout,
  /// Layer or strip outside of the readout
  StripOutOfRange,
  UnknownPreset,
}

impl fmt::Display for GeometryError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this GeometryError"));
    write!(f, "<GeometryError: {}>", r)
  }
}

impl Error for GeometryError {
}

/*************************************/

/// Issues with condition tables and the 
/// registry of conditions providers
#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum ConditionsError {
  /// The columns of the table do not match the 
  /// expected columns
  ColumnMismatch,
  /// The number of values does not match the 
  /// number of columns
  WrongNumberOfValues,
  ColumnOutOfRange,
  /// The table has not been filled
  NoRowForId,
  /// No entry of the provider is valid for 
  /// the requested run
  NoValidEntry,
  /// A provider for this object name has been
  /// declared already
  DuplicateProvider,
}

impl fmt::Display for ConditionsError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this ConditionsError"));
    write!(f, "<ConditionsError: {}>", r)
  }
}

impl Error for ConditionsError {
}

/*************************************/

#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum DigiError {
  /// The digi has a different number of samples
  /// than the collection expects
  WrongNumberOfSamples,
  SampleOfInterestOutOfRange,
  EmptyDigi,
}

impl fmt::Display for DigiError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this DigiError"));
    write!(f, "<DigiError: {}>", r)
  }
}

impl Error for DigiError {
}

/*************************************/

#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum ReconstructionError {
  Conditions,
  Geometry,
  Digi,
}

impl fmt::Display for ReconstructionError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this ReconstructionError"));
    write!(f, "<ReconstructionError: {}>", r)
  }
}

impl Error for ReconstructionError {
}

impl From<ConditionsError> for ReconstructionError {
  fn from(_err : ConditionsError) -> Self {
    ReconstructionError::Conditions
  }
}

impl From<GeometryError> for ReconstructionError {
  fn from(_err : GeometryError) -> Self {
    ReconstructionError::Geometry
  }
}

impl From<DigiError> for ReconstructionError {
  fn from(_err : DigiError) -> Self {
    ReconstructionError::Digi
  }
}

/*************************************/

/// Issues with the process (pipeline) settings
#[derive(Debug, Copy, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[repr(u8)]
pub enum SettingsError {
  TomlDecodingError,
  TomlEncodingError,
  JsonEncodingError,
  IOError,
  /// The pipeline has no stages
  EmptySequence,
  /// Number of events to process has to be
  /// larger than 0
  InvalidMaxEvents,
  /// The layer weights do not match the 
  /// number of layers of the geometry
  InvalidLayerWeights,
  InvalidEnergyCorrection,
}

impl fmt::Display for SettingsError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let r = serde_json::to_string(self).unwrap_or(
      String::from("Error: cannot unwrap this SettingsError"));
    write!(f, "<SettingsError: {}>", r)
  }
}

impl Error for SettingsError {
}

impl From<std::io::Error> for SettingsError {
  fn from(err : std::io::Error) -> Self {
    error!("IO error! {err}");
    SettingsError::IOError
  }
}
