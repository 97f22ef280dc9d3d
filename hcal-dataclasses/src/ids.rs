//! Detector identifiers for the HCal
//!
//! Both ids are packed into 32 bits:
//!
//! ```text
//!  31    26 25  22 21   20  18 17    10 9      0
//!  [subdet] [free] [end] [sec] [layer ] [strip ]
//! ```
//!
//! The end (side) of a bar is only used by the 
//! HcalDigiID, since each bar is read out at both
//! ends.

use std::fmt;

cfg_if::cfg_if! {
  if #[cfg(feature = "random")]  {
    use crate::FromRandom;
    extern crate rand;
    use rand::Rng;
  }
}

/// Subdetector code of the HCal
pub const SD_HCAL             : u32 = 5;
pub const SUBDETECTOR_SHIFT   : u32 = 26;
pub const SUBDETECTOR_MASK    : u32 = 0x3F;
pub const END_SHIFT           : u32 = 21;
pub const END_MASK            : u32 = 0x1;
pub const SECTION_SHIFT       : u32 = 18;
pub const SECTION_MASK        : u32 = 0x7;
pub const LAYER_SHIFT         : u32 = 10;
pub const LAYER_MASK          : u32 = 0xFF;
pub const STRIP_SHIFT         : u32 = 0;
pub const STRIP_MASK          : u32 = 0x3FF;

/// HCal sections
pub const BACK                : u32 = 0;
pub const TOP                 : u32 = 1;
pub const BOTTOM              : u32 = 2;
pub const LEFT                : u32 = 3;
pub const RIGHT               : u32 = 4;

/// Identify a single scintillator bar
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HcalID {
  id : u32
}

impl HcalID {
  
  /// Pack section, layer and strip. Values
  /// which do not fit their field get masked.
  pub fn new(section : u32, layer : u32, strip : u32) -> Self {
    let id = (SD_HCAL & SUBDETECTOR_MASK) << SUBDETECTOR_SHIFT
           | (section & SECTION_MASK) << SECTION_SHIFT
           | (layer   & LAYER_MASK)   << LAYER_SHIFT
           | (strip   & STRIP_MASK)   << STRIP_SHIFT;
    Self {
      id
    }
  }

  pub fn raw(&self) -> u32 {
    self.id
  }

  pub fn subdetector(&self) -> u32 {
    (self.id >> SUBDETECTOR_SHIFT) & SUBDETECTOR_MASK
  }

  pub fn section(&self) -> u32 {
    (self.id >> SECTION_SHIFT) & SECTION_MASK
  }

  pub fn layer(&self) -> u32 {
    (self.id >> LAYER_SHIFT) & LAYER_MASK
  }

  pub fn strip(&self) -> u32 {
    (self.id >> STRIP_SHIFT) & STRIP_MASK
  }
  
  pub fn is_hcal(&self) -> bool {
    self.subdetector() == SD_HCAL
  }
}

impl From<u32> for HcalID {
  fn from(raw : u32) -> Self {
    Self {
      id : raw
    }
  }
}

impl From<HcalDigiID> for HcalID {
  /// The bar the digi was read out from
  fn from(digi_id : HcalDigiID) -> Self {
    HcalID::new(digi_id.section(), digi_id.layer(), digi_id.strip())
  }
}

impl fmt::Display for HcalID {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalID: section {} layer {} strip {} (raw 0x{:08x})>",
           self.section(),
           self.layer(),
           self.strip(),
           self.id)
  }
}

#[cfg(feature = "random")]
impl FromRandom for HcalID {
  fn from_random() -> Self {
    let mut rng = rand::thread_rng();
    HcalID::new(rng.gen_range(0..5),
                rng.gen_range(0..crate::constants::N_HCAL_LAYERS_V12 as u32),
                rng.gen_range(0..60))
  }
}

/// Identify one end of a scintillator bar
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HcalDigiID {
  id : u32
}

impl HcalDigiID {
  
  /// end 0 is the end close to the readout
  /// of the hit, end 1 the far end
  pub fn new(section : u32, layer : u32, strip : u32, end : u32) -> Self {
    let bar = HcalID::new(section, layer, strip);
    Self {
      id : bar.raw() | (end & END_MASK) << END_SHIFT
    }
  }

  pub fn raw(&self) -> u32 {
    self.id
  }

  pub fn section(&self) -> u32 {
    (self.id >> SECTION_SHIFT) & SECTION_MASK
  }

  pub fn layer(&self) -> u32 {
    (self.id >> LAYER_SHIFT) & LAYER_MASK
  }

  pub fn strip(&self) -> u32 {
    (self.id >> STRIP_SHIFT) & STRIP_MASK
  }
  
  pub fn end(&self) -> u32 {
    (self.id >> END_SHIFT) & END_MASK
  }

  /// Check if two digi ids are the two ends of
  /// the same bar
  pub fn same_bar(&self, other : &HcalDigiID) -> bool {
    HcalID::from(*self) == HcalID::from(*other)
  }
}

impl From<u32> for HcalDigiID {
  fn from(raw : u32) -> Self {
    Self {
      id : raw
    }
  }
}

impl fmt::Display for HcalDigiID {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalDigiID: section {} layer {} strip {} end {}>",
           self.section(),
           self.layer(),
           self.strip(),
           self.end())
  }
}

#[test]
fn pack_hcal_id() {
  let id = HcalID::new(BACK, 42, 17);
  assert_eq!(id.section(), BACK);
  assert_eq!(id.layer(), 42);
  assert_eq!(id.strip(), 17);
  assert!(id.is_hcal());
  assert_eq!(HcalID::from(id.raw()), id);
}

#[test]
fn digi_id_ends_share_bar() {
  let close = HcalDigiID::new(TOP, 3, 59, 0);
  let far   = HcalDigiID::new(TOP, 3, 59, 1);
  assert_ne!(close, far);
  assert_eq!(far.end(), 1);
  assert!(close.same_bar(&far));
  assert_eq!(HcalID::from(close), HcalID::new(TOP, 3, 59));
  assert!(!close.same_bar(&HcalDigiID::new(TOP, 4, 59, 1)));
}

#[test]
fn overflowing_fields_are_masked() {
  let id = HcalID::new(9, 300, 2000);
  assert_eq!(id.section(), 9 & SECTION_MASK);
  assert_eq!(id.layer(), 300 & LAYER_MASK);
  assert_eq!(id.strip(), 2000 & STRIP_MASK);
}
