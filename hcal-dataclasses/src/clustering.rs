//! Clustering of reconstructed HCal hits
//!
//! Every hit above the seed threshold starts as its 
//! own (proto)cluster. Then the two closest clusters
//! are merged as long as they are closer than the 
//! cut off, the smaller one is absorbed by the larger
//! one. The centroid is energy weighted.

use std::fmt;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::producers::HcalClusterProducer;
use crate::reconstruction::HcalHit;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HcalCluster {
  /// [MeV]
  pub energy   : f64,
  /// energy weighted centroid [mm]
  pub centroid : [f64;3],
  /// raw ids of the hits in this cluster
  pub hits     : Vec<u32>,
}

impl HcalCluster {
  pub fn new() -> Self {
    Self::default()
  }

  /// A protocluster seeded by a single hit
  pub fn from_hit(hit : &HcalHit) -> Self {
    Self {
      energy   : hit.energy,
      centroid : hit.position(),
      hits     : vec![hit.id],
    }
  }

  pub fn n_hits(&self) -> usize {
    self.hits.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hits.is_empty()
  }

  /// Distance between the centroids [mm]
  pub fn distance(&self, other : &HcalCluster) -> f64 {
    let dx = self.centroid[0] - other.centroid[0];
    let dy = self.centroid[1] - other.centroid[1];
    let dz = self.centroid[2] - other.centroid[2];
    f64::sqrt(dx*dx + dy*dy + dz*dz)
  }

  /// Absorb another cluster
  pub fn merge(&mut self, other : &HcalCluster) {
    let new_energy = self.energy + other.energy;
    if new_energy > 0.0 {
      for k in 0..3 {
        self.centroid[k] = (self.centroid[k]*self.energy + other.centroid[k]*other.energy)/new_energy;
      }
    }
    self.energy = new_energy;
    self.hits.extend_from_slice(&other.hits);
  }
}

impl fmt::Display for HcalCluster {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<HcalCluster: {:.3} MeV, {} hits, centroid ({:.1}, {:.1}, {:.1}) mm>",
           self.energy, self.hits.len(), self.centroid[0], self.centroid[1], self.centroid[2])
  }
}

fn by_energy_descending(a : f64, b : f64) -> Ordering {
  b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Keeps the working clusters while they get 
/// merged
#[derive(Debug, Clone, Default)]
pub struct ClusterMaker {
  working            : Vec<HcalCluster>,
  /// the smallest distance seen for each number
  /// of remaining clusters
  pub transition_weights : BTreeMap<usize, f64>,
  pub n_seeds            : usize,
  pub final_weight       : f64,
}

impl ClusterMaker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_hit(&mut self, hit : &HcalHit) {
    self.working.push(HcalCluster::from_hit(hit));
  }

  /// Merge the working clusters
  ///
  /// # Arguments
  ///
  /// * seed_threshold : only clusters with at least this
  ///                    energy [MeV] absorb others
  /// * cut_off        : clusters closer than this [mm] 
  ///                    get merged
  pub fn make_clusters(&mut self, seed_threshold : f64, cut_off : f64) {
    self.working.sort_by(|a, b| by_energy_descending(a.energy, b.energy));
    let mut n_cluster  = self.working.len();
    let mut min_weight = cut_off;
    while n_cluster > 1 {
      let mut closest : Option<(usize, usize, f64)> = None;
      let mut n_seeds = 0usize;
      for i in 0..self.working.len() {
        if self.working[i].is_empty() || self.working[i].energy < seed_threshold {
          continue;
        }
        n_seeds += 1;
        for j in i + 1..self.working.len() {
          if self.working[j].is_empty() {
            continue;
          }
          let weight = self.working[i].distance(&self.working[j]);
          if closest.map_or(true, |(_, _, w)| weight < w) {
            closest = Some((i, j, weight));
          }
        }
      }
      self.n_seeds = n_seeds;
      let (mut mi, mut mj, weight) = match closest {
        Some(pair) => pair,
        None       => break,
      };
      min_weight = weight;
      self.transition_weights.insert(n_cluster, min_weight);
      if min_weight >= cut_off {
        break;
      }
      // the bigger one absorbs the smaller one
      if self.working[mi].energy < self.working[mj].energy {
        std::mem::swap(&mut mi, &mut mj);
      }
      let absorbed = std::mem::take(&mut self.working[mj]);
      self.working[mi].merge(&absorbed);
      n_cluster -= 1;
    }
    self.final_weight = min_weight;
    trace!("Clustering finished with {} clusters, {} seeds, final weight {}", n_cluster, self.n_seeds, self.final_weight);
  }

  /// The non-empty clusters, highest energy first
  pub fn clusters(&self) -> Vec<HcalCluster> {
    let mut clusters : Vec<HcalCluster> = self.working.iter()
      .filter(|c| !c.is_empty())
      .cloned()
      .collect();
    clusters.sort_by(|a, b| by_energy_descending(a.energy, b.energy));
    clusters
  }
}

impl HcalClusterProducer {

  /// Form clusters from the reconstructed hits
  /// of one event
  pub fn produce(&self, hits : &[HcalHit]) -> Vec<HcalCluster> {
    let mut seeds : Vec<&HcalHit> = hits.iter()
      .filter(|h| h.energy >= self.e_noise_cut)
      .collect();
    seeds.sort_by(|a, b| by_energy_descending(a.energy, b.energy));
    let mut finder = ClusterMaker::new();
    for seed in seeds {
      if seed.energy < self.e_min_seed {
        break;
      }
      finder.add_hit(seed);
    }
    finder.make_clusters(self.e_min_cluster, self.cut_off);
    let clusters = finder.clusters();
    debug!("Formed {} clusters from {} hits", clusters.len(), hits.len());
    clusters
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hit(id : u32, energy : f64, x : f64) -> HcalHit {
    let mut hit = HcalHit::new();
    hit.id      = id;
    hit.energy  = energy;
    hit.x       = x;
    hit
  }

  #[test]
  fn neighbours_merge() {
    let producer = HcalClusterProducer::new("hcalClusters");
    let hits = vec![hit(1, 3.0, 50.0),
                    hit(2, 5.0, 0.0),
                    hit(3, 1.0, 2000.0),
                    // noise 
                    hit(4, 0.005, 10.0),
                    // below seed threshold
                    hit(5, 0.05, 10.0)];
    let clusters = producer.produce(&hits);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].energy, 8.0);
    assert_eq!(clusters[0].hits, vec![2, 1]);
    assert!((clusters[0].centroid[0] - 18.75).abs() < 1e-9);
    assert_eq!(clusters[1].hits, vec![3]);
  }

  #[test]
  fn no_hits_no_clusters() {
    let producer = HcalClusterProducer::new("hcalClusters");
    assert!(producer.produce(&[]).is_empty());
  }

  #[test]
  fn small_clusters_do_not_absorb() {
    let mut finder = ClusterMaker::new();
    finder.add_hit(&hit(1, 0.2, 0.0));
    finder.add_hit(&hit(2, 0.3, 10.0));
    finder.make_clusters(0.5, 100.0);
    assert_eq!(finder.clusters().len(), 2);
    assert_eq!(finder.n_seeds, 0);
  }
}
