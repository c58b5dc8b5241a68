// src/segmentation/sampling.rs

use log::debug;
use serde::{Deserialize, Serialize};

use crate::index::SpatialIndex;

/// Konfiguration des Farthest-Point-Samplings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Anzahl der auszuwählenden Punkte.
    pub count: usize,
}

/// Greedy-Auswahl von Punkten mit maximalem Mindestabstand zur bereits
/// gewählten Teilmenge.
///
/// Saat ist immer Punkt 0. Ist `count` größer oder gleich der Punktanzahl,
/// wird die gesamte Eingabe in unveränderter Reihenfolge zurückgegeben
/// (dokumentierte Randfallpolitik, kein Fehler).
pub struct FarthestPointSampler {
    config: SamplingConfig,
}

impl FarthestPointSampler {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    /// Wählt die konfigurierten Punkte gegen den gegebenen Index aus.
    pub fn sample(&self, index: &dyn SpatialIndex) -> Vec<usize> {
        let n = index.len();
        if self.config.count >= n {
            return (0..n).collect();
        }
        if self.config.count == 0 {
            return Vec::new();
        }

        // Abstand jedes Punkts zur nächsten bereits gewählten Stelle,
        // initialisiert über eine Anfrage vom Saatpunkt über die ganze Menge
        let seed = 0usize;
        let mut best = vec![f64::INFINITY; n];
        for hit in index.knn(index.coordinates(seed), n) {
            best[hit.id] = hit.distance_sq;
        }
        let mut selected = Vec::with_capacity(self.config.count);
        selected.push(seed);
        best[seed] = f64::NEG_INFINITY;

        for _ in 1..self.config.count {
            // argmax; gleiche Abstände fallen auf die kleinere ID
            let mut next = 0usize;
            let mut next_distance = f64::NEG_INFINITY;
            for (id, &d) in best.iter().enumerate() {
                if d > next_distance {
                    next = id;
                    next_distance = d;
                }
            }
            selected.push(next);
            best[next] = f64::NEG_INFINITY;

            for hit in index.knn(index.coordinates(next), n) {
                if hit.distance_sq < best[hit.id] {
                    best[hit.id] = hit.distance_sq;
                }
            }
        }

        debug!("farthest-point sampling: {} of {} points selected", selected.len(), n);
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MemoryCloud;
    use crate::index::Index2D;

    fn line_cloud() -> MemoryCloud {
        MemoryCloud::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (10.0, 0.0)])
    }

    #[test]
    fn count_equal_to_n_returns_all_ids_in_order() {
        let cloud = line_cloud();
        let index = Index2D::build(&cloud).unwrap();
        let sampler = FarthestPointSampler::new(SamplingConfig { count: 5 });
        assert_eq!(sampler.sample(&index), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn count_above_n_returns_input_unchanged() {
        let cloud = line_cloud();
        let index = Index2D::build(&cloud).unwrap();
        let sampler = FarthestPointSampler::new(SamplingConfig { count: 50 });
        assert_eq!(sampler.sample(&index), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn sampling_picks_the_far_outlier_second() {
        let cloud = line_cloud();
        let index = Index2D::build(&cloud).unwrap();
        let sampler = FarthestPointSampler::new(SamplingConfig { count: 2 });
        assert_eq!(sampler.sample(&index), vec![0, 4]);
    }

    #[test]
    fn sampling_spreads_over_square_corners() {
        let cloud = MemoryCloud::from_xy(&[
            (0.0, 0.0),
            (0.1, 0.1),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (5.0, 5.0),
        ]);
        let index = Index2D::build(&cloud).unwrap();
        let sampler = FarthestPointSampler::new(SamplingConfig { count: 4 });
        let picked = sampler.sample(&index);
        assert_eq!(picked[0], 0);
        // die drei übrigen Ecken kommen vor dem Zentrum und dem Nachbarn der Saat
        let mut rest = picked[1..].to_vec();
        rest.sort_unstable();
        assert_eq!(rest, vec![2, 3, 4]);
    }

    #[test]
    fn no_duplicates_even_with_coincident_points() {
        let cloud = MemoryCloud::from_xy(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        let index = Index2D::build(&cloud).unwrap();
        let sampler = FarthestPointSampler::new(SamplingConfig { count: 3 });
        let picked = sampler.sample(&index);
        assert_eq!(picked.len(), 3);
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }
}
