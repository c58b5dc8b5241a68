// src/segmentation/kmeans.rs

use log::info;
use serde::{Deserialize, Serialize};

use super::sampling::{FarthestPointSampler, SamplingConfig};
use crate::cloud::{DIM_CLUSTER_ID, DIM_X, DIM_Y, DIM_Z, MemoryCloud, PointView};
use crate::error::{AnalysisError, AnalysisResult};
use crate::index::{FlexibleIndex, SpatialIndex};

/// Konfiguration des Lloyd-k-Means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Anzahl der Zentren.
    pub k: usize,
    /// Feste Anzahl von Iterationen. Es gibt bewusst keinen
    /// Konvergenztest; die Iterationszahl ist Teil des Vertrags.
    pub max_iterations: usize,
    /// Geordnete Liste der Dimensionen, über die geclustert wird.
    pub dimensions: Vec<String>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 8,
            max_iterations: 10,
            dimensions: vec![DIM_X.to_string(), DIM_Y.to_string(), DIM_Z.to_string()],
        }
    }
}

/// Laufendes Mittel pro Zentrum und Dimension (Welford-Update), damit auch
/// sehr große Cluster ohne Rohsummen-Überlauf akkumulieren.
#[derive(Debug, Clone)]
pub struct CentroidAccumulator {
    count: usize,
    mean: Vec<f64>,
}

impl CentroidAccumulator {
    pub fn new(dimensions: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; dimensions],
        }
    }

    pub fn push(&mut self, coordinates: &[f64]) {
        self.count += 1;
        let c = self.count as f64;
        for (m, &x) in self.mean.iter_mut().zip(coordinates) {
            *m += (x - *m) / c;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }
}

/// Ergebnis eines k-Means-Laufs.
#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Finale Zentrumskoordinaten, eine Zeile pro Zentrum.
    pub centers: Vec<Vec<f64>>,
    /// Punktanzahl pro Zentrum in der letzten Zuordnung.
    pub cluster_sizes: Vec<usize>,
    /// Tatsächlich gelaufene Iterationen.
    pub iterations: usize,
    /// Gesetzt, wenn k >= Punktanzahl war und die Identitätspolitik griff
    /// (jeder Punkt wird sein eigenes Zentrum).
    pub degenerate: bool,
}

/// Lloyd-k-Means über eine frei wählbare Dimensionsliste.
///
/// Initialisierung über Farthest-Point-Sampling; die Zentren liegen in
/// einem kleinen Sekundärpuffer, über den pro Iteration ein frischer
/// [`FlexibleIndex`] aufgebaut wird.
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> AnalysisResult<Self> {
        if config.k == 0 {
            return Err(AnalysisError::InvalidConfiguration {
                message: "k must be at least 1".to_string(),
            });
        }
        if config.max_iterations == 0 {
            return Err(AnalysisError::InvalidConfiguration {
                message: "max_iterations must be at least 1".to_string(),
            });
        }
        if config.dimensions.is_empty() {
            return Err(AnalysisError::InvalidConfiguration {
                message: "dimension list must not be empty".to_string(),
            });
        }
        Ok(Self { config })
    }

    /// Führt genau `max_iterations` Iterationen aus und schreibt die finale
    /// Zuordnung (Zentrumsindex + 1) in die ClusterID-Dimension.
    pub fn run(&self, view: &mut dyn PointView) -> AnalysisResult<KMeansOutcome> {
        let dimensions: Vec<&str> = self.config.dimensions.iter().map(String::as_str).collect();
        for name in &dimensions {
            if !view.has_dimension(name) {
                return Err(AnalysisError::MissingDimension {
                    name: (*name).to_string(),
                });
            }
        }

        let n = view.count();
        if self.config.k >= n {
            // Identitätspolitik: jeder Punkt wird sein eigenes Zentrum
            let mut centers = Vec::with_capacity(n);
            for id in 0..n {
                view.set_value(DIM_CLUSTER_ID, id, (id + 1) as f64);
                centers.push(dimensions.iter().map(|d| view.value(d, id)).collect());
            }
            info!(
                "k-means: k ({}) >= point count ({}), identity assignment",
                self.config.k, n
            );
            return Ok(KMeansOutcome {
                centers,
                cluster_sizes: vec![1; n],
                iterations: 0,
                degenerate: true,
            });
        }

        let points = FlexibleIndex::build(view, &dimensions)?;

        // Initiale Zentren über Farthest-Point-Sampling in den Sekundärpuffer
        let sampler = FarthestPointSampler::new(SamplingConfig { count: self.config.k });
        let seeds = sampler.sample(&points);
        let mut centers = MemoryCloud::with_count(self.config.k);
        for (slot, &seed) in seeds.iter().enumerate() {
            let coords = points.coordinates(seed);
            for (d, name) in dimensions.iter().enumerate() {
                centers.set_value(name, slot, coords[d]);
            }
        }

        let mut assignments = vec![0usize; n];
        for _ in 0..self.config.max_iterations {
            (assignments, centers) = self.step(&points, centers, &dimensions)?;
        }

        let mut cluster_sizes = vec![0usize; self.config.k];
        for (id, &center) in assignments.iter().enumerate() {
            view.set_value(DIM_CLUSTER_ID, id, (center + 1) as f64);
            cluster_sizes[center] += 1;
        }

        info!(
            "k-means: {} points over {} centers after {} iterations",
            n, self.config.k, self.config.max_iterations
        );

        Ok(KMeansOutcome {
            centers: (0..self.config.k)
                .map(|slot| {
                    dimensions
                        .iter()
                        .map(|name| centers.value(name, slot))
                        .collect()
                })
                .collect(),
            cluster_sizes,
            iterations: self.config.max_iterations,
            degenerate: false,
        })
    }

    /// Eine Lloyd-Iteration: Zuordnung aller Punkte zum nächsten Zentrum,
    /// dann Überschreiben der Zentren mit den neuen Mittelwerten. Ein
    /// Zentrum ohne zugeordnete Punkte behält seine Position.
    fn step(
        &self,
        points: &FlexibleIndex,
        centers: MemoryCloud,
        dimensions: &[&str],
    ) -> AnalysisResult<(Vec<usize>, MemoryCloud)> {
        let center_index = FlexibleIndex::build(&centers, dimensions)?;

        let mut accumulators: Vec<CentroidAccumulator> = (0..centers.count())
            .map(|_| CentroidAccumulator::new(dimensions.len()))
            .collect();
        let mut assignments = vec![0usize; points.len()];
        for id in 0..points.len() {
            let coords = points.coordinates(id);
            let nearest = center_index
                .neighbor(coords)
                .expect("center buffer is non-empty");
            assignments[id] = nearest;
            accumulators[nearest].push(coords);
        }

        let mut next = centers;
        for (slot, accumulator) in accumulators.iter().enumerate() {
            if !accumulator.is_empty() {
                for (d, name) in dimensions.iter().enumerate() {
                    next.set_value(name, slot, accumulator.mean()[d]);
                }
            }
        }
        Ok((assignments, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(k: usize, max_iterations: usize) -> KMeansConfig {
        KMeansConfig {
            k,
            max_iterations,
            dimensions: vec![DIM_X.to_string(), DIM_Y.to_string()],
        }
    }

    #[test]
    fn accumulator_tracks_the_mean() {
        let mut accumulator = CentroidAccumulator::new(2);
        for x in 1..=100 {
            accumulator.push(&[x as f64, 2.0 * x as f64]);
        }
        assert_eq!(accumulator.count(), 100);
        assert_relative_eq!(accumulator.mean()[0], 50.5, epsilon = 1e-9);
        assert_relative_eq!(accumulator.mean()[1], 101.0, epsilon = 1e-9);
    }

    #[test]
    fn k1_reaches_the_global_mean_in_one_iteration() {
        let points = [(0.0, 0.0), (2.0, 0.0), (2.0, 6.0), (0.0, 6.0)];
        for max_iterations in [1, 7] {
            let mut cloud = MemoryCloud::from_xy(&points);
            let outcome = KMeans::new(config(1, max_iterations))
                .unwrap()
                .run(&mut cloud)
                .unwrap();
            assert_relative_eq!(outcome.centers[0][0], 1.0, epsilon = 1e-9);
            assert_relative_eq!(outcome.centers[0][1], 3.0, epsilon = 1e-9);
            assert_eq!(outcome.cluster_sizes, vec![4]);
            for id in 0..4 {
                assert_eq!(cloud.value(DIM_CLUSTER_ID, id), 1.0);
            }
        }
    }

    #[test]
    fn k_at_least_point_count_assigns_identity() {
        let mut cloud = MemoryCloud::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let outcome = KMeans::new(config(5, 10)).unwrap().run(&mut cloud).unwrap();
        assert!(outcome.degenerate);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.centers.len(), 3);
        for id in 0..3 {
            assert_eq!(cloud.value(DIM_CLUSTER_ID, id), (id + 1) as f64);
        }
    }

    #[test]
    fn two_blobs_split_into_two_clusters() {
        let mut cloud = MemoryCloud::from_xy(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (100.0, 100.0),
            (101.0, 100.0),
            (100.0, 101.0),
        ]);
        let outcome = KMeans::new(config(2, 5)).unwrap().run(&mut cloud).unwrap();
        assert!(!outcome.degenerate);
        let mut sizes = outcome.cluster_sizes.clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![3, 3]);
        // alle Punkte eines Blobs tragen dieselbe ID
        let a = cloud.value(DIM_CLUSTER_ID, 0);
        let b = cloud.value(DIM_CLUSTER_ID, 3);
        assert_ne!(a, b);
        for id in 0..3 {
            assert_eq!(cloud.value(DIM_CLUSTER_ID, id), a);
        }
        for id in 3..6 {
            assert_eq!(cloud.value(DIM_CLUSTER_ID, id), b);
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(KMeans::new(config(0, 10)).is_err());
        assert!(KMeans::new(config(2, 0)).is_err());
        assert!(
            KMeans::new(KMeansConfig {
                k: 2,
                max_iterations: 1,
                dimensions: Vec::new(),
            })
            .is_err()
        );
    }

    #[test]
    fn missing_dimension_fails_before_the_pass() {
        let mut cloud = MemoryCloud::from_xy(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let err = KMeans::new(KMeansConfig::default())
            .unwrap()
            .run(&mut cloud)
            .unwrap_err();
        assert!(err.to_string().contains(DIM_Z));
    }
}
