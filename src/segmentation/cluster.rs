// src/segmentation/cluster.rs

use std::collections::VecDeque;

use log::info;
use serde::{Deserialize, Serialize};

use crate::cloud::{DIM_CLUSTER_ID, PointView};
use crate::error::{AnalysisError, AnalysisResult};
use crate::index::SpatialIndex;

/// Konfiguration der Clusterextraktion (Zusammenhangskomponenten).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Toleranzradius: Punkte innerhalb dieses Abstands gelten als verbunden.
    pub tolerance: f64,
    /// Minimale Clustergröße; kleinere Gruppen werden verworfen.
    pub min_points: usize,
    /// Maximale Clustergröße; größere Gruppen werden verworfen.
    pub max_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            min_points: 1,
            max_points: usize::MAX,
        }
    }
}

/// Ein fertiger Cluster: positive ID plus die zugehörigen Punkt-IDs.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: u32,
    pub points: Vec<usize>,
}

/// Ergebnis eines vollständigen Extraktionsdurchlaufs.
#[derive(Debug, Clone)]
pub struct ClusterReport {
    pub clusters: Vec<Cluster>,
    /// Gruppen, die wegen der Größenschranken verworfen wurden. Deren Punkte
    /// bleiben besucht, aber unzugeordnet (ClusterID 0).
    pub rejected_groups: usize,
    pub assigned_points: usize,
}

/// Clusterextraktion über Zusammenhangskomponenten im Toleranzradius.
///
/// Die Saatpunkte werden in aufsteigender ID-Reihenfolge abgearbeitet; die
/// Reihenfolge der Clusterentdeckung (und damit die vergebenen IDs) hängt
/// nur davon ab, nicht von der inneren Ordnung des Suchindex.
pub struct ClusterExtractor {
    config: ClusterConfig,
}

impl ClusterExtractor {
    /// Prüft die Konfiguration vor dem Durchlauf.
    pub fn new(config: ClusterConfig) -> AnalysisResult<Self> {
        if !config.tolerance.is_finite() || config.tolerance < 0.0 {
            return Err(AnalysisError::InvalidConfiguration {
                message: format!("tolerance must be finite and >= 0, got {}", config.tolerance),
            });
        }
        if config.min_points == 0 {
            return Err(AnalysisError::InvalidConfiguration {
                message: "min_points must be at least 1".to_string(),
            });
        }
        if config.min_points > config.max_points {
            return Err(AnalysisError::InvalidConfiguration {
                message: format!(
                    "min_points ({}) exceeds max_points ({})",
                    config.min_points, config.max_points
                ),
            });
        }
        Ok(Self { config })
    }

    /// Ein vollständiger Durchlauf über die Punktwolke. Schreibt die
    /// Cluster-IDs (beginnend bei 1) in die ClusterID-Dimension; 0 bedeutet
    /// unzugeordnet.
    ///
    /// Der Index muss über dieselbe Wolke im selben Stand aufgebaut sein.
    pub fn extract(
        &self,
        index: &dyn SpatialIndex,
        view: &mut dyn PointView,
    ) -> AnalysisResult<ClusterReport> {
        let n = index.len();
        assert_eq!(
            n,
            view.count(),
            "index and point view disagree on point count; rebuild the index"
        );

        // Ausgabedimension anlegen bzw. zurücksetzen
        for id in 0..n {
            view.set_value(DIM_CLUSTER_ID, id, 0.0);
        }

        let mut visited = vec![false; n];
        let mut clusters = Vec::new();
        let mut rejected_groups = 0usize;
        let mut assigned_points = 0usize;
        let mut next_id: u32 = 1;

        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let mut members = vec![seed];
            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                for hit in index.radius(index.coordinates(current), self.config.tolerance) {
                    if !visited[hit.id] {
                        visited[hit.id] = true;
                        members.push(hit.id);
                        queue.push_back(hit.id);
                    }
                }
            }

            if (self.config.min_points..=self.config.max_points).contains(&members.len()) {
                for &id in &members {
                    view.set_value(DIM_CLUSTER_ID, id, f64::from(next_id));
                }
                assigned_points += members.len();
                clusters.push(Cluster {
                    id: next_id,
                    points: members,
                });
                next_id += 1;
            } else {
                // Punkte bleiben besucht, werden aber keinem Cluster
                // zugeordnet und nicht erneut betrachtet
                rejected_groups += 1;
            }
        }

        info!(
            "cluster extraction: {} clusters, {} of {} points assigned, {} groups rejected",
            clusters.len(),
            assigned_points,
            n,
            rejected_groups
        );

        Ok(ClusterReport {
            clusters,
            rejected_groups,
            assigned_points,
        })
    }
}
