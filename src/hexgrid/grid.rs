// src/hexgrid/grid.rs

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::hexagon::{HEX_SIDES, HexCoord, HexMetric, Hexagon};
use crate::error::{AnalysisError, AnalysisResult};

/// Festlegung der Zellhöhe: entweder explizit oder abgeleitet aus dem
/// mittleren Punktabstand einer Anfangsstichprobe mal Zieldichte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HexSizing {
    Height(f64),
    Sampled { sample_size: usize, target_density: f64 },
}

/// Konfiguration der Dichtekarte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexGridConfig {
    /// Ab dieser Punktanzahl gilt eine Zelle als dicht.
    pub dense_limit: usize,
    pub sizing: HexSizing,
}

impl Default for HexGridConfig {
    fn default() -> Self {
        Self {
            dense_limit: 1,
            sizing: HexSizing::Sampled {
                sample_size: 1000,
                target_density: 3.0,
            },
        }
    }
}

/// Hexagonale Dichtekarte über einer 2D-Punktquelle.
///
/// Aufbau in Phasen: Punkte einspeisen (`add_point`), dann klassifizieren
/// und Ränder verfolgen (`find_shapes`, siehe Randverfolgung). Die Zellen
/// gehören der Karte; Nachbarn werden über den gepackten
/// Koordinatenschlüssel nachgeschlagen, nie über Zeiger.
pub struct HexGrid {
    pub(crate) metric: HexMetric,
    pub(crate) dense_limit: usize,
    pub(crate) cells: HashMap<u64, Hexagon>,
}

impl HexGrid {
    /// Erstellt eine leere Karte mit expliziter Zellhöhe.
    pub fn with_height(height: f64, dense_limit: usize) -> AnalysisResult<Self> {
        if !height.is_finite() || height <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration {
                message: format!("hex height must be finite and positive, got {height}"),
            });
        }
        Ok(Self {
            metric: HexMetric::new(height),
            dense_limit,
            cells: HashMap::new(),
        })
    }

    /// Erstellt die Karte aus einer endlichen 2D-Punktquelle. Bei
    /// [`HexSizing::Sampled`] bestimmt eine Anfangsstichprobe die Zellhöhe,
    /// bevor alle Punkte eingespeist werden.
    pub fn from_points<I>(points: I, config: &HexGridConfig) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        match config.sizing {
            HexSizing::Height(height) => {
                let mut grid = Self::with_height(height, config.dense_limit)?;
                for (x, y) in points {
                    grid.add_point(x, y);
                }
                Ok(grid)
            }
            HexSizing::Sampled {
                sample_size,
                target_density,
            } => {
                let buffered: Vec<(f64, f64)> = points.into_iter().collect();
                let sample = &buffered[..buffered.len().min(sample_size)];
                let height = Self::compute_hex_size(sample, target_density)?;
                let mut grid = Self::with_height(height, config.dense_limit)?;
                for &(x, y) in &buffered {
                    grid.add_point(x, y);
                }
                Ok(grid)
            }
        }
    }

    /// Mittlerer Nächster-Nachbar-Abstand der Stichprobe mal Zieldichte.
    /// Die Stichprobe ist klein genug für den direkten Paarvergleich.
    pub fn compute_hex_size(sample: &[(f64, f64)], target_density: f64) -> AnalysisResult<f64> {
        if sample.len() < 2 {
            return Err(AnalysisError::InsufficientPoints {
                expected: 2,
                actual: sample.len(),
            });
        }
        let mut total = 0.0;
        for (i, &(xi, yi)) in sample.iter().enumerate() {
            let mut nearest = f64::INFINITY;
            for (j, &(xj, yj)) in sample.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = (xi - xj).powi(2) + (yi - yj).powi(2);
                if d < nearest {
                    nearest = d;
                }
            }
            total += nearest.sqrt();
        }
        let mean_spacing = total / sample.len() as f64;
        debug!(
            "hex sizing: mean spacing {mean_spacing:.6} over {} sample points",
            sample.len()
        );
        Ok(mean_spacing * target_density)
    }

    /// Ordnet die Koordinate ihrer Zelle zu und zählt sie dort; eine noch
    /// unbekannte Zelle wird angelegt.
    pub fn add_point(&mut self, x: f64, y: f64) {
        let coord = self.metric.cell_at(x, y);
        let cell = self
            .cells
            .entry(coord.key())
            .or_insert_with(|| Hexagon::new(coord));
        cell.count += 1;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn metric(&self) -> &HexMetric {
        &self.metric
    }

    pub fn cell(&self, coord: HexCoord) -> Option<&Hexagon> {
        self.cells.get(&coord.key())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Hexagon> {
        self.cells.values()
    }

    /// Eine nicht vorhandene Zelle zählt als nicht dicht.
    pub fn is_dense(&self, coord: HexCoord) -> bool {
        self.cells
            .get(&coord.key())
            .map_or(false, |cell| cell.dense)
    }

    /// Markiert dichte Zellen und füllt deren Nachbarmasken. Idempotent;
    /// wird vor jeder Randverfolgung aufgerufen.
    pub(crate) fn classify(&mut self) {
        for cell in self.cells.values_mut() {
            cell.dense = cell.count >= self.dense_limit;
            cell.neighbor_mask = 0;
        }

        let keys: Vec<u64> = self.cells.keys().copied().collect();
        for key in keys {
            let coord = self.cells[&key].coord;
            if !self.cells[&key].dense {
                continue;
            }
            let mut mask = 0u8;
            for side in 0..HEX_SIDES {
                if self.is_dense(coord.neighbor(side)) {
                    mask |= 1 << side;
                }
            }
            self.cells.get_mut(&key).expect("cell exists").neighbor_mask = mask;
        }
    }
}
