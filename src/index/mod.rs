// src/index/mod.rs

// Deklaration der Indexvarianten
pub mod fixed;
pub mod flexible;

pub use fixed::{Index2D, Index3D};
pub use flexible::FlexibleIndex;

use crate::cloud::PointView;
use crate::error::{AnalysisError, AnalysisResult};

/// Ein Suchtreffer: Punkt-ID plus quadrierter Abstand zur Anfrageposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    pub distance_sq: f64,
}

impl Neighbor {
    pub fn new(id: usize, distance_sq: f64) -> Self {
        Self { id, distance_sq }
    }

    /// Euklidischer Abstand (Wurzel wird erst hier gezogen).
    pub fn distance(&self) -> f64 {
        self.distance_sq.sqrt()
    }
}

/// Gemeinsamer Vertrag der drei Indexvarianten (2D, 3D, flexibel).
///
/// Ein Index ist ein beim Aufbau erstellter Schnappschuss der Punktwolke und
/// danach unveränderlich; alle Anfragen laufen gegen diesen Schnappschuss.
/// Wird die zugrunde liegende Wolke verändert, muss neu aufgebaut werden.
///
/// Determinismus: alle Ergebnislisten sind nach (Abstand, ID) sortiert,
/// gleiche Abstände werden also immer zugunsten der kleineren ID aufgelöst.
pub trait SpatialIndex {
    /// Anzahl der indizierten Punkte.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Anzahl der indizierten Dimensionen.
    fn dimension_count(&self) -> usize;

    /// Koordinaten eines Mitgliedspunkts im Aufbau-Schnappschuss.
    fn coordinates(&self, id: usize) -> &[f64];

    /// ID des nächstgelegenen Punkts zur Anfrageposition.
    fn neighbor(&self, query: &[f64]) -> Option<usize>;

    /// Bis zu `k` nächste Punkte, nach nicht fallendem Abstand geordnet.
    fn knn(&self, query: &[f64], k: usize) -> Vec<Neighbor>;

    /// Alle Punkte mit Abstand <= `radius` zur Anfrageposition. Ein
    /// Mitgliedspunkt an der Anfrageposition selbst ist immer enthalten
    /// (Abstand 0), auch bei `radius == 0`.
    fn radius(&self, query: &[f64], radius: f64) -> Vec<Neighbor>;
}

/// Sortiert Treffer nach (Abstand, ID) für deterministische Ergebnisse.
pub(crate) fn sort_neighbors(mut hits: Vec<Neighbor>) -> Vec<Neighbor> {
    hits.sort_by(|a, b| {
        a.distance_sq
            .total_cmp(&b.distance_sq)
            .then(a.id.cmp(&b.id))
    });
    hits
}

/// Prüft die Dimensionsliste gegen die Wolke und verlangt mindestens einen
/// Punkt. Fehlende Dimensionen schlagen hier fehl, nie erst bei der Anfrage.
pub(crate) fn check_build_input(
    view: &dyn PointView,
    dimensions: &[&str],
) -> AnalysisResult<()> {
    for name in dimensions {
        if !view.has_dimension(name) {
            return Err(AnalysisError::MissingDimension {
                name: (*name).to_string(),
            });
        }
    }
    if view.count() == 0 {
        return Err(AnalysisError::InsufficientPoints {
            expected: 1,
            actual: 0,
        });
    }
    Ok(())
}
