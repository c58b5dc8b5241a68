// src/cloud/mod.rs

// Der Punktwolken-Container selbst gehört dem Aufrufer (Dateiimport, GUI, ...).
// Der Analysekern sieht ihn nur durch diesen schmalen Vertrag.

pub mod memory;

pub use memory::MemoryCloud;

/// Namen der Standard-Dimensionen einer Punktwolke.
pub const DIM_X: &str = "X";
pub const DIM_Y: &str = "Y";
pub const DIM_Z: &str = "Z";

/// Ausgabe-Dimension der Segmentierungsalgorithmen. 0 bedeutet "keinem
/// Cluster zugeordnet"; Cluster-IDs beginnen bei 1.
pub const DIM_CLUSTER_ID: &str = "ClusterID";

/// Lesender und schreibender Zugriff auf eine geordnete, stabil indizierte
/// Punktsammlung (IDs 0..count). Jeder Punkt trägt benannte numerische
/// Dimensionen (mindestens X und Y, optional Z und beliebige Attribute).
///
/// Ein verändertes Punktlayout (Positionen, Anzahl) invalidiert jeden darauf
/// aufgebauten Suchindex; danach muss neu aufgebaut werden.
pub trait PointView {
    /// Anzahl der Punkte.
    fn count(&self) -> usize;

    /// Wert einer Dimension für einen Punkt.
    ///
    /// Eine unbekannte Dimension oder eine ID außerhalb von 0..count ist ein
    /// Programmierfehler und führt zu einem Panic.
    fn value(&self, dimension: &str, id: usize) -> f64;

    /// Schreibt einen Wert. Eine noch nicht vorhandene Dimension wird beim
    /// ersten Schreiben angelegt (mit 0.0 vorbelegt).
    fn set_value(&mut self, dimension: &str, id: usize, value: f64);

    /// Prüft, ob die Dimension vorhanden ist.
    fn has_dimension(&self, dimension: &str) -> bool;
}
