// src/hexgrid/mod.rs

// Deklaration der Hexraster-Module
pub mod grid;
pub mod hexagon;
pub mod path;
mod tracer;

// Re-Exporte für einen schnellen Zugriff auf die Kerntypen
pub use grid::{HexGrid, HexGridConfig, HexSizing};
pub use hexagon::{HEX_SIDES, HexCoord, HexMetric, Hexagon};
pub use path::{Path, PathOrientation, Segment, ShapeForest, TraceFailure};
