// src/types/mod.rs

// Re-export häufig verwendete externe Typen
pub use nalgebra::{Point2, Point3};

// Einheitliche Typen für das gesamte Modul
pub type Point2D = Point2<f64>;
pub type Point3D = Point3<f64>;
