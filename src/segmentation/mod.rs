// src/segmentation/mod.rs

// Deklaration der Segmentierungsalgorithmen
pub mod cluster;
pub mod kmeans;
pub mod sampling;

// Re-Exporte für einen schnellen Zugriff
pub use cluster::{Cluster, ClusterConfig, ClusterExtractor, ClusterReport};
pub use kmeans::{CentroidAccumulator, KMeans, KMeansConfig, KMeansOutcome};
pub use sampling::{FarthestPointSampler, SamplingConfig};
