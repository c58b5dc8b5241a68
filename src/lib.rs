// src/lib.rs

//! Räumlicher Analysekern für Punktwolken.
//!
//! Zwei unabhängige Hälften mit derselben Bauweise (read-only Aufbauphase,
//! danach Batch-Anfragen): indexgestützte Segmentierung
//! (Zusammenhangskomponenten, Farthest-Point-Sampling, Lloyd-k-Means) über
//! einem [`cloud::PointView`], und eine hexagonale Dichtekarte, aus der die
//! Außen-, Loch- und Inselränder einer Punktverteilung als geschlossene
//! Polygone verfolgt werden.

pub mod cloud;
pub mod error;
pub mod hexgrid;
pub mod index;
pub mod segmentation;
pub mod types;

// Re-exports für einfache Verwendung
pub use error::{AnalysisError, AnalysisResult};
pub use types::*;

// Öffentliche API
pub mod prelude {
    pub use super::{
        cloud::{DIM_CLUSTER_ID, DIM_X, DIM_Y, DIM_Z, MemoryCloud, PointView},
        error::{AnalysisError, AnalysisResult},
        hexgrid::{
            HexCoord, HexGrid, HexGridConfig, HexMetric, HexSizing, Hexagon, Path,
            PathOrientation, Segment, ShapeForest, TraceFailure,
        },
        index::{FlexibleIndex, Index2D, Index3D, Neighbor, SpatialIndex},
        segmentation::{
            CentroidAccumulator, Cluster, ClusterConfig, ClusterExtractor, ClusterReport,
            FarthestPointSampler, KMeans, KMeansConfig, KMeansOutcome, SamplingConfig,
        },
        types::{Point2D, Point3D},
    };
}
