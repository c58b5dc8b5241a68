// src/index/fixed.rs

use kiddo::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;

use super::{Neighbor, SpatialIndex, check_build_input, sort_neighbors};
use crate::cloud::{DIM_X, DIM_Y, DIM_Z, PointView};
use crate::error::AnalysisResult;

/// KD-Baum-Index über eine feste Anzahl von Dimensionen.
///
/// Die beiden Varianten [`Index2D`] (X, Y) und [`Index3D`] (X, Y, Z) teilen
/// sich diese Implementierung; die Dimensionsnamen liegen zur Bauzeit fest.
pub struct FixedIndex<const K: usize> {
    tree: ImmutableKdTree<f64, usize, K, 32>,
    coords: Vec<[f64; K]>,
}

/// Planarer Index über die Dimensionen X und Y.
pub type Index2D = FixedIndex<2>;

/// Räumlicher Index über die Dimensionen X, Y und Z.
pub type Index3D = FixedIndex<3>;

impl<const K: usize> FixedIndex<K> {
    fn from_dimensions(view: &dyn PointView, dimensions: [&str; K]) -> AnalysisResult<Self> {
        check_build_input(view, &dimensions)?;

        let coords: Vec<[f64; K]> = (0..view.count())
            .map(|id| std::array::from_fn(|d| view.value(dimensions[d], id)))
            .collect();
        let tree = ImmutableKdTree::new_from_slice(&coords);

        Ok(Self { tree, coords })
    }

    fn query_array<'a>(&self, query: &'a [f64]) -> &'a [f64; K] {
        query
            .try_into()
            .unwrap_or_else(|_| panic!("query has {} dimensions, index has {K}", query.len()))
    }
}

impl FixedIndex<2> {
    /// Baut den Index aus dem aktuellen Stand der Punktwolke auf.
    pub fn build(view: &dyn PointView) -> AnalysisResult<Self> {
        Self::from_dimensions(view, [DIM_X, DIM_Y])
    }
}

impl FixedIndex<3> {
    /// Baut den Index aus dem aktuellen Stand der Punktwolke auf.
    pub fn build(view: &dyn PointView) -> AnalysisResult<Self> {
        Self::from_dimensions(view, [DIM_X, DIM_Y, DIM_Z])
    }
}

impl<const K: usize> SpatialIndex for FixedIndex<K> {
    fn len(&self) -> usize {
        self.coords.len()
    }

    fn dimension_count(&self) -> usize {
        K
    }

    fn coordinates(&self, id: usize) -> &[f64] {
        &self.coords[id]
    }

    fn neighbor(&self, query: &[f64]) -> Option<usize> {
        if self.coords.is_empty() {
            return None;
        }
        let hit = self.tree.nearest_one::<SquaredEuclidean>(self.query_array(query));
        Some(hit.item)
    }

    fn knn(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let hits = self
            .tree
            .nearest_n::<SquaredEuclidean>(self.query_array(query), k)
            .into_iter()
            .map(|n| Neighbor::new(n.item, n.distance))
            .collect();
        sort_neighbors(hits)
    }

    fn radius(&self, query: &[f64], radius: f64) -> Vec<Neighbor> {
        // mit leicht geöffneter Schranke anfragen und exakt zurückfiltern,
        // damit Treffer auf dem Rand (insbesondere Abstand 0) unabhängig vom
        // Grenzverhalten des Baums enthalten sind
        let r_sq = radius * radius;
        let bound = if r_sq == 0.0 {
            f64::MIN_POSITIVE
        } else {
            r_sq * (1.0 + 1e-12)
        };
        let hits = self
            .tree
            .within::<SquaredEuclidean>(self.query_array(query), bound)
            .into_iter()
            .filter(|n| n.distance <= r_sq)
            .map(|n| Neighbor::new(n.item, n.distance))
            .collect();
        sort_neighbors(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MemoryCloud;

    fn unit_square() -> MemoryCloud {
        MemoryCloud::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
    }

    #[test]
    fn neighbor_finds_closest_corner() {
        let index = Index2D::build(&unit_square()).unwrap();
        assert_eq!(index.neighbor(&[0.9, 0.1]), Some(1));
        assert_eq!(index.neighbor(&[0.1, 0.9]), Some(3));
    }

    #[test]
    fn knn_orders_by_distance() {
        let index = Index2D::build(&unit_square()).unwrap();
        let hits = index.knn(&[0.1, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[1].id, 1);
        assert!(hits[0].distance_sq <= hits[1].distance_sq);
        assert!(hits[1].distance_sq <= hits[2].distance_sq);
    }

    #[test]
    fn radius_includes_member_at_query_position() {
        let index = Index2D::build(&unit_square()).unwrap();
        for r in [0.0, 0.5, 10.0] {
            let hits = index.radius(&[1.0, 1.0], r);
            assert!(
                hits.iter().any(|n| n.id == 2 && n.distance_sq == 0.0),
                "radius {r} must include the member at the query position"
            );
        }
    }

    #[test]
    fn radius_covers_whole_set_for_large_r() {
        let index = Index2D::build(&unit_square()).unwrap();
        let hits = index.radius(&[0.5, 0.5], 2.0);
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn index3d_uses_z() {
        let cloud = MemoryCloud::from_xyz(&[(0.0, 0.0, 0.0), (0.0, 0.0, 5.0)]);
        let index = Index3D::build(&cloud).unwrap();
        assert_eq!(index.neighbor(&[0.0, 0.0, 4.0]), Some(1));
        assert_eq!(index.dimension_count(), 3);
    }

    #[test]
    fn build_fails_on_empty_cloud() {
        let cloud = MemoryCloud::from_xy(&[]);
        assert!(Index2D::build(&cloud).is_err());
    }

    #[test]
    fn build_fails_without_z() {
        let cloud = MemoryCloud::from_xy(&[(0.0, 0.0)]);
        assert!(Index3D::build(&cloud).is_err());
    }
}
