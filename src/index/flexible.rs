// src/index/flexible.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Neighbor, SpatialIndex, check_build_input, sort_neighbors};
use crate::cloud::PointView;
use crate::error::{AnalysisError, AnalysisResult};

/// Punkte pro Blattknoten. Kleine Buckets halten den Baum flach genug und
/// die Abstandsschleife cache-freundlich.
const LEAF_SIZE: usize = 16;

/// f64-Wrapper mit totaler Ordnung (total_cmp), damit Abstände in einem
/// BinaryHeap landen können.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Kandidat im k-NN-Heap; der Heap ist ein Max-Heap über (Abstand, ID),
/// an der Spitze steht also immer der schlechteste gehaltene Treffer.
#[derive(PartialEq, Eq)]
struct Candidate {
    distance_sq: OrdF64,
    id: usize,
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .cmp(&other.distance_sq)
            .then(self.id.cmp(&other.id))
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        ids: Vec<usize>,
    },
    Split {
        dimension: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

/// KD-Baum über eine zur Laufzeit gewählte, geordnete Dimensionsliste.
///
/// Wird z.B. für das Clustern über räumliche und Attribut-Dimensionen
/// zusammen verwendet ("X", "Y", "Intensity"). Die Knoten liegen in einer
/// Arena; Kindverweise sind Indizes, keine Zeiger. Gesplittet wird am Median
/// der Dimension mit der größten Spannweite.
#[derive(Debug)]
pub struct FlexibleIndex {
    dimensions: Vec<String>,
    coords: Vec<f64>,
    nodes: Vec<Node>,
    root: usize,
}

impl FlexibleIndex {
    /// Baut den Index über die angegebenen Dimensionen auf. Eine in der
    /// Wolke fehlende Dimension schlägt hier fehl, nicht erst bei der
    /// Anfrage.
    pub fn build(view: &dyn PointView, dimensions: &[&str]) -> AnalysisResult<Self> {
        if dimensions.is_empty() {
            return Err(AnalysisError::InvalidConfiguration {
                message: "dimension list must not be empty".to_string(),
            });
        }
        check_build_input(view, dimensions)?;

        let k = dimensions.len();
        let count = view.count();
        let mut coords = Vec::with_capacity(count * k);
        for id in 0..count {
            for name in dimensions {
                coords.push(view.value(name, id));
            }
        }

        let mut index = Self {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            coords,
            nodes: Vec::new(),
            root: 0,
        };
        let mut ids: Vec<usize> = (0..count).collect();
        index.root = index.build_node(&mut ids);
        Ok(index)
    }

    /// Die beim Aufbau verwendete Dimensionsliste, in Anfragereihenfolge.
    pub fn dimensions(&self) -> Vec<&str> {
        self.dimensions.iter().map(String::as_str).collect()
    }

    fn dims(&self) -> usize {
        self.dimensions.len()
    }

    fn coordinate(&self, id: usize, dimension: usize) -> f64 {
        self.coords[id * self.dims() + dimension]
    }

    fn distance_sq(&self, id: usize, query: &[f64]) -> f64 {
        let base = id * self.dims();
        query
            .iter()
            .zip(&self.coords[base..base + self.dims()])
            .map(|(q, c)| {
                let d = q - c;
                d * d
            })
            .sum()
    }

    fn build_node(&mut self, ids: &mut [usize]) -> usize {
        if ids.len() <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { ids: ids.to_vec() });
            return self.nodes.len() - 1;
        }

        // Dimension mit der größten Spannweite wählen
        let mut split_dimension = 0;
        let mut widest = f64::NEG_INFINITY;
        for d in 0..self.dims() {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &id in ids.iter() {
                let c = self.coordinate(id, d);
                min = min.min(c);
                max = max.max(c);
            }
            if max - min > widest {
                widest = max - min;
                split_dimension = d;
            }
        }

        let mid = ids.len() / 2;
        ids.select_nth_unstable_by(mid, |&a, &b| {
            self.coordinate(a, split_dimension)
                .total_cmp(&self.coordinate(b, split_dimension))
        });
        let value = self.coordinate(ids[mid], split_dimension);

        // Platzhalter reservieren, damit der Knoten vor seinen Kindern liegt
        self.nodes.push(Node::Leaf { ids: Vec::new() });
        let slot = self.nodes.len() - 1;
        let (lo, hi) = ids.split_at_mut(mid);
        let left = self.build_node(lo);
        let right = self.build_node(hi);
        self.nodes[slot] = Node::Split {
            dimension: split_dimension,
            value,
            left,
            right,
        };
        slot
    }

    fn knn_search(&self, node: usize, query: &[f64], k: usize, heap: &mut BinaryHeap<Candidate>) {
        match &self.nodes[node] {
            Node::Leaf { ids } => {
                for &id in ids {
                    let candidate = Candidate {
                        distance_sq: OrdF64(self.distance_sq(id, query)),
                        id,
                    };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if candidate < *heap.peek().expect("non-empty heap") {
                        heap.pop();
                        heap.push(candidate);
                    }
                }
            }
            Node::Split {
                dimension,
                value,
                left,
                right,
            } => {
                let diff = query[*dimension] - value;
                let (near, far) = if diff < 0.0 {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                self.knn_search(near, query, k, heap);
                let bound = if heap.len() < k {
                    f64::INFINITY
                } else {
                    heap.peek().expect("non-empty heap").distance_sq.0
                };
                if diff * diff <= bound {
                    self.knn_search(far, query, k, heap);
                }
            }
        }
    }

    fn radius_search(&self, node: usize, query: &[f64], radius_sq: f64, out: &mut Vec<Neighbor>) {
        match &self.nodes[node] {
            Node::Leaf { ids } => {
                for &id in ids {
                    let d = self.distance_sq(id, query);
                    if d <= radius_sq {
                        out.push(Neighbor::new(id, d));
                    }
                }
            }
            Node::Split {
                dimension,
                value,
                left,
                right,
            } => {
                let diff = query[*dimension] - value;
                if diff <= 0.0 || diff * diff <= radius_sq {
                    self.radius_search(*left, query, radius_sq, out);
                }
                if diff >= 0.0 || diff * diff <= radius_sq {
                    self.radius_search(*right, query, radius_sq, out);
                }
            }
        }
    }

    fn check_query(&self, query: &[f64]) {
        assert_eq!(
            query.len(),
            self.dims(),
            "query has {} dimensions, index has {}",
            query.len(),
            self.dims()
        );
    }
}

impl SpatialIndex for FlexibleIndex {
    fn len(&self) -> usize {
        self.coords.len() / self.dims()
    }

    fn dimension_count(&self) -> usize {
        self.dims()
    }

    fn coordinates(&self, id: usize) -> &[f64] {
        let base = id * self.dims();
        &self.coords[base..base + self.dims()]
    }

    fn neighbor(&self, query: &[f64]) -> Option<usize> {
        self.knn(query, 1).first().map(|n| n.id)
    }

    fn knn(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        self.check_query(query);
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_search(self.root, query, k, &mut heap);
        sort_neighbors(
            heap.into_iter()
                .map(|c| Neighbor::new(c.id, c.distance_sq.0))
                .collect(),
        )
    }

    fn radius(&self, query: &[f64], radius: f64) -> Vec<Neighbor> {
        self.check_query(query);
        let mut out = Vec::new();
        self.radius_search(self.root, query, radius * radius, &mut out);
        sort_neighbors(out)
    }
}
