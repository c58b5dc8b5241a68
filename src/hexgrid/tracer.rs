// src/hexgrid/tracer.rs

use std::collections::HashSet;

use log::{info, warn};

use super::grid::HexGrid;
use super::hexagon::{HEX_SIDES, HexCoord};
use super::path::{Path, Segment, ShapeForest, TraceFailure};
use crate::error::{AnalysisError, AnalysisResult};

impl HexGrid {
    /// Klassifiziert das Raster und verfolgt alle Ränder der dichten
    /// Flächen. Liefert den fertigen Pfadwald (Außenränder im
    /// Uhrzeigersinn, Löcher dagegen, Inseln wieder im Uhrzeigersinn)
    /// zusammen mit eventuell abgebrochenen Einzelformen.
    pub fn find_shapes(&mut self) -> ShapeForest {
        self.classify();

        // Mögliche Wurzeln: dichte Zellen ohne dichten Nachbarn an der
        // Oberkante. Das deckt Außenränder und Löcher gleichermaßen ab,
        // denn unter jedem Loch liegt eine dichte Zelle, deren Oberkante
        // zum Lochrand gehört. Sortiert für deterministische Pfad-IDs.
        let mut roots: Vec<HexCoord> = self
            .cells()
            .filter(|cell| cell.dense && !cell.neighbor_dense(0))
            .map(|cell| cell.coord)
            .collect();
        roots.sort_by_key(|c| (c.col, c.row));

        let mut visited: HashSet<(u64, usize)> = HashSet::new();
        let mut paths = Vec::new();
        let mut failures = Vec::new();
        for root in roots {
            if visited.contains(&(root.key(), 0)) {
                // Rand wurde bereits von einer früheren Wurzel verfolgt
                continue;
            }
            let start = Segment::new(root, 0);
            match self.trace_boundary(start, &mut visited) {
                Ok(path) => paths.push(path),
                Err(error) => {
                    warn!("boundary trace aborted: {error}");
                    failures.push(TraceFailure { root: start, error });
                }
            }
        }

        info!(
            "hex boundary tracing: {} paths, {} failures over {} cells",
            paths.len(),
            failures.len(),
            self.len()
        );
        ShapeForest::assemble(paths, failures)
    }

    /// Verfolgt einen einzelnen Rand, bis der Lauf zum Startsegment
    /// zurückkehrt. Die Schrittschranke fängt nicht schließende Läufe
    /// (Rasterkorruption) ab, statt endlos zu laufen; mehr Segmente als
    /// gerichtete Zellkanten kann ein Rand nicht haben.
    fn trace_boundary(
        &self,
        start: Segment,
        visited: &mut HashSet<(u64, usize)>,
    ) -> AnalysisResult<Path> {
        let limit = self.len() * HEX_SIDES + HEX_SIDES;
        let mut segments = Vec::new();
        let mut current = start;
        loop {
            if segments.len() >= limit {
                return Err(AnalysisError::TraceDiverged {
                    col: start.coord.col,
                    row: start.coord.row,
                    side: start.side,
                    steps: segments.len(),
                });
            }
            visited.insert((current.coord.key(), current.side));
            segments.push(current);
            current = self.next_segment(current);
            if current == start {
                break;
            }
        }
        Ok(Path::from_segments(segments, &self.metric))
    }

    /// Folgeschritt der Randverfolgung. An jedem Gitterpunkt treffen sich
    /// genau drei Zellen; es gibt daher nur zwei Kandidaten: auf derselben
    /// Zelle weiterdrehen oder auf den dichten Nachbarn übergehen, dessen
    /// Kante an dieselbe freie Zelle grenzt.
    fn next_segment(&self, segment: Segment) -> Segment {
        let turn = (segment.side + 1) % HEX_SIDES;
        let neighbor = segment.coord.neighbor(turn);
        if self.is_dense(neighbor) {
            Segment::new(neighbor, (segment.side + HEX_SIDES - 1) % HEX_SIDES)
        } else {
            Segment::new(segment.coord, turn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexgrid::hexagon::SQRT_3;
    use crate::hexgrid::path::PathOrientation;

    /// Baut ein Raster (Zellhöhe 1, dense_limit 1) mit genau den
    /// angegebenen dichten Zellen, indem pro Zelle ein Punkt auf den
    /// Mittelpunkt gelegt wird.
    fn grid_from_cells(coords: &[HexCoord]) -> HexGrid {
        let mut grid = HexGrid::with_height(1.0, 1).unwrap();
        let metric = *grid.metric();
        for &coord in coords {
            let center = metric.center(coord);
            grid.add_point(center.x, center.y);
        }
        grid
    }

    fn block(cols: std::ops::RangeInclusive<i32>, rows: std::ops::RangeInclusive<i32>) -> Vec<HexCoord> {
        let mut cells = Vec::new();
        for col in cols {
            for row in rows.clone() {
                cells.push(HexCoord::new(col, row));
            }
        }
        cells
    }

    #[test]
    fn single_cell_traces_its_six_edges() {
        let mut grid = grid_from_cells(&[HexCoord::new(0, 0)]);
        let forest = grid.find_shapes();
        assert_eq!(forest.len(), 1);
        assert!(forest.failures.is_empty());
        let path = &forest.paths[0];
        assert_eq!(path.segments().len(), 6);
        assert_eq!(path.orientation(), PathOrientation::Clockwise);
        assert_eq!(path.vertices().first(), path.vertices().last());
    }

    #[test]
    fn filled_block_yields_one_closed_outer_path() {
        let mut grid = grid_from_cells(&block(0..=5, 0..=5));
        let forest = grid.find_shapes();
        assert_eq!(forest.len(), 1);
        assert!(forest.failures.is_empty());
        let path = &forest.paths[0];
        assert!(path.children.is_empty());
        assert_eq!(path.orientation(), PathOrientation::Clockwise);
        assert_eq!(path.vertices().first(), path.vertices().last());
        // Fläche der Umrandung = Zellanzahl mal Zellfläche
        let cell_area = SQRT_3 / 2.0;
        assert!((path.area() - 36.0 * cell_area).abs() < 1e-9);
    }

    #[test]
    fn annulus_yields_outer_path_with_one_hole() {
        let cells: Vec<HexCoord> = block(0..=6, 0..=6)
            .into_iter()
            .filter(|c| !((2..=4).contains(&c.col) && (2..=4).contains(&c.row)))
            .collect();
        let mut grid = grid_from_cells(&cells);
        let forest = grid.find_shapes();
        assert!(forest.failures.is_empty());
        assert_eq!(forest.len(), 1);
        let outer = &forest.paths[0];
        assert_eq!(outer.orientation(), PathOrientation::Clockwise);
        assert_eq!(outer.children.len(), 1);
        let hole = &outer.children[0];
        assert_eq!(hole.orientation(), PathOrientation::CounterClockwise);
        assert_eq!(hole.parent, Some(outer.id));
        assert!(hole.children.is_empty());
        assert!(hole.area() < outer.area());
    }

    #[test]
    fn island_inside_hole_is_flattened_to_top_level() {
        let center = HexCoord::new(5, 5);
        let mut moat: HashSet<HexCoord> = HashSet::new();
        for side in 0..HEX_SIDES {
            let ring1 = center.neighbor(side);
            moat.insert(ring1);
            for inner in 0..HEX_SIDES {
                let ring2 = ring1.neighbor(inner);
                if ring2 != center {
                    moat.insert(ring2);
                }
            }
        }
        let cells: Vec<HexCoord> = block(0..=10, 0..=10)
            .into_iter()
            .filter(|c| !moat.contains(c))
            .collect();
        let mut grid = grid_from_cells(&cells);
        let forest = grid.find_shapes();
        assert!(forest.failures.is_empty());

        // Wald: Außenrand -> Loch (Burggraben) -> Insel
        assert_eq!(forest.len(), 1);
        let outer = &forest.paths[0];
        assert_eq!(outer.children.len(), 1);
        let hole = &outer.children[0];
        assert_eq!(hole.children.len(), 1);
        let island = &hole.children[0];
        assert_eq!(island.orientation(), PathOrientation::Clockwise);
        assert_eq!(island.parent, Some(hole.id));
        assert_eq!(island.segments().len(), 6);

        // Abgeflachte Ausgabe: die Insel wird als eigenes
        // Top-Level-Polygon wieder ausgegeben
        let multi = forest.to_multi_polygon();
        assert_eq!(multi.0.len(), 2);
        assert_eq!(multi.0[0].interiors().len(), 1);
        assert!(multi.0[1].interiors().is_empty());
    }

    #[test]
    fn two_separate_blobs_yield_two_top_level_paths() {
        let mut cells = block(0..=2, 0..=2);
        cells.extend(block(10..=12, 0..=2));
        let mut grid = grid_from_cells(&cells);
        let forest = grid.find_shapes();
        assert_eq!(forest.len(), 2);
        for path in &forest.paths {
            assert!(path.parent.is_none());
            assert!(path.children.is_empty());
            assert_eq!(path.orientation(), PathOrientation::Clockwise);
        }
    }

    #[test]
    fn unit_square_fill_traces_an_area_near_one_hundred() {
        // 10x10-Quadrat gleichmäßig gefüllt, Zellhöhe 1, dense_limit 1
        let mut grid = HexGrid::with_height(1.0, 1).unwrap();
        let steps = 40;
        for i in 0..=steps {
            for j in 0..=steps {
                grid.add_point(10.0 * f64::from(i) / f64::from(steps), 10.0 * f64::from(j) / f64::from(steps));
            }
        }
        let cell_count = grid.len();
        let forest = grid.find_shapes();
        assert!(forest.failures.is_empty());
        assert_eq!(forest.len(), 1);
        let path = &forest.paths[0];
        assert!(path.children.is_empty());
        assert_eq!(path.vertices().first(), path.vertices().last());

        // Die Umrandung umschließt genau die Zellvereinigung ...
        let cell_area = SQRT_3 / 2.0;
        assert!((path.area() - cell_count as f64 * cell_area).abs() < 1e-6);
        // ... und liegt innerhalb der Diskretisierungstoleranz am Quadrat
        // (Randzellen stehen bis zu einer Zellbreite über)
        assert!(path.area() > 95.0 && path.area() < 130.0, "area {}", path.area());
    }
}
