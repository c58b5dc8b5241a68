// src/hexgrid/path.rs

use std::fmt;

use geo::{Contains, Coord, LineString, MultiPolygon, Point as GeoPoint, Polygon};

use super::hexagon::{HEX_SIDES, HexCoord, HexMetric};
use crate::error::AnalysisError;
use crate::types::Point2D;

/// Eine gerichtete Hexkante: Zelle plus Seitenindex 0..6. Kein eigener
/// Besitz; Anfang und Ende werden bei Bedarf aus der Rastermetrik
/// berechnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub coord: HexCoord,
    pub side: usize,
}

impl Segment {
    pub fn new(coord: HexCoord, side: usize) -> Self {
        Self {
            coord,
            side: side % HEX_SIDES,
        }
    }

    pub fn start(&self, metric: &HexMetric) -> Point2D {
        metric.corner(self.coord, self.side)
    }

    pub fn end(&self, metric: &HexMetric) -> Point2D {
        metric.corner(self.coord, (self.side + 1) % HEX_SIDES)
    }
}

/// Umlaufsinn eines geschlossenen Rings: im Uhrzeigersinn für
/// Außenränder, gegen den Uhrzeigersinn für Löcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOrientation {
    Clockwise,
    CounterClockwise,
}

/// Ein geschlossener, orientierter Randpfad.
///
/// Der Pfad besitzt seine Kinder (Löcher eines Außenrands bzw. Inseln
/// eines Lochs); `parent` ist nur ein rückwärts gerichteter Verweis auf die
/// ID des umschließenden Pfads und verwaltet keine Lebensdauer.
#[derive(Debug, Clone)]
pub struct Path {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<Path>,
    segments: Vec<Segment>,
    vertices: Vec<Point2D>,
}

impl Path {
    /// Baut den Pfad aus einer geschlossenen Segmentfolge; der Vertexring
    /// wiederholt den ersten Punkt am Ende.
    pub(crate) fn from_segments(segments: Vec<Segment>, metric: &HexMetric) -> Self {
        let mut vertices: Vec<Point2D> = segments.iter().map(|s| s.start(metric)).collect();
        if let Some(&first) = vertices.first() {
            vertices.push(first);
        }
        Self {
            id: 0,
            parent: None,
            children: Vec::new(),
            segments,
            vertices,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Geschlossener Vertexring; erster und letzter Punkt sind identisch.
    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    /// Vorzeichenbehaftete Fläche (Shoelace, y-Achse nach oben): negativ im
    /// Uhrzeigersinn, positiv dagegen.
    pub fn signed_area(&self) -> f64 {
        let mut sum = 0.0;
        for pair in self.vertices.windows(2) {
            sum += pair[0].x * pair[1].y - pair[1].x * pair[0].y;
        }
        sum * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn orientation(&self) -> PathOrientation {
        if self.signed_area() < 0.0 {
            PathOrientation::Clockwise
        } else {
            PathOrientation::CounterClockwise
        }
    }

    /// Kehrt den Umlaufsinn um; der Ring bleibt geschlossen.
    pub(crate) fn reverse(&mut self) {
        self.vertices.reverse();
        self.segments.reverse();
    }

    pub fn contains_point(&self, point: Point2D) -> bool {
        self.to_geo_ring_polygon()
            .contains(&GeoPoint::new(point.x, point.y))
    }

    fn exterior_ring(&self) -> LineString<f64> {
        LineString::new(
            self.vertices
                .iter()
                .map(|v| Coord { x: v.x, y: v.y })
                .collect(),
        )
    }

    fn to_geo_ring_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.exterior_ring(), Vec::new())
    }

    /// Konvertiert den Pfad samt direkter Kinder in ein `geo`-Polygon
    /// (Kinder werden zu Innenringen). Tiefer verschachtelte Inseln gehören
    /// nicht hierher, siehe [`ShapeForest::to_multi_polygon`].
    pub fn to_geo(&self) -> Polygon<f64> {
        Polygon::new(
            self.exterior_ring(),
            self.children.iter().map(Path::exterior_ring).collect(),
        )
    }
}

/// Abgebrochene Randverfolgung einer einzelnen Form. Die übrigen Formen
/// des Rasters sind davon nicht betroffen.
#[derive(Debug)]
pub struct TraceFailure {
    pub root: Segment,
    pub error: AnalysisError,
}

/// Das Ergebnis einer vollständigen Randverfolgung: ein Wald aus
/// Außenpfaden mit ihren Löchern und Inseln, plus die fehlgeschlagenen
/// Einzelformen.
#[derive(Debug, Default)]
pub struct ShapeForest {
    /// Pfade der Verschachtelungstiefe 0, Kinder rekursiv darunter.
    pub paths: Vec<Path>,
    pub failures: Vec<TraceFailure>,
}

impl ShapeForest {
    /// Ordnet Eltern zu und normalisiert die Orientierung pro
    /// Verschachtelungstiefe (gerade Tiefe im Uhrzeigersinn, ungerade
    /// dagegen), dann wird der Besitzbaum von unten nach oben aufgebaut.
    pub(crate) fn assemble(mut paths: Vec<Path>, failures: Vec<TraceFailure>) -> Self {
        let n = paths.len();
        for (id, path) in paths.iter_mut().enumerate() {
            path.id = id;
        }

        // Enthaltensein über einen repräsentativen Vertex; Ringe
        // verschiedener Pfade teilen keine Geometrie
        let mut depth = vec![0usize; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut contained_in: Vec<Vec<usize>> = vec![Vec::new(); n];
        for inner in 0..n {
            let probe = paths[inner].vertices[0];
            for outer in 0..n {
                if inner != outer && paths[outer].contains_point(probe) {
                    contained_in[inner].push(outer);
                }
            }
            depth[inner] = contained_in[inner].len();
        }
        for inner in 0..n {
            parent[inner] = contained_in[inner]
                .iter()
                .copied()
                .find(|&outer| depth[outer] + 1 == depth[inner]);
        }

        for i in 0..n {
            let expected = if depth[i] % 2 == 0 {
                PathOrientation::Clockwise
            } else {
                PathOrientation::CounterClockwise
            };
            if paths[i].orientation() != expected {
                paths[i].reverse();
            }
            paths[i].parent = parent[i];
        }

        // Besitz von der tiefsten Ebene aufwärts einsammeln
        let max_depth = depth.iter().copied().max().unwrap_or(0);
        let mut slots: Vec<Option<Path>> = paths.into_iter().map(Some).collect();
        for level in (1..=max_depth).rev() {
            for i in 0..n {
                if depth[i] == level {
                    let child = slots[i].take().expect("child not yet collected");
                    let p = parent[i].expect("nested path has a parent");
                    slots[p].as_mut().expect("parent outlives child").children.push(child);
                }
            }
        }

        ShapeForest {
            paths: slots.into_iter().flatten().collect(),
            failures,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Alle Polygone in Ausgabereihenfolge: (Außenring, Lochringe). Inseln
    /// in Löchern werden als zusätzliche Top-Level-Polygone wieder
    /// ausgegeben, weil nachgelagerte Polygonformate keine
    /// Polygon-im-Loch-Verschachtelung ausdrücken können.
    fn flattened(&self) -> Vec<(&Path, &[Path])> {
        fn collect<'a>(path: &'a Path, out: &mut Vec<(&'a Path, &'a [Path])>) {
            out.push((path, path.children.as_slice()));
            for hole in &path.children {
                for island in &hole.children {
                    collect(island, out);
                }
            }
        }
        let mut out = Vec::new();
        for path in &self.paths {
            collect(path, &mut out);
        }
        out
    }

    /// Strukturierte Ausgabe als `geo::MultiPolygon`, Inseln bereits auf
    /// die oberste Ebene gehoben.
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(
            self.flattened()
                .into_iter()
                .map(|(outer, holes)| {
                    Polygon::new(
                        outer.exterior_ring(),
                        holes.iter().map(Path::exterior_ring).collect(),
                    )
                })
                .collect(),
        )
    }
}

/// Textform als geschachtelte Klammerdarstellung eines Multipolygons:
/// `(((x y, ...), (Lochring)), ((x y, ...)))`.
impl fmt::Display for ShapeForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_ring(f: &mut fmt::Formatter<'_>, path: &Path) -> fmt::Result {
            write!(f, "(")?;
            for (i, v) in path.vertices().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", v.x, v.y)?;
            }
            write!(f, ")")
        }

        write!(f, "(")?;
        for (i, (outer, holes)) in self.flattened().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            write_ring(f, outer)?;
            for hole in holes {
                write!(f, ", ")?;
                write_ring(f, hole)?;
            }
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}
