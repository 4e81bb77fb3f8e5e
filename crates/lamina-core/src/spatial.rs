use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};

use crate::document::Document;
use crate::geometry::{BBox, Point};

/// An entry in the R-tree, referencing a polygon by its arena index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub polygon_index: u32,
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

impl PointDistance for SpatialEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().distance_2(point)
    }
}

/// Spatial index over polygon bounding boxes: candidate lookup for hit
/// tests and viewport culling for the drawing collaborator. Rebuilt by the
/// caller whenever the document revision changes.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load from a list of entries.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index every non-empty polygon in the document.
    pub fn from_document(doc: &Document) -> Self {
        let entries = doc
            .polygons()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .map(|(i, p)| SpatialEntry {
                polygon_index: i as u32,
                bbox: *p.bbox(),
            })
            .collect();
        Self::build(entries)
    }

    /// All entries whose bounding box contains the given point. Candidates
    /// only; callers refine with `ConvexPolygon::contains`.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry> {
        self.tree.locate_all_at_point(&[point.x, point.y]).collect()
    }

    /// All entries intersecting the viewport bounding box.
    pub fn query_viewport(&self, viewport: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Indexed hit test: bbox candidates from the tree, refined with the
    /// exact containment test and resolved in the document's top-down layer
    /// order, so the result matches a linear scan.
    pub fn pick(&self, doc: &Document, p: &Point) -> Option<u32> {
        let candidates: Vec<u32> = self
            .query_point(p)
            .into_iter()
            .map(|e| e.polygon_index)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        for layer in doc.layers().iter().rev().filter(|l| l.visible) {
            for &pi in layer.polygons().iter().rev() {
                if !candidates.contains(&pi) {
                    continue;
                }
                if let Some(poly) = doc.polygon(pi) {
                    if poly.contains(p) {
                        return Some(pi);
                    }
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
