use serde::{Deserialize, Serialize};

use crate::geometry::{scale_point, BBox, Point, Rect};
use crate::halfplane::{GeometryError, HalfPlane};

/// Planes whose closest ring vertex is farther away than this (in grid
/// units) no longer touch the hull and are purged after a slice.
pub const PLANE_TOUCH_EPS: f64 = 0.001;

/// Side length in grid units of one texture tile when an explicit tiling
/// scale is set.
pub const TEXTURE_GRID: f64 = 64.0;

/// Reference from a polygon to an entry in the document texture list.
///
/// A `scale` of 0 means the texture is stretched over the polygon's bounding
/// box; otherwise the UV rectangle tiles at `scale * TEXTURE_GRID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub index: u32,
    pub scale: u32,
}

/// A convex polygon: an ordered vertex ring, the minimal set of half-planes
/// that cut it out of its originating rectangle, and a cached tight bounding
/// box.
///
/// The three pieces always transform together; `slice`, `offset`, and `scale`
/// keep them mutually consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexPolygon {
    ring: Vec<Point>,
    planes: Vec<HalfPlane>,
    bbox: BBox,
    texture: Option<TextureRef>,
}

impl ConvexPolygon {
    /// A fresh polygon covering `rect`. The four rectangle edges stay
    /// implicit: the bounding box doubles as their containment test, so the
    /// plane set starts empty.
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            ring: rect.bbox().corners().to_vec(),
            planes: Vec::new(),
            bbox: rect.bbox(),
            texture: None,
        }
    }

    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    pub fn planes(&self) -> &[HalfPlane] {
        &self.planes
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn texture(&self) -> Option<TextureRef> {
        self.texture
    }

    pub fn set_texture(&mut self, texture: Option<TextureRef>) {
        self.texture = texture;
    }

    /// True once slicing has cut the whole ring away.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Cuts the polygon with `plane`, keeping its interior (positive) side:
    /// the plane joins the defining set, the ring is re-clipped, the bounding
    /// box recomputed, and planes that no longer touch the hull are purged.
    pub fn slice(&mut self, plane: HalfPlane) {
        self.planes.push(plane);
        self.ring = plane.clip(&self.ring);
        self.rebound();
        self.purge_planes();
    }

    /// The ring this polygon would have after `slice(plane)`, without
    /// mutating anything. Interactive tools preview a cut with this before
    /// committing it to the action log.
    pub fn impose_plane(&self, plane: &HalfPlane) -> Vec<Point> {
        plane.clip(&self.ring)
    }

    fn rebound(&mut self) {
        self.bbox = BBox::from_points(&self.ring)
            .unwrap_or_else(|| BBox::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0)));
    }

    /// Drops every plane with no ring vertex inside the epsilon touch band.
    fn purge_planes(&mut self) {
        let ring = &self.ring;
        self.planes.retain(|pl| {
            let band = PLANE_TOUCH_EPS * pl.normal_len();
            ring.iter().any(|p| pl.signed_distance(p).abs() <= band)
        });
    }

    /// Translates ring, planes, and bounding box together.
    pub fn offset(&mut self, delta: Point) {
        for p in &mut self.ring {
            *p = p.translate(delta.x, delta.y);
        }
        for pl in &mut self.planes {
            pl.offset(delta);
        }
        self.bbox = self.bbox.translate(delta.x, delta.y);
    }

    /// Scales ring, planes, and bounding box about `origin` by `num/den`.
    ///
    /// All-or-nothing: the scaled planes are computed up front, and a
    /// coefficient overflow leaves the polygon untouched.
    pub fn scale(&mut self, origin: Point, num: i64, den: i64) -> Result<(), GeometryError> {
        // A plane-free polygon would otherwise accept a mirroring factor.
        if num <= 0 || den <= 0 {
            return Err(GeometryError::InvalidScale { num, den });
        }
        let mut planes = self.planes.clone();
        for pl in &mut planes {
            pl.scale(origin, num, den)?;
        }
        for p in &mut self.ring {
            *p = scale_point(*p, origin, num, den);
        }
        self.planes = planes;
        self.bbox = BBox::new(
            scale_point(self.bbox.min, origin, num, den),
            scale_point(self.bbox.max, origin, num, den),
        );
        Ok(())
    }

    /// Strict interior test: the point must clear the bounding box and sit
    /// strictly on the positive side of every plane. Boundary points are
    /// excluded.
    pub fn contains(&self, p: &Point) -> bool {
        if self.ring.is_empty() || !self.bbox.strictly_contains(p) {
            return false;
        }
        self.planes.iter().all(|pl| pl.signed_distance(p) > 0.0)
    }

    /// Convex/rect intersection. The bounding-box test stands in for the
    /// rectangle's own four planes; after that any polygon plane with all
    /// four corners behind it separates the shapes.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let rb = rect.bbox();
        if self.ring.is_empty() || !self.bbox.intersects(&rb) {
            return false;
        }
        let corners = rb.corners();
        !self.planes.iter().any(|pl| pl.all_points_behind(&corners))
    }

    /// Convex/convex intersection via the two-sided separating-plane test:
    /// if any plane of either polygon has the other's whole ring behind it,
    /// the shapes are disjoint. Exploits convexity; never clips.
    pub fn intersects(&self, other: &ConvexPolygon) -> bool {
        if self.ring.is_empty() || other.ring.is_empty() {
            return false;
        }
        if !self.bbox.intersects(&other.bbox) {
            return false;
        }
        if self.planes.iter().any(|pl| pl.all_points_behind(&other.ring)) {
            return false;
        }
        if other.planes.iter().any(|pl| pl.all_points_behind(&self.ring)) {
            return false;
        }
        true
    }

    /// The UV rectangle for texturing: the bounding box by default, or a
    /// square of `scale * TEXTURE_GRID` when a tiling scale is set.
    pub fn uv_rect(&self) -> BBox {
        match self.texture {
            Some(t) if t.scale > 0 => {
                let side = t.scale as f64 * TEXTURE_GRID;
                BBox::new(Point::new(0.0, 0.0), Point::new(side, side))
            }
            _ => self.bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> ConvexPolygon {
        ConvexPolygon::from_rect(&Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    fn vertical_cut(x: f64) -> HalfPlane {
        // Left-is-interior plane through (x, 0)-(x, 100).
        HalfPlane::from_edge(Point::new(x, 0.0), Point::new(x, 100.0))
    }

    #[test]
    fn test_from_rect() {
        let p = square();
        assert_eq!(p.ring().len(), 4);
        assert!(p.planes().is_empty());
        assert_eq!(p.bbox().max, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_slice_keeps_left_half() {
        let mut p = square();
        p.slice(vertical_cut(50.0));
        assert_eq!(p.ring().len(), 4);
        for v in p.ring() {
            assert!(v.x <= 50.0);
        }
        assert_eq!(p.bbox().max.x, 50.0);
        assert_eq!(p.bbox().max.y, 100.0);
        assert_eq!(p.planes().len(), 1);
    }

    #[test]
    fn test_reslice_with_kept_plane_is_ring_noop() {
        let mut p = square();
        let cut = vertical_cut(50.0);
        p.slice(cut);
        let ring_before = p.ring().to_vec();
        p.slice(cut);
        assert_eq!(p.ring(), &ring_before[..]);
    }

    #[test]
    fn test_purge_drops_detached_planes() {
        let mut p = square();
        p.slice(vertical_cut(80.0));
        assert_eq!(p.planes().len(), 1);
        // A tighter cut pushes the x=80 plane off the hull.
        p.slice(vertical_cut(30.0));
        assert_eq!(p.planes().len(), 1);
        assert_eq!(p.bbox().max.x, 30.0);
    }

    #[test]
    fn test_slice_to_nothing() {
        let mut p = square();
        let mut cut = vertical_cut(50.0);
        cut.flip(); // keep the right half
        p.slice(cut);
        p.slice(vertical_cut(20.0)); // keep left of 20: nothing remains
        assert!(p.is_empty());
        assert!(p.planes().is_empty());
    }

    #[test]
    fn test_offset_roundtrip() {
        let mut p = square();
        p.slice(vertical_cut(50.0));
        let original = p.clone();
        p.offset(Point::new(10.0, -7.0));
        assert_ne!(p, original);
        p.offset(Point::new(-10.0, 7.0));
        assert_eq!(p, original);
    }

    #[test]
    fn test_scale_roundtrip() {
        let mut p = square();
        p.slice(vertical_cut(50.0));
        let original = p.clone();
        p.scale(Point::new(0.0, 0.0), 2, 1).unwrap();
        assert_eq!(p.bbox().max.x, 100.0);
        p.scale(Point::new(0.0, 0.0), 1, 2).unwrap();
        assert_eq!(p, original);
    }

    #[test]
    fn test_scale_overflow_leaves_polygon_untouched() {
        let mut p = square();
        p.slice(HalfPlane::new(i64::MAX, 0, 1));
        let before = p.clone();
        let r = p.scale(Point::new(0.0, 0.0), 1, 3);
        assert!(r.is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn test_scale_rejects_non_positive_factor_without_planes() {
        let mut p = square();
        assert_eq!(
            p.scale(Point::new(0.0, 0.0), -1, 1),
            Err(GeometryError::InvalidScale { num: -1, den: 1 })
        );
        assert_eq!(p, square());
    }

    #[test]
    fn test_contains_is_strict() {
        let mut p = square();
        p.slice(vertical_cut(50.0));
        assert!(p.contains(&Point::new(25.0, 50.0)));
        assert!(!p.contains(&Point::new(50.0, 50.0))); // on the cut
        assert!(!p.contains(&Point::new(0.0, 50.0))); // on the rect edge
        assert!(!p.contains(&Point::new(75.0, 50.0)));
    }

    #[test]
    fn test_intersects_rect() {
        // Keep the lower-left triangle under x + y = 100; its bbox still
        // covers the whole square, so the upper-right corner exercises the
        // separating-plane path rather than the bbox reject.
        let mut p = square();
        p.slice(HalfPlane::from_edge(
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        ));
        assert!(p.intersects_rect(&Rect::new(10.0, 10.0, 40.0, 40.0)));
        assert!(!p.intersects_rect(&Rect::new(70.0, 70.0, 90.0, 90.0)));
        // Outside the bbox entirely.
        assert!(!p.intersects_rect(&Rect::new(200.0, 0.0, 300.0, 50.0)));
    }

    #[test]
    fn test_intersects_polygon_symmetric() {
        let mut left = square();
        left.slice(vertical_cut(50.0));
        let mut right = square();
        let mut cut = vertical_cut(60.0);
        cut.flip();
        right.slice(cut); // keeps x >= 60
        assert!(!left.intersects(&right));
        assert!(!right.intersects(&left));

        let overlapping = ConvexPolygon::from_rect(&Rect::new(40.0, 40.0, 70.0, 70.0));
        assert!(left.intersects(&overlapping));
        assert!(overlapping.intersects(&left));

        // Overlapping bboxes, separated only by the diagonal plane.
        let mut triangle = square();
        triangle.slice(HalfPlane::from_edge(
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        ));
        let corner = ConvexPolygon::from_rect(&Rect::new(70.0, 70.0, 90.0, 90.0));
        assert!(!triangle.intersects(&corner));
        assert!(!corner.intersects(&triangle));
    }

    #[test]
    fn test_impose_plane_does_not_mutate() {
        let p = square();
        let preview = p.impose_plane(&vertical_cut(50.0));
        assert_eq!(preview.len(), 4);
        assert!(preview.iter().all(|v| v.x <= 50.0));
        assert_eq!(p.ring().len(), 4);
        assert!(p.planes().is_empty());
    }

    #[test]
    fn test_uv_rect() {
        let mut p = square();
        assert_eq!(p.uv_rect(), *p.bbox());
        p.set_texture(Some(TextureRef { index: 0, scale: 2 }));
        let uv = p.uv_rect();
        assert_eq!(uv.max.x, 2.0 * TEXTURE_GRID);
        p.set_texture(Some(TextureRef { index: 0, scale: 0 }));
        assert_eq!(p.uv_rect(), *p.bbox());
    }
}
