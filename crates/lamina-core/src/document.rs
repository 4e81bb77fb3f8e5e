use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::{Action, ActionKind, ActionLog, Payload, ScaleFactor, WHOLE_LAYER};
use crate::dense::dense_remove;
use crate::geometry::{Point, Rect};
use crate::halfplane::{GeometryError, HalfPlane};
use crate::layer::{Layer, LayerColor};
use crate::polygon::{ConvexPolygon, TextureRef};
use crate::texture::TextureInfo;

/// The editing document: the polygon arena, its layers and textures, the
/// selection cursor, and the action log that is the single source of truth
/// for all of it.
///
/// Polygons are created and destroyed only by applying and un-applying log
/// records; the document never duplicates geometry outside the arena. All
/// operations are synchronous and run to completion — callers are expected
/// to persist and request a redraw after each mutation, in that order.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    polys: Vec<ConvexPolygon>,
    layers: Vec<Layer>,
    textures: Vec<TextureInfo>,
    log: ActionLog,
    selected_layer: Option<u32>,
    selected_polygon: Option<u32>,
    revision: u64,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            polys: Vec::new(),
            layers: Vec::new(),
            textures: Vec::new(),
            log: ActionLog::new(),
            selected_layer: None,
            selected_polygon: None,
            revision: 0,
        }
    }

    /// Rebuilds a document from a deserialized log and texture list by
    /// replaying every committed record (including `Layer` records) into an
    /// empty document.
    pub fn from_parts(name: &str, log: ActionLog, textures: Vec<TextureInfo>) -> Self {
        let mut doc = Document::new(name);
        doc.textures = textures;
        doc.log = log;
        for i in 0..doc.log.history() {
            if let Some(action) = doc.log.get(i) {
                doc.apply(&action);
            }
        }
        doc
    }

    // ── Read-only surface ────────────────────────────────────────────

    pub fn polygons(&self) -> &[ConvexPolygon] {
        &self.polys
    }

    pub fn polygon(&self, index: u32) -> Option<&ConvexPolygon> {
        self.polys.get(index as usize)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn visible_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.visible)
    }

    pub fn textures(&self) -> &[TextureInfo] {
        &self.textures
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Monotonic change counter. UI collaborators poll this instead of the
    /// core calling back into them.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected_layer(&self) -> Option<u32> {
        self.selected_layer
    }

    pub fn selected_polygon(&self) -> Option<u32> {
        self.selected_polygon
    }

    pub fn select_layer(&mut self, layer: Option<u32>) {
        self.selected_layer = layer.filter(|&l| (l as usize) < self.layers.len());
    }

    pub fn select_polygon(&mut self, polygon: Option<u32>) {
        self.selected_polygon = polygon.filter(|&p| (p as usize) < self.polys.len());
    }

    /// Hit test: the topmost polygon strictly containing `p`.
    pub fn pick(&self, p: &Point) -> Option<u32> {
        for layer in self.layers.iter().rev().filter(|l| l.visible) {
            for &pi in layer.polygons().iter().rev() {
                if let Some(poly) = self.polys.get(pi as usize) {
                    if poly.contains(p) {
                        return Some(pi);
                    }
                }
            }
        }
        None
    }

    /// The ring vertex nearest to `p` within `tolerance`, for snapping.
    pub fn closest_corner(&self, p: &Point, tolerance: f64) -> Option<Point> {
        let mut best: Option<(f64, Point)> = None;
        for poly in &self.polys {
            for v in poly.ring() {
                let d = p.distance_to(v);
                if d <= tolerance && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, *v));
                }
            }
        }
        best.map(|(_, v)| v)
    }

    /// Preview of slicing polygon `index` with `plane`, without mutating.
    pub fn impose_plane(&self, index: u32, plane: &HalfPlane) -> Option<Vec<Point>> {
        self.polys
            .get(index as usize)
            .map(|p| p.impose_plane(plane))
    }

    /// Registers a texture asset. Assets are persisted with the document but
    /// are not part of the action history.
    pub fn push_texture(&mut self, texture: TextureInfo) -> u32 {
        self.textures.push(texture);
        self.touch();
        (self.textures.len() - 1) as u32
    }

    // ── Mutating surface ─────────────────────────────────────────────

    pub fn add_layer(&mut self, color: LayerColor) {
        let action = Action {
            layer: self.layers.len() as u32,
            polygon: WHOLE_LAYER,
            payload: Payload::Layer(color),
        };
        self.log.clear_future();
        self.apply(&action);
        self.log.append(action);
        self.selected_layer = Some((self.layers.len() - 1) as u32);
        self.touch();
    }

    pub fn add_rect(&mut self, layer: u32, rect: Rect) {
        let action = Action {
            layer,
            polygon: self.polys.len() as u32,
            payload: Payload::Rect(rect),
        };
        self.log.clear_future();
        self.apply(&action);
        self.log.append(action);
        self.touch();
    }

    pub fn add_line(&mut self, layer: u32, polygon: u32, plane: HalfPlane) {
        let action = Action {
            layer,
            polygon,
            payload: Payload::Line(plane),
        };
        self.log.clear_future();
        self.apply(&action);
        self.log.append(action);
        self.touch();
    }

    /// Appends a move, folding it into an immediately preceding move of the
    /// same polygon. A sequence that sums to zero leaves no record at all.
    pub fn add_move(&mut self, layer: u32, polygon: u32, delta: Point) {
        self.log.clear_future();
        if let Some(back) = self.log.back() {
            if back.layer == layer && back.polygon == polygon {
                if let Payload::Move(prev) = back.payload {
                    if let Some(poly) = self.poly_mut(layer, polygon) {
                        poly.offset(delta);
                    }
                    let sum = Point::new(prev.x + delta.x, prev.y + delta.y);
                    if sum.x == 0.0 && sum.y == 0.0 {
                        self.log.pop_back();
                    } else {
                        self.log.update_back(&Action {
                            layer,
                            polygon,
                            payload: Payload::Move(sum),
                        });
                    }
                    self.touch();
                    return;
                }
            }
        }
        let action = Action {
            layer,
            polygon,
            payload: Payload::Move(delta),
        };
        self.apply(&action);
        self.log.append(action);
        self.touch();
    }

    /// Appends a rational scale, folding it into an immediately preceding
    /// scale of the same polygon about the same origin. A product that
    /// reduces to 1/1 leaves no record. Fails without touching the log if
    /// the polygon's planes would overflow.
    pub fn add_scale(
        &mut self,
        layer: u32,
        polygon: u32,
        factor: ScaleFactor,
    ) -> Result<(), GeometryError> {
        // Validated up front: a record targeting a missing polygon is still
        // appended, and it must not smuggle a non-positive factor into the log.
        if factor.num <= 0 || factor.den <= 0 {
            return Err(GeometryError::InvalidScale {
                num: factor.num,
                den: factor.den,
            });
        }
        self.log.clear_future();
        if let Some(back) = self.log.back() {
            if back.layer == layer && back.polygon == polygon {
                if let Payload::Scale(prev) = back.payload {
                    if prev.origin == factor.origin {
                        if let Some(combined) = combine_factors(&prev, &factor) {
                            if let Some(poly) = self.poly_mut(layer, polygon) {
                                poly.scale(factor.origin, factor.num, factor.den)?;
                            }
                            if combined.num == combined.den {
                                self.log.pop_back();
                            } else {
                                self.log.update_back(&Action {
                                    layer,
                                    polygon,
                                    payload: Payload::Scale(combined),
                                });
                            }
                            self.touch();
                            return Ok(());
                        }
                    }
                }
            }
        }
        if let Some(poly) = self.poly_mut(layer, polygon) {
            poly.scale(factor.origin, factor.num, factor.den)?;
        }
        self.log.append(Action {
            layer,
            polygon,
            payload: Payload::Scale(factor),
        });
        self.touch();
        Ok(())
    }

    /// Assigns a texture reference. A record identical to the preceding
    /// texture record for the same polygon is dropped outright, before the
    /// redo tail is touched.
    pub fn add_texture(&mut self, layer: u32, polygon: u32, texture: TextureRef) {
        if let Some(back) = self.log.back() {
            if back.layer == layer
                && back.polygon == polygon
                && back.payload == Payload::Texture(texture)
            {
                return;
            }
        }
        self.log.clear_future();
        let action = Action {
            layer,
            polygon,
            payload: Payload::Texture(texture),
        };
        self.apply(&action);
        self.log.append(action);
        self.touch();
    }

    /// Deletes one polygon, or every polygon of `layer` when `polygon` is
    /// [`WHOLE_LAYER`].
    pub fn add_delete(&mut self, layer: u32, polygon: u32) {
        let action = Action {
            layer,
            polygon,
            payload: Payload::Delete,
        };
        self.log.clear_future();
        self.apply(&action);
        self.log.append(action);
        self.touch();
    }

    /// Steps the history back one record and reverses its effect. Returns
    /// `false` with no state change at the beginning of history.
    pub fn undo(&mut self) -> bool {
        let Some(action) = self.log.undo() else {
            return false;
        };
        match action.payload {
            Payload::Move(d) => {
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    poly.offset(d.neg());
                }
            }
            Payload::Scale(f) => {
                // Exact reciprocal; the pre-scale coefficients were
                // representable, so this cannot overflow.
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    if let Err(e) = poly.scale(f.origin, f.den, f.num) {
                        log::warn!("undo scale failed: {e}");
                    }
                }
            }
            Payload::Rect(_) => {
                // The polygon created by this record is the newest arena
                // entry; nothing after it has been committed. A record whose
                // apply was a no-op (missing layer) stays a no-op here.
                if let Some(layer) = self.layers.get_mut(action.layer as usize) {
                    if let Some(last) = self.polys.len().checked_sub(1) {
                        if let Some(pos) = layer.polys.iter().position(|&p| p as usize == last) {
                            layer.polys.swap_remove(pos);
                        }
                        self.polys.pop();
                        self.selected_polygon = None;
                    }
                }
            }
            Payload::Layer(_) => {
                self.layers.pop();
                self.selected_layer = None;
                self.selected_polygon = None;
            }
            // Slicing, texturing, and deletion discard geometry that has no
            // cheap inverse; replay committed history instead. O(history) by
            // design.
            Payload::Line(_) | Payload::Texture(_) | Payload::Delete => self.reset_polys(),
        }
        self.touch();
        true
    }

    /// Re-applies the record at the cursor. Returns `false` with no state
    /// change when nothing is redoable.
    pub fn redo(&mut self) -> bool {
        let Some(action) = self.log.redo() else {
            return false;
        };
        self.apply(&action);
        self.touch();
        true
    }

    // ── Apply dispatch ───────────────────────────────────────────────

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Mutable polygon lookup with target validation: an out-of-range layer
    /// or polygon index makes the apply a silent no-op rather than an error,
    /// so one malformed record can never corrupt the rest of the document.
    fn poly_mut(&mut self, layer: u32, polygon: u32) -> Option<&mut ConvexPolygon> {
        if layer as usize >= self.layers.len() {
            log::debug!("action targets layer {layer} beyond {}", self.layers.len());
            return None;
        }
        let poly = self.polys.get_mut(polygon as usize);
        if poly.is_none() {
            log::debug!("action targets polygon {polygon} beyond arena");
        }
        poly
    }

    fn apply(&mut self, action: &Action) {
        match action.payload {
            Payload::Layer(color) => {
                self.layers.push(Layer::new(color));
            }
            Payload::Rect(rect) => {
                let Some(layer) = self.layers.get_mut(action.layer as usize) else {
                    log::debug!("rect action targets missing layer {}", action.layer);
                    return;
                };
                let index = self.polys.len() as u32;
                layer.polys.push(index);
                self.polys.push(ConvexPolygon::from_rect(&rect));
            }
            Payload::Line(plane) => {
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    poly.slice(plane);
                }
            }
            Payload::Move(delta) => {
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    poly.offset(delta);
                }
            }
            Payload::Scale(f) => {
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    // Committed scales re-applied during replay or redo
                    // succeeded once already.
                    if let Err(e) = poly.scale(f.origin, f.num, f.den) {
                        log::warn!("scale apply failed: {e}");
                    }
                }
            }
            Payload::Texture(t) => {
                if let Some(poly) = self.poly_mut(action.layer, action.polygon) {
                    poly.set_texture(Some(t));
                }
            }
            Payload::Delete => {
                if action.layer as usize >= self.layers.len() {
                    log::debug!("delete action targets missing layer {}", action.layer);
                    return;
                }
                if action.polygon == WHOLE_LAYER {
                    while let Some(&pi) = self.layers[action.layer as usize].polygons().first() {
                        self.remove_polygon(pi);
                    }
                } else {
                    self.remove_polygon(action.polygon);
                }
            }
        }
    }

    /// Removes one polygon from the arena with a swap-remove, rewriting any
    /// layer reference to the index that got reused.
    fn remove_polygon(&mut self, index: u32) {
        let slot = index as usize;
        if slot >= self.polys.len() {
            return;
        }
        for layer in &mut self.layers {
            if let Some(pos) = layer.polys.iter().position(|&p| p == index) {
                layer.polys.swap_remove(pos);
            }
        }
        if let Some(moved_from) = dense_remove(&mut self.polys, slot) {
            for layer in &mut self.layers {
                for p in &mut layer.polys {
                    if *p as usize == moved_from {
                        *p = index;
                    }
                }
            }
        }
        self.selected_polygon = None;
    }

    /// Rebuilds all polygons by replaying committed records from scratch.
    ///
    /// Layers persist across the rebuild, but each `Layer` record reinstates
    /// the surviving layer in turn rather than creating a fresh one: the
    /// layer count grows exactly as it did historically, so a record that
    /// once no-op'd against a then-missing layer no-ops again instead of
    /// materializing a phantom polygon. Replay is deterministic: arena
    /// indices evolve exactly as they did when the records were first
    /// applied.
    fn reset_polys(&mut self) {
        self.polys.clear();
        self.selected_polygon = None;
        let mut pending: VecDeque<Layer> = self.layers.drain(..).collect();
        for layer in &mut pending {
            layer.polys.clear();
        }
        for i in 0..self.log.history() {
            if let Some(action) = self.log.get(i) {
                if action.payload.kind() == ActionKind::Layer {
                    if let Some(layer) = pending.pop_front() {
                        self.layers.push(layer);
                    }
                } else {
                    self.apply(&action);
                }
            }
        }
        self.layers.extend(pending);
    }

    // ── Serialization (debug/export) ─────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Multiplies two rational scale factors and gcd-reduces the product.
/// `None` when the reduced product no longer fits `i64`, in which case the
/// records stay separate.
fn combine_factors(a: &ScaleFactor, b: &ScaleFactor) -> Option<ScaleFactor> {
    let mut num = a.num as i128 * b.num as i128;
    let mut den = a.den as i128 * b.den as i128;
    let mut x = num.abs();
    let mut y = den.abs();
    while y != 0 {
        let t = x % y;
        x = y;
        y = t;
    }
    if x > 1 {
        num /= x;
        den /= x;
    }
    Some(ScaleFactor {
        origin: a.origin,
        num: i64::try_from(num).ok()?,
        den: i64::try_from(den).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_square() -> Document {
        let mut doc = Document::new("test");
        doc.add_layer(LayerColor::default());
        doc.add_rect(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        doc
    }

    fn left_cut() -> HalfPlane {
        HalfPlane::from_edge(Point::new(50.0, 0.0), Point::new(50.0, 100.0))
    }

    #[test]
    fn test_rect_creates_polygon_in_layer() {
        let doc = doc_with_square();
        assert_eq!(doc.polygons().len(), 1);
        assert_eq!(doc.layers()[0].polygons(), &[0]);
        assert_eq!(doc.log().len(), 2); // layer + rect
    }

    #[test]
    fn test_slice_then_undo_restores_square() {
        let mut doc = doc_with_square();
        doc.add_line(0, 0, left_cut());
        assert_eq!(doc.polygon(0).unwrap().bbox().max.x, 50.0);

        assert!(doc.undo());
        let poly = doc.polygon(0).unwrap();
        assert_eq!(poly.bbox().max.x, 100.0);
        assert_eq!(poly.ring().len(), 4);
        assert!(poly.planes().is_empty());
    }

    #[test]
    fn test_move_coalescing_cancels_out() {
        let mut doc = doc_with_square();
        let len_before = doc.log().len();
        doc.add_move(0, 0, Point::new(10.0, 10.0));
        assert_eq!(doc.polygon(0).unwrap().bbox().min, Point::new(10.0, 10.0));
        doc.add_move(0, 0, Point::new(-10.0, -10.0));
        assert_eq!(doc.log().len(), len_before);
        assert_eq!(doc.log().moves().len(), 0);
        assert_eq!(doc.polygon(0).unwrap().bbox().min, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_move_coalescing_sums() {
        let mut doc = doc_with_square();
        doc.add_move(0, 0, Point::new(10.0, 0.0));
        doc.add_move(0, 0, Point::new(5.0, 3.0));
        assert_eq!(doc.log().moves(), &[Point::new(15.0, 3.0)]);
        assert_eq!(doc.polygon(0).unwrap().bbox().min, Point::new(15.0, 3.0));
        // Undo reverses the coalesced move in one step.
        assert!(doc.undo());
        assert_eq!(doc.polygon(0).unwrap().bbox().min, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_scale_coalescing_cancels_out() {
        let mut doc = doc_with_square();
        let origin = Point::new(0.0, 0.0);
        let len_before = doc.log().len();
        doc.add_scale(0, 0, ScaleFactor { origin, num: 2, den: 1 }).unwrap();
        doc.add_scale(0, 0, ScaleFactor { origin, num: 1, den: 2 }).unwrap();
        assert_eq!(doc.log().len(), len_before);
        assert_eq!(doc.log().scales().len(), 0);
        assert_eq!(doc.polygon(0).unwrap().bbox().max.x, 100.0);
    }

    #[test]
    fn test_scale_coalescing_multiplies() {
        let mut doc = doc_with_square();
        let origin = Point::new(0.0, 0.0);
        doc.add_scale(0, 0, ScaleFactor { origin, num: 2, den: 1 }).unwrap();
        doc.add_scale(0, 0, ScaleFactor { origin, num: 3, den: 2 }).unwrap();
        assert_eq!(doc.log().scales().len(), 1);
        let f = doc.log().scales()[0];
        assert_eq!((f.num, f.den), (3, 1));
        assert_eq!(doc.polygon(0).unwrap().bbox().max.x, 300.0);
    }

    #[test]
    fn test_texture_dedup() {
        let mut doc = doc_with_square();
        let t = TextureRef { index: 0, scale: 1 };
        doc.add_texture(0, 0, t);
        doc.add_texture(0, 0, t);
        assert_eq!(doc.log().textures().len(), 1);
        doc.add_texture(0, 0, TextureRef { index: 0, scale: 2 });
        assert_eq!(doc.log().textures().len(), 2);
    }

    #[test]
    fn test_append_after_undo_kills_redo() {
        let mut doc = doc_with_square();
        doc.add_line(0, 0, left_cut());
        assert!(doc.undo());
        assert!(doc.can_redo());
        doc.add_move(0, 0, Point::new(1.0, 0.0));
        assert!(!doc.can_redo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_delete_polygon_and_undo_rebuilds() {
        let mut doc = doc_with_square();
        doc.add_rect(0, Rect::new(200.0, 0.0, 300.0, 50.0));
        doc.add_delete(0, 0);
        assert_eq!(doc.polygons().len(), 1);
        // The swap-remove moved polygon 1 into slot 0; the layer list followed.
        assert_eq!(doc.layers()[0].polygons(), &[0]);
        assert_eq!(doc.polygon(0).unwrap().bbox().min.x, 200.0);

        assert!(doc.undo());
        assert_eq!(doc.polygons().len(), 2);
        assert_eq!(doc.polygon(0).unwrap().bbox().min.x, 0.0);
        assert_eq!(doc.polygon(1).unwrap().bbox().min.x, 200.0);
    }

    #[test]
    fn test_delete_whole_layer() {
        let mut doc = doc_with_square();
        doc.add_rect(0, Rect::new(200.0, 0.0, 300.0, 50.0));
        doc.add_delete(0, WHOLE_LAYER);
        assert!(doc.polygons().is_empty());
        assert!(doc.layers()[0].polygons().is_empty());
        assert_eq!(doc.layers().len(), 1);

        assert!(doc.undo());
        assert_eq!(doc.polygons().len(), 2);
    }

    #[test]
    fn test_undo_layer_clears_selection() {
        let mut doc = Document::new("test");
        doc.add_layer(LayerColor::default());
        assert_eq!(doc.selected_layer(), Some(0));
        assert!(doc.undo());
        assert!(doc.layers().is_empty());
        assert_eq!(doc.selected_layer(), None);
    }

    #[test]
    fn test_invalid_layer_target_is_noop() {
        let mut doc = doc_with_square();
        doc.add_line(9, 0, left_cut());
        // Record appended but the polygon is untouched.
        assert_eq!(doc.polygon(0).unwrap().planes().len(), 0);
        doc.add_rect(9, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(doc.polygons().len(), 1);
        // Undoing the no-op record must not pop an unrelated polygon.
        assert!(doc.undo());
        assert_eq!(doc.polygons().len(), 1);
    }

    #[test]
    fn test_rebuild_ignores_records_that_missed_their_layer() {
        let mut doc = doc_with_square();
        // Targets a layer that does not exist yet; this record is a no-op
        // and must stay one even after more layers appear.
        doc.add_rect(5, Rect::new(0.0, 0.0, 10.0, 10.0));
        for _ in 0..5 {
            doc.add_layer(LayerColor::default());
        }
        assert_eq!(doc.polygons().len(), 1);

        doc.add_line(0, 0, left_cut());
        assert!(doc.undo()); // full rebuild
        assert_eq!(doc.polygons().len(), 1);
        assert_eq!(doc.layers().len(), 6);
        assert_eq!(doc.layers()[0].polygons(), &[0]);
    }

    #[test]
    fn test_duplicate_texture_preserves_redo_tail() {
        let mut doc = doc_with_square();
        let t = TextureRef { index: 0, scale: 1 };
        doc.add_texture(0, 0, t);
        doc.add_line(0, 0, left_cut());
        assert!(doc.undo());
        assert!(doc.can_redo());

        // Identical to the committed back record: dropped without touching
        // the redo tail.
        doc.add_texture(0, 0, t);
        assert!(doc.can_redo());
        assert_eq!(doc.log().textures().len(), 1);
        assert!(doc.redo());
        assert_eq!(doc.polygon(0).unwrap().planes().len(), 1);
    }

    #[test]
    fn test_add_scale_rejects_invalid_factor_without_target() {
        let mut doc = doc_with_square();
        let err = doc
            .add_scale(
                0,
                99,
                ScaleFactor {
                    origin: Point::new(0.0, 0.0),
                    num: -1,
                    den: 1,
                },
            )
            .unwrap_err();
        assert_eq!(err, GeometryError::InvalidScale { num: -1, den: 1 });
        assert_eq!(doc.log().scales().len(), 0);
    }

    #[test]
    fn test_undo_texture_rebuilds() {
        let mut doc = doc_with_square();
        doc.add_texture(0, 0, TextureRef { index: 2, scale: 0 });
        assert!(doc.polygon(0).unwrap().texture().is_some());
        assert!(doc.undo());
        assert!(doc.polygon(0).unwrap().texture().is_none());
    }

    #[test]
    fn test_full_undo_redo_cycle() {
        let mut doc = doc_with_square();
        doc.add_line(0, 0, left_cut());
        doc.add_move(0, 0, Point::new(10.0, 0.0));
        let state = doc.polygon(0).unwrap().clone();

        assert!(doc.undo());
        assert!(doc.undo());
        assert_eq!(doc.polygon(0).unwrap().bbox().max.x, 100.0);

        assert!(doc.redo());
        assert!(doc.redo());
        assert_eq!(doc.polygon(0).unwrap(), &state);
        assert!(!doc.redo());
    }

    #[test]
    fn test_pick_and_closest_corner() {
        let mut doc = doc_with_square();
        doc.add_line(0, 0, left_cut());
        assert_eq!(doc.pick(&Point::new(25.0, 50.0)), Some(0));
        assert_eq!(doc.pick(&Point::new(75.0, 50.0)), None);

        let corner = doc.closest_corner(&Point::new(51.0, 99.0), 5.0).unwrap();
        assert_eq!(corner, Point::new(50.0, 100.0));
        assert!(doc.closest_corner(&Point::new(25.0, 25.0), 5.0).is_none());
    }

    #[test]
    fn test_revision_advances() {
        let mut doc = Document::new("test");
        let r0 = doc.revision();
        doc.add_layer(LayerColor::default());
        assert!(doc.revision() > r0);
    }

    #[test]
    fn test_from_parts_replays_layers_and_polys() {
        let mut doc = doc_with_square();
        doc.add_line(0, 0, left_cut());
        let log = doc.log().clone();

        let rebuilt = Document::from_parts("loaded", log, vec![]);
        assert_eq!(rebuilt.layers().len(), 1);
        assert_eq!(rebuilt.polygons().len(), 1);
        assert_eq!(rebuilt.polygon(0).unwrap(), doc.polygon(0).unwrap());
    }
}
