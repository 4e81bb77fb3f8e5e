use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dense::dense_remove;
use crate::geometry::{Point, Rect};
use crate::halfplane::HalfPlane;
use crate::layer::LayerColor;
use crate::polygon::TextureRef;

/// Polygon-index sentinel meaning "the whole layer" in delete records.
pub const WHOLE_LAYER: u32 = u32::MAX;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error("index entry {position} references slot {slot} beyond its bucket (len {len})")]
    InvalidSlot {
        position: usize,
        slot: u32,
        len: usize,
    },

    #[error("history cursor {history} exceeds log length {len}")]
    HistoryOutOfRange { history: usize, len: usize },
}

/// Discriminant of an action record, in its on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Rect,
    Line,
    Move,
    Scale,
    Texture,
    Delete,
    Layer,
}

impl ActionKind {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(v: u32) -> Option<ActionKind> {
        match v {
            0 => Some(ActionKind::Rect),
            1 => Some(ActionKind::Line),
            2 => Some(ActionKind::Move),
            3 => Some(ActionKind::Scale),
            4 => Some(ActionKind::Texture),
            5 => Some(ActionKind::Delete),
            6 => Some(ActionKind::Layer),
            _ => None,
        }
    }
}

/// Rational scale payload: factor `num/den` about `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactor {
    pub origin: Point,
    pub num: i64,
    pub den: i64,
}

/// The payload of one edit, as an explicit sum type: an invalid-kind access
/// is a compile error, never a runtime contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Rect(Rect),
    Line(HalfPlane),
    Move(Point),
    Scale(ScaleFactor),
    Texture(TextureRef),
    Delete,
    Layer(LayerColor),
}

impl Payload {
    pub fn kind(&self) -> ActionKind {
        match self {
            Payload::Rect(_) => ActionKind::Rect,
            Payload::Line(_) => ActionKind::Line,
            Payload::Move(_) => ActionKind::Move,
            Payload::Scale(_) => ActionKind::Scale,
            Payload::Texture(_) => ActionKind::Texture,
            Payload::Delete => ActionKind::Delete,
            Payload::Layer(_) => ActionKind::Layer,
        }
    }
}

/// One edit: a payload plus its target layer and polygon
/// (or [`WHOLE_LAYER`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub layer: u32,
    pub polygon: u32,
    pub payload: Payload,
}

/// Position of one record in the log: its kind, the slot in that kind's
/// payload bucket, and its targets. For `Delete` the slot is unused and for
/// `Layer` it carries the packed color, since neither kind has a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub kind: ActionKind,
    pub slot: u32,
    pub polygon: u32,
    pub layer: u32,
}

/// The append-only edit journal: one payload bucket per record kind, a
/// single ordered index array, and the history cursor splitting committed
/// (`< history`) from redoable (`>= history`) entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    rects: Vec<Rect>,
    lines: Vec<HalfPlane>,
    moves: Vec<Point>,
    scales: Vec<ScaleFactor>,
    textures: Vec<TextureRef>,
    index: Vec<IndexEntry>,
    history: usize,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reassembles a log from its serialized parts, validating every slot
    /// reference and the history cursor.
    pub fn from_parts(
        rects: Vec<Rect>,
        lines: Vec<HalfPlane>,
        moves: Vec<Point>,
        scales: Vec<ScaleFactor>,
        textures: Vec<TextureRef>,
        index: Vec<IndexEntry>,
        history: usize,
    ) -> Result<Self, LogError> {
        if history > index.len() {
            return Err(LogError::HistoryOutOfRange {
                history,
                len: index.len(),
            });
        }
        for (position, entry) in index.iter().enumerate() {
            let len = match entry.kind {
                ActionKind::Rect => rects.len(),
                ActionKind::Line => lines.len(),
                ActionKind::Move => moves.len(),
                ActionKind::Scale => scales.len(),
                ActionKind::Texture => textures.len(),
                // No bucket: Delete ignores the slot, Layer packs its color there.
                ActionKind::Delete | ActionKind::Layer => continue,
            };
            if entry.slot as usize >= len {
                return Err(LogError::InvalidSlot {
                    position,
                    slot: entry.slot,
                    len,
                });
            }
        }
        Ok(Self {
            rects,
            lines,
            moves,
            scales,
            textures,
            index,
            history,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn history(&self) -> usize {
        self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history < self.index.len()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn lines(&self) -> &[HalfPlane] {
        &self.lines
    }

    pub fn moves(&self) -> &[Point] {
        &self.moves
    }

    pub fn scales(&self) -> &[ScaleFactor] {
        &self.scales
    }

    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    fn payload_at(&self, kind: ActionKind, slot: u32) -> Option<Payload> {
        match kind {
            ActionKind::Rect => self.rects.get(slot as usize).copied().map(Payload::Rect),
            ActionKind::Line => self.lines.get(slot as usize).copied().map(Payload::Line),
            ActionKind::Move => self.moves.get(slot as usize).copied().map(Payload::Move),
            ActionKind::Scale => self.scales.get(slot as usize).copied().map(Payload::Scale),
            ActionKind::Texture => self
                .textures
                .get(slot as usize)
                .copied()
                .map(Payload::Texture),
            ActionKind::Delete => Some(Payload::Delete),
            ActionKind::Layer => Some(Payload::Layer(LayerColor::unpack(slot))),
        }
    }

    /// The record at sequence position `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<Action> {
        let entry = self.index.get(i)?;
        Some(Action {
            layer: entry.layer,
            polygon: entry.polygon,
            payload: self.payload_at(entry.kind, entry.slot)?,
        })
    }

    /// The most recently committed record, the coalescing candidate.
    pub fn back(&self) -> Option<Action> {
        if self.history == 0 {
            return None;
        }
        self.get(self.history - 1)
    }

    /// Appends a record, discarding any redoable entries first. Redo
    /// branches are never preserved.
    pub fn append(&mut self, action: Action) {
        self.clear_future();
        let slot = match action.payload {
            Payload::Rect(r) => {
                self.rects.push(r);
                (self.rects.len() - 1) as u32
            }
            Payload::Line(pl) => {
                self.lines.push(pl);
                (self.lines.len() - 1) as u32
            }
            Payload::Move(d) => {
                self.moves.push(d);
                (self.moves.len() - 1) as u32
            }
            Payload::Scale(f) => {
                self.scales.push(f);
                (self.scales.len() - 1) as u32
            }
            Payload::Texture(t) => {
                self.textures.push(t);
                (self.textures.len() - 1) as u32
            }
            Payload::Delete => 0,
            Payload::Layer(c) => c.pack(),
        };
        self.index.push(IndexEntry {
            kind: action.payload.kind(),
            slot,
            polygon: action.polygon,
            layer: action.layer,
        });
        self.history = self.index.len();
    }

    /// Pops every entry at or after the history cursor.
    pub fn clear_future(&mut self) {
        while self.index.len() > self.history {
            self.pop_back();
        }
    }

    /// Removes the last record and returns it.
    ///
    /// The backing payload is removed with a swap-remove; index entries that
    /// referenced the bucket's old last slot are rewritten to the reused
    /// slot, so the index array never goes stale.
    pub fn pop_back(&mut self) -> Option<Action> {
        let entry = *self.index.last()?;
        let payload = self.payload_at(entry.kind, entry.slot)?;
        self.index.pop();
        match entry.kind {
            ActionKind::Rect => Self::bucket_remove(&mut self.rects, &mut self.index, entry),
            ActionKind::Line => Self::bucket_remove(&mut self.lines, &mut self.index, entry),
            ActionKind::Move => Self::bucket_remove(&mut self.moves, &mut self.index, entry),
            ActionKind::Scale => Self::bucket_remove(&mut self.scales, &mut self.index, entry),
            ActionKind::Texture => Self::bucket_remove(&mut self.textures, &mut self.index, entry),
            ActionKind::Delete | ActionKind::Layer => {}
        }
        self.history = self.history.min(self.index.len());
        Some(Action {
            layer: entry.layer,
            polygon: entry.polygon,
            payload,
        })
    }

    fn bucket_remove<T>(bucket: &mut Vec<T>, index: &mut [IndexEntry], entry: IndexEntry) {
        if entry.slot as usize >= bucket.len() {
            return;
        }
        if let Some(moved_from) = dense_remove(bucket, entry.slot as usize) {
            for e in index.iter_mut() {
                if e.kind == entry.kind && e.slot as usize == moved_from {
                    e.slot = entry.slot;
                }
            }
        }
    }

    /// Overwrites the payload of the back record in place, for coalescing.
    /// The new record must match the back entry's kind and targets; on a
    /// mismatch nothing changes and `false` is returned.
    pub fn update_back(&mut self, action: &Action) -> bool {
        let Some(entry) = self.index.last().copied() else {
            return false;
        };
        let matches = entry.kind == action.payload.kind()
            && entry.polygon == action.polygon
            && entry.layer == action.layer;
        if !matches {
            return false;
        }
        let slot = entry.slot as usize;
        match action.payload {
            Payload::Rect(r) => {
                if let Some(p) = self.rects.get_mut(slot) {
                    *p = r;
                }
            }
            Payload::Line(pl) => {
                if let Some(p) = self.lines.get_mut(slot) {
                    *p = pl;
                }
            }
            Payload::Move(d) => {
                if let Some(p) = self.moves.get_mut(slot) {
                    *p = d;
                }
            }
            Payload::Scale(f) => {
                if let Some(p) = self.scales.get_mut(slot) {
                    *p = f;
                }
            }
            Payload::Texture(t) => {
                if let Some(p) = self.textures.get_mut(slot) {
                    *p = t;
                }
            }
            Payload::Delete => {}
            Payload::Layer(c) => {
                if let Some(e) = self.index.last_mut() {
                    e.slot = c.pack();
                }
            }
        }
        true
    }

    /// Steps the cursor back and returns the record now at the cursor, whose
    /// inverse the caller must apply. `None` at position zero.
    pub fn undo(&mut self) -> Option<Action> {
        if self.history == 0 {
            return None;
        }
        self.history -= 1;
        self.get(self.history)
    }

    /// Returns the record at the cursor and steps it forward. `None` when
    /// nothing is redoable.
    pub fn redo(&mut self) -> Option<Action> {
        if self.history == self.index.len() {
            return None;
        }
        let action = self.get(self.history);
        self.history += 1;
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_action(polygon: u32, dx: f64, dy: f64) -> Action {
        Action {
            layer: 0,
            polygon,
            payload: Payload::Move(Point::new(dx, dy)),
        }
    }

    #[test]
    fn test_append_and_get() {
        let mut log = ActionLog::new();
        log.append(move_action(0, 5.0, 0.0));
        log.append(Action {
            layer: 0,
            polygon: 0,
            payload: Payload::Line(HalfPlane::new(1, 0, -3)),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.history(), 2);
        assert_eq!(log.get(0), Some(move_action(0, 5.0, 0.0)));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn test_undo_redo_cursor() {
        let mut log = ActionLog::new();
        log.append(move_action(0, 1.0, 0.0));
        log.append(move_action(1, 2.0, 0.0));

        let undone = log.undo().unwrap();
        assert_eq!(undone, move_action(1, 2.0, 0.0));
        assert_eq!(log.history(), 1);
        assert!(log.can_redo());

        let redone = log.redo().unwrap();
        assert_eq!(redone, move_action(1, 2.0, 0.0));
        assert_eq!(log.history(), 2);
        assert!(log.redo().is_none());

        log.undo().unwrap();
        log.undo().unwrap();
        assert!(log.undo().is_none());
    }

    #[test]
    fn test_append_after_undo_discards_future() {
        let mut log = ActionLog::new();
        log.append(move_action(0, 1.0, 0.0));
        log.append(move_action(0, 2.0, 0.0));
        log.undo().unwrap();

        log.append(move_action(0, 9.0, 0.0));
        assert_eq!(log.len(), 2);
        assert_eq!(log.history(), 2);
        assert!(log.redo().is_none());
        assert_eq!(log.get(1), Some(move_action(0, 9.0, 0.0)));
        // The discarded payload is gone from its bucket too.
        assert_eq!(log.moves().len(), 2);
    }

    #[test]
    fn test_pop_back_patches_swapped_slots() {
        // An index ordering where the last entry does not reference the last
        // bucket slot, so the swap-remove has to rewrite the survivor.
        let moves = vec![Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let index = vec![
            IndexEntry {
                kind: ActionKind::Move,
                slot: 1,
                polygon: 0,
                layer: 0,
            },
            IndexEntry {
                kind: ActionKind::Move,
                slot: 0,
                polygon: 0,
                layer: 0,
            },
        ];
        let mut log =
            ActionLog::from_parts(vec![], vec![], moves, vec![], vec![], index, 2).unwrap();

        let popped = log.pop_back().unwrap();
        assert_eq!(popped.payload, Payload::Move(Point::new(1.0, 0.0)));
        assert_eq!(log.moves().len(), 1);
        // The surviving entry followed its payload into slot 0.
        assert_eq!(log.index()[0].slot, 0);
        assert_eq!(log.get(0).unwrap().payload, Payload::Move(Point::new(2.0, 0.0)));
    }

    #[test]
    fn test_update_back() {
        let mut log = ActionLog::new();
        log.append(move_action(3, 1.0, 1.0));
        assert!(log.update_back(&move_action(3, 4.0, 4.0)));
        assert_eq!(log.len(), 1);
        assert_eq!(log.back(), Some(move_action(3, 4.0, 4.0)));
        // Mismatched target is refused.
        assert!(!log.update_back(&move_action(7, 1.0, 1.0)));
    }

    #[test]
    fn test_layer_color_in_slot() {
        let mut log = ActionLog::new();
        let color = LayerColor::new(10, 20, 30);
        log.append(Action {
            layer: 0,
            polygon: WHOLE_LAYER,
            payload: Payload::Layer(color),
        });
        assert_eq!(log.get(0).unwrap().payload, Payload::Layer(color));
        assert_eq!(log.index()[0].slot, color.pack());
    }

    #[test]
    fn test_from_parts_rejects_bad_slot() {
        let index = vec![IndexEntry {
            kind: ActionKind::Move,
            slot: 1,
            polygon: 0,
            layer: 0,
        }];
        let err = ActionLog::from_parts(
            vec![],
            vec![],
            vec![Point::new(0.0, 0.0)],
            vec![],
            vec![],
            index,
            1,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LogError::InvalidSlot {
                position: 0,
                slot: 1,
                len: 1
            }
        );
    }

    #[test]
    fn test_from_parts_rejects_bad_history() {
        let err =
            ActionLog::from_parts(vec![], vec![], vec![], vec![], vec![], vec![], 1).unwrap_err();
        assert_eq!(err, LogError::HistoryOutOfRange { history: 1, len: 0 });
    }
}
