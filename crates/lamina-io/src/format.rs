//! The Lamina binary document format.
//!
//! A document file is a set of lumps — `{offset, size}` byte ranges — behind
//! a 2-byte magic. The action log is itself a nested lump blob with its own
//! magic and history cursor. All integers and floats are host-endian, record
//! arrays are flat fixed-size elements with no per-element framing, and
//! loading validates everything before touching a document.
//!
//! ## Layout
//! Document: `'L','2'`, 4 lumps (action log, texture info, pixel data,
//! string table). Action log: `'E','A'`, `u32` history, 6 lumps (rect, line,
//! move, scale, texture, index records).

use std::io::{self, Read, Write};

use thiserror::Error;

use lamina_core::actions::{ActionKind, ActionLog, IndexEntry, LogError, ScaleFactor};
use lamina_core::geometry::{Point, Rect};
use lamina_core::halfplane::HalfPlane;
use lamina_core::polygon::TextureRef;
use lamina_core::texture::TextureInfo;
use lamina_core::Document;

pub const DOC_MAGIC: [u8; 2] = *b"L2";
pub const LOG_MAGIC: [u8; 2] = *b"EA";

const DOC_HEADER_LEN: usize = 2 + DOC_LUMPS * 8;
const LOG_HEADER_LEN: usize = 2 + 4 + LOG_LUMPS * 8;
const DOC_LUMPS: usize = 4;
const LOG_LUMPS: usize = 6;

// Element sizes of the flat record arrays.
const RECT_ELEM: u32 = 32; // 4 x f64
const LINE_ELEM: u32 = 24; // 3 x i64
const MOVE_ELEM: u32 = 16; // 2 x f64
const SCALE_ELEM: u32 = 32; // 2 x f64 + 2 x i64
const TEXREC_ELEM: u32 = 8; // 2 x u32
const INDEX_ELEM: u32 = 16; // 4 x u32
const TEXINFO_ELEM: u32 = 21; // 4 x u32 + u8 + u32

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 2], found: [u8; 2] },

    #[error("file truncated: needed {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    #[error("{lump} lump [{offset}..+{size}] exceeds file length {len}")]
    LumpOutOfBounds {
        lump: &'static str,
        offset: u32,
        size: u32,
        len: usize,
    },

    #[error("{lump} lump size {size} is not a multiple of its element size {element}")]
    MisalignedLump {
        lump: &'static str,
        size: u32,
        element: u32,
    },

    #[error("unknown action record kind {0}")]
    UnknownKind(u32),

    #[error("texture name [{offset}..+{size}] escapes the string table")]
    BadStringRef { offset: u32, size: u32 },

    #[error("texture name is not valid UTF-8")]
    BadUtf8(#[from] std::str::Utf8Error),

    #[error("texture pixels [{offset}..+{size}] escape the pixel lump")]
    BadPixelRef { offset: u32, size: u64 },

    #[error("inconsistent action log: {0}")]
    Log(#[from] LogError),
}

// ── Byte helpers ──────────────────────────────────────────────────────

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_ne_bytes());
}

fn push_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_ne_bytes());
}

fn push_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_ne_bytes());
}

fn u32_at(chunk: &[u8], off: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&chunk[off..off + 4]);
    u32::from_ne_bytes(b)
}

fn i64_at(chunk: &[u8], off: usize) -> i64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&chunk[off..off + 8]);
    i64::from_ne_bytes(b)
}

fn f64_at(chunk: &[u8], off: usize) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&chunk[off..off + 8]);
    f64::from_ne_bytes(b)
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, FormatError> {
    let end = *pos + 4;
    match bytes.get(*pos..end) {
        Some(chunk) => {
            *pos = end;
            Ok(u32_at(chunk, 0))
        }
        None => Err(FormatError::Truncated {
            needed: end,
            len: bytes.len(),
        }),
    }
}

fn check_magic(bytes: &[u8], expected: [u8; 2]) -> Result<(), FormatError> {
    match bytes.get(0..2) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(FormatError::BadMagic {
            expected,
            found: [found[0], found[1]],
        }),
        None => Err(FormatError::Truncated {
            needed: 2,
            len: bytes.len(),
        }),
    }
}

/// Resolves one lump descriptor to a slice, validating bounds and element
/// alignment.
fn lump_slice<'a>(
    bytes: &'a [u8],
    lump: &'static str,
    offset: u32,
    size: u32,
    element: u32,
) -> Result<&'a [u8], FormatError> {
    if size % element != 0 {
        return Err(FormatError::MisalignedLump {
            lump,
            size,
            element,
        });
    }
    bytes
        .get(offset as usize..offset as usize + size as usize)
        .ok_or(FormatError::LumpOutOfBounds {
            lump,
            offset,
            size,
            len: bytes.len(),
        })
}

// ── Action log blob ───────────────────────────────────────────────────

/// Serializes an action log into its self-contained blob. Lump offsets are
/// relative to the blob start and laid out in a fixed order, so encoding is
/// deterministic.
pub fn encode_action_log(log: &ActionLog) -> Vec<u8> {
    let sizes: [u32; LOG_LUMPS] = [
        log.rects().len() as u32 * RECT_ELEM,
        log.lines().len() as u32 * LINE_ELEM,
        log.moves().len() as u32 * MOVE_ELEM,
        log.scales().len() as u32 * SCALE_ELEM,
        log.textures().len() as u32 * TEXREC_ELEM,
        log.index().len() as u32 * INDEX_ELEM,
    ];
    let total: u32 = sizes.iter().sum();
    let mut out = Vec::with_capacity(LOG_HEADER_LEN + total as usize);

    out.extend_from_slice(&LOG_MAGIC);
    push_u32(&mut out, log.history() as u32);
    let mut offset = LOG_HEADER_LEN as u32;
    for size in sizes {
        push_u32(&mut out, offset);
        push_u32(&mut out, size);
        offset += size;
    }

    for r in log.rects() {
        push_f64(&mut out, r.lower_left.x);
        push_f64(&mut out, r.lower_left.y);
        push_f64(&mut out, r.upper_right.x);
        push_f64(&mut out, r.upper_right.y);
    }
    for pl in log.lines() {
        push_i64(&mut out, pl.a());
        push_i64(&mut out, pl.b());
        push_i64(&mut out, pl.c());
    }
    for d in log.moves() {
        push_f64(&mut out, d.x);
        push_f64(&mut out, d.y);
    }
    for s in log.scales() {
        push_f64(&mut out, s.origin.x);
        push_f64(&mut out, s.origin.y);
        push_i64(&mut out, s.num);
        push_i64(&mut out, s.den);
    }
    for t in log.textures() {
        push_u32(&mut out, t.index);
        push_u32(&mut out, t.scale);
    }
    for e in log.index() {
        push_u32(&mut out, e.kind.as_u32());
        push_u32(&mut out, e.slot);
        push_u32(&mut out, e.polygon);
        push_u32(&mut out, e.layer);
    }
    out
}

/// Parses an action log blob, validating magic, lump bounds, element
/// alignment, record kinds, slot references, and the history cursor.
pub fn decode_action_log(bytes: &[u8]) -> Result<ActionLog, FormatError> {
    check_magic(bytes, LOG_MAGIC)?;
    let mut pos = 2;
    let history = read_u32(bytes, &mut pos)? as usize;

    let mut lumps = [(0u32, 0u32); LOG_LUMPS];
    for lump in &mut lumps {
        lump.0 = read_u32(bytes, &mut pos)?;
        lump.1 = read_u32(bytes, &mut pos)?;
    }

    let rect_lump = lump_slice(bytes, "rect", lumps[0].0, lumps[0].1, RECT_ELEM)?;
    let line_lump = lump_slice(bytes, "line", lumps[1].0, lumps[1].1, LINE_ELEM)?;
    let move_lump = lump_slice(bytes, "move", lumps[2].0, lumps[2].1, MOVE_ELEM)?;
    let scale_lump = lump_slice(bytes, "scale", lumps[3].0, lumps[3].1, SCALE_ELEM)?;
    let texture_lump = lump_slice(bytes, "texture", lumps[4].0, lumps[4].1, TEXREC_ELEM)?;
    let index_lump = lump_slice(bytes, "index", lumps[5].0, lumps[5].1, INDEX_ELEM)?;

    let rects: Vec<Rect> = rect_lump
        .chunks_exact(RECT_ELEM as usize)
        .map(|c| {
            Rect::new(
                f64_at(c, 0),
                f64_at(c, 8),
                f64_at(c, 16),
                f64_at(c, 24),
            )
        })
        .collect();
    let lines: Vec<HalfPlane> = line_lump
        .chunks_exact(LINE_ELEM as usize)
        .map(|c| HalfPlane::new(i64_at(c, 0), i64_at(c, 8), i64_at(c, 16)))
        .collect();
    let moves: Vec<Point> = move_lump
        .chunks_exact(MOVE_ELEM as usize)
        .map(|c| Point::new(f64_at(c, 0), f64_at(c, 8)))
        .collect();
    let scales: Vec<ScaleFactor> = scale_lump
        .chunks_exact(SCALE_ELEM as usize)
        .map(|c| ScaleFactor {
            origin: Point::new(f64_at(c, 0), f64_at(c, 8)),
            num: i64_at(c, 16),
            den: i64_at(c, 24),
        })
        .collect();
    let textures: Vec<TextureRef> = texture_lump
        .chunks_exact(TEXREC_ELEM as usize)
        .map(|c| TextureRef {
            index: u32_at(c, 0),
            scale: u32_at(c, 4),
        })
        .collect();

    let mut index = Vec::with_capacity(index_lump.len() / INDEX_ELEM as usize);
    for c in index_lump.chunks_exact(INDEX_ELEM as usize) {
        let raw_kind = u32_at(c, 0);
        let kind = ActionKind::from_u32(raw_kind).ok_or(FormatError::UnknownKind(raw_kind))?;
        index.push(IndexEntry {
            kind,
            slot: u32_at(c, 4),
            polygon: u32_at(c, 8),
            layer: u32_at(c, 12),
        });
    }

    Ok(ActionLog::from_parts(
        rects, lines, moves, scales, textures, index, history,
    )?)
}

// ── Document file ─────────────────────────────────────────────────────

/// Serializes a document: header, action-log blob, texture-info table,
/// pixel data, string table, in that fixed order.
pub fn encode_document(doc: &Document) -> Vec<u8> {
    let log_blob = encode_action_log(doc.log());

    let mut infos = Vec::with_capacity(doc.textures().len() * TEXINFO_ELEM as usize);
    let mut pixels = Vec::new();
    let mut strings = Vec::new();
    for t in doc.textures() {
        debug_assert_eq!(t.pixels.len(), t.pixel_len());
        push_u32(&mut infos, strings.len() as u32);
        push_u32(&mut infos, t.name.len() as u32);
        push_u32(&mut infos, t.width);
        push_u32(&mut infos, t.height);
        infos.push(t.pixel_width);
        push_u32(&mut infos, pixels.len() as u32);
        strings.extend_from_slice(t.name.as_bytes());
        pixels.extend_from_slice(&t.pixels);
    }

    let sizes = [
        log_blob.len() as u32,
        infos.len() as u32,
        pixels.len() as u32,
        strings.len() as u32,
    ];
    let mut out =
        Vec::with_capacity(DOC_HEADER_LEN + sizes.iter().sum::<u32>() as usize);
    out.extend_from_slice(&DOC_MAGIC);
    let mut offset = DOC_HEADER_LEN as u32;
    for size in sizes {
        push_u32(&mut out, offset);
        push_u32(&mut out, size);
        offset += size;
    }
    out.extend_from_slice(&log_blob);
    out.extend_from_slice(&infos);
    out.extend_from_slice(&pixels);
    out.extend_from_slice(&strings);
    out
}

/// Parses a document file and rebuilds its state by replaying the committed
/// log. Any validation failure aborts the load before a document exists, so
/// a malformed file never leaves partial state behind.
pub fn decode_document(bytes: &[u8]) -> Result<Document, FormatError> {
    check_magic(bytes, DOC_MAGIC)?;
    let mut pos = 2;
    let mut lumps = [(0u32, 0u32); DOC_LUMPS];
    for lump in &mut lumps {
        lump.0 = read_u32(bytes, &mut pos)?;
        lump.1 = read_u32(bytes, &mut pos)?;
    }

    let log_lump = lump_slice(bytes, "action log", lumps[0].0, lumps[0].1, 1)?;
    let info_lump = lump_slice(bytes, "texture info", lumps[1].0, lumps[1].1, TEXINFO_ELEM)?;
    let pixel_lump = lump_slice(bytes, "pixel data", lumps[2].0, lumps[2].1, 1)?;
    let string_lump = lump_slice(bytes, "string table", lumps[3].0, lumps[3].1, 1)?;

    let log = decode_action_log(log_lump)?;

    let mut textures = Vec::with_capacity(info_lump.len() / TEXINFO_ELEM as usize);
    for c in info_lump.chunks_exact(TEXINFO_ELEM as usize) {
        let name_offset = u32_at(c, 0);
        let name_size = u32_at(c, 4);
        let width = u32_at(c, 8);
        let height = u32_at(c, 12);
        let pixel_width = c[16];
        let data_offset = u32_at(c, 17);

        let name = string_lump
            .get(name_offset as usize..name_offset as usize + name_size as usize)
            .ok_or(FormatError::BadStringRef {
                offset: name_offset,
                size: name_size,
            })?;
        let name = std::str::from_utf8(name)?;

        let pixel_len = width as u64 * height as u64 * pixel_width as u64;
        let pixel_end = data_offset as u64 + pixel_len;
        let pixels = pixel_lump
            .get(data_offset as usize..pixel_end as usize)
            .ok_or(FormatError::BadPixelRef {
                offset: data_offset,
                size: pixel_len,
            })?;

        textures.push(TextureInfo::new(
            name,
            width,
            height,
            pixel_width,
            pixels.to_vec(),
        ));
    }

    Ok(Document::from_parts("untitled", log, textures))
}

pub fn write_document<W: Write>(writer: &mut W, doc: &Document) -> Result<(), FormatError> {
    let bytes = encode_document(doc);
    writer.write_all(&bytes)?;
    log::info!("wrote document: {} bytes, {} records", bytes.len(), doc.log().len());
    Ok(())
}

pub fn read_document<R: Read>(reader: &mut R) -> Result<Document, FormatError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let doc = decode_document(&bytes)?;
    log::info!("read document: {} records, {} textures", doc.log().len(), doc.textures().len());
    Ok(doc)
}
