use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("half-plane coefficients overflow i64 when scaled by {num}/{den}")]
    PlaneOverflow { num: i64, den: i64 },

    #[error("scale factor {num}/{den} is not a positive rational")]
    InvalidScale { num: i64, den: i64 },
}

/// An oriented line `a·x + b·y + c = 0` in reduced integer form.
///
/// The interior side of the plane is where the signed distance is positive.
/// Coefficients are kept coprime (`gcd(|a|,|b|,|c|) == 1` unless all zero)
/// after every construction and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfPlane {
    a: i64,
    b: i64,
    c: i64,
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn gcd128(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl HalfPlane {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        let mut plane = Self { a, b, c };
        plane.reduce();
        plane
    }

    /// Builds the plane through `start` and `end`, oriented so that points to
    /// the left of the `start→end` direction are interior (positive side).
    ///
    /// Endpoints are expected on the editor grid; coordinates are rounded to
    /// integers before the coefficients are derived.
    pub fn from_edge(start: Point, end: Point) -> Self {
        let sx = start.x.round() as i64;
        let sy = start.y.round() as i64;
        let ex = end.x.round() as i64;
        let ey = end.y.round() as i64;
        Self::new(sy - ey, ex - sx, sx * ey - ex * sy)
    }

    pub fn a(&self) -> i64 {
        self.a
    }

    pub fn b(&self) -> i64 {
        self.b
    }

    pub fn c(&self) -> i64 {
        self.c
    }

    fn reduce(&mut self) {
        let g = gcd(gcd(self.a, self.b), self.c);
        if g > 1 {
            self.a /= g;
            self.b /= g;
            self.c /= g;
        }
    }

    /// `a·x + b·y + c`; positive on the interior side.
    pub fn signed_distance(&self, p: &Point) -> f64 {
        self.a as f64 * p.x + self.b as f64 * p.y + self.c as f64
    }

    /// Length of the normal vector, for converting signed distances into
    /// actual grid units. Computed in `f64`: coefficients near the `i64`
    /// limits must not overflow here.
    pub fn normal_len(&self) -> f64 {
        (self.a as f64).hypot(self.b as f64)
    }

    /// Reverses which side is interior.
    pub fn flip(&mut self) {
        self.a = -self.a;
        self.b = -self.b;
        self.c = -self.c;
    }

    /// Translates the plane by `delta` (grid-aligned).
    pub fn offset(&mut self, delta: Point) {
        let dx = delta.x.round() as i64;
        let dy = delta.y.round() as i64;
        self.c -= self.a * dx + self.b * dy;
        self.reduce();
    }

    /// Rescales the plane about `origin` by the rational factor `num/den`.
    ///
    /// Intermediate products are taken in `i128`; if the gcd-reduced
    /// coefficients do not fit back into `i64` the plane is left untouched
    /// and an error is returned. A silently wrapped coefficient would corrupt
    /// the geometry invariants irreversibly, so this path is always checked.
    pub fn scale(&mut self, origin: Point, num: i64, den: i64) -> Result<(), GeometryError> {
        if num <= 0 || den <= 0 {
            return Err(GeometryError::InvalidScale { num, den });
        }
        let ox = origin.x.round() as i128;
        let oy = origin.y.round() as i128;
        let (a, b, c) = (self.a as i128, self.b as i128, self.c as i128);
        let (n, d) = (num as i128, den as i128);

        // Substituting the inverse point transform into a·x + b·y + c = 0 and
        // clearing the denominator (n > 0, so orientation is preserved):
        let mut a2 = a * d;
        let mut b2 = b * d;
        let mut c2 = (n - d) * (a * ox + b * oy) + n * c;

        let g = gcd128(gcd128(a2, b2), c2);
        if g > 1 {
            a2 /= g;
            b2 /= g;
            c2 /= g;
        }

        let overflow = |_| GeometryError::PlaneOverflow { num, den };
        let a2 = i64::try_from(a2).map_err(overflow)?;
        let b2 = i64::try_from(b2).map_err(overflow)?;
        let c2 = i64::try_from(c2).map_err(overflow)?;
        self.a = a2;
        self.b = b2;
        self.c = c2;
        Ok(())
    }

    /// Sutherland–Hodgman clip of an ordered ring against this plane.
    ///
    /// Vertices on the interior side or exactly on the line (`d >= 0`) are
    /// kept; crossing edges gain the intersection point at
    /// `t = da / (da - db)`. Returns a new ring, possibly empty.
    pub fn clip(&self, ring: &[Point]) -> Vec<Point> {
        let mut out = Vec::with_capacity(ring.len() + 1);
        for i in 0..ring.len() {
            let cur = ring[i];
            let nxt = ring[(i + 1) % ring.len()];
            let da = self.signed_distance(&cur);
            let db = self.signed_distance(&nxt);
            if da >= 0.0 {
                out.push(cur);
                if db < 0.0 {
                    out.push(Self::crossing(cur, nxt, da, db));
                }
            } else if db >= 0.0 {
                out.push(Self::crossing(cur, nxt, da, db));
            }
        }
        out
    }

    fn crossing(a: Point, b: Point, da: f64, db: f64) -> Point {
        let t = da / (da - db);
        Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }

    /// True iff every point lies on the exterior side or on the line.
    ///
    /// Used as the separating-plane test for convex/convex and convex/rect
    /// intersection checks.
    pub fn all_points_behind(&self, points: &[Point]) -> bool {
        points.iter().all(|p| self.signed_distance(p) <= 0.0)
    }
}
