mod narrow;

pub use narrow::{collide, Manifold, ManifoldPoint};

use breakphys_core::Vec2;
use breakphys_geom::Aabb;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SweepAxis { X, Y }

/// Axis along which box centers are spread the most. Non-finite boxes are ignored.
pub fn sweep_axis(aabbs: &[Aabb]) -> SweepAxis {
    let mut lo = Vec2::splat(f32::MAX);
    let mut hi = Vec2::splat(f32::MIN);
    for a in aabbs.iter().filter(|a| is_finite(a)) {
        let c = a.center();
        lo = lo.min(c);
        hi = hi.max(c);
    }
    let spread = hi - lo;
    if spread.y > spread.x { SweepAxis::Y } else { SweepAxis::X }
}

#[inline]
fn is_finite(a: &Aabb) -> bool { a.min.is_finite() && a.max.is_finite() }

/// Sort-and-sweep over the axis with the widest spread.
/// Returns index pairs `(i, k)` with `i < k`, sorted, for every pair of overlapping boxes.
pub fn pairs_sap(aabbs: &[Aabb]) -> Vec<(usize, usize)> {
    #[derive(Copy, Clone)]
    struct Interval { lo: f32, hi: f32, idx: usize }

    let axis = sweep_axis(aabbs);
    let project = |a: &Aabb| match axis {
        SweepAxis::X => (a.min.x, a.max.x),
        SweepAxis::Y => (a.min.y, a.max.y),
    };

    let mut intervals: Vec<Interval> = aabbs
        .iter()
        .enumerate()
        .filter(|(_, a)| is_finite(a))
        .map(|(idx, a)| {
            let (p, q) = project(a);
            Interval { lo: p.min(q), hi: p.max(q), idx }
        })
        .collect();
    intervals.sort_by(|a, b| a.lo.total_cmp(&b.lo).then(a.idx.cmp(&b.idx)));

    let mut open: Vec<Interval> = Vec::new();
    let mut out = Vec::new();
    for cur in intervals {
        open.retain(|o| o.hi >= cur.lo);
        for o in &open {
            let pair = (o.idx.min(cur.idx), o.idx.max(cur.idx));
            if aabbs[pair.0].overlaps(&aabbs[pair.1]) { out.push(pair); }
        }
        open.push(cur);
    }

    out.sort_unstable();
    out
}
