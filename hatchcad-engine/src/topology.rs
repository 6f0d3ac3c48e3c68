//! 边界环的嵌套分析与有向面积。
//!
//! 环的角色只由嵌套深度决定：偶数深度为外边界（+1），奇数深度为孔洞（-1），
//! 与环的绕向无关。单个环的面积按奇偶规则计算，与扫描线填充一致；
//! 总面积为各环面积按角色符号求和。

use glam::DVec2;
use hatchcad_core::boundary::BoundaryLoop;
use hatchcad_core::curve::{Curve, Segment};
use hatchcad_core::geometry::Point2;
use tracing::debug;

use crate::errors::HatchError;
use crate::limits::HatchLimits;

/// 边界环在填充中的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopRole {
    Outer,
    Hole,
}

impl LoopRole {
    #[inline]
    pub fn from_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            LoopRole::Outer
        } else {
            LoopRole::Hole
        }
    }

    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            LoopRole::Outer => 1,
            LoopRole::Hole => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedLoop {
    pub index: usize,
    pub depth: usize,
    pub role: LoopRole,
    /// 环自身按奇偶规则围成的面积。
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaReport {
    pub total_area: f64,
    pub loops: Vec<SignedLoop>,
}

/// 单个图元对鞋带公式的贡献。圆弧取弦项再加弓形面积。
pub fn segment_area_term(segment: &Segment) -> f64 {
    let start = segment.start().as_vec2();
    let end = segment.end().as_vec2();
    let chord = (start.x * end.y - end.x * start.y) * 0.5;
    match segment {
        Segment::Line(_) => chord,
        Segment::Arc(arc) => {
            let sweep = arc.sweep();
            chord + arc.radius * arc.radius * 0.5 * (sweep - sweep.sin())
        }
    }
}

/// 逆时针为正的有向面积。
pub fn loop_signed_area(boundary: &BoundaryLoop) -> f64 {
    boundary.segments().iter().map(segment_area_term).sum()
}

fn probe_tolerance(boundary: &BoundaryLoop, tolerance: f64) -> f64 {
    tolerance.max(boundary.bounds().diagonal() * 1e-5)
}

/// 奇偶规则下环围成的面积。
///
/// 无自交的环取有向面积的绝对值，圆弧部分精确；自交环（如五角星、8 字形）离散为多边形后，
/// 以全部顶点与自交点的 y 值分带，带内宽度随 y 线性变化，取中线宽度乘带高。
pub fn loop_even_odd_area(boundary: &BoundaryLoop, tolerance: f64) -> f64 {
    let polygon: Vec<DVec2> = boundary
        .flatten(probe_tolerance(boundary, tolerance))
        .into_iter()
        .map(Point2::as_vec2)
        .collect();
    let crossings = self_crossing_heights(&polygon);
    if crossings.is_empty() {
        return loop_signed_area(boundary).abs();
    }

    let mut levels: Vec<f64> = polygon
        .iter()
        .map(|point| point.y)
        .chain(crossings)
        .collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup();
    levels
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) * even_odd_width(&polygon, 0.5 * (pair[0] + pair[1])))
        .sum()
}

/// 非相邻边之间真正相交处的 y 值；为空表示环无自交。
fn self_crossing_heights(polygon: &[DVec2]) -> Vec<f64> {
    let n = polygon.len();
    let mut heights = Vec::new();
    if n < 4 {
        return heights;
    }
    for i in 0..n {
        let (a0, a1) = (polygon[i], polygon[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b0, b1) = (polygon[j], polygon[(j + 1) % n]);
            if let Some(point) = proper_intersection(a0, a1, b0, b1) {
                heights.push(point.y);
            }
        }
    }
    heights
}

fn proper_intersection(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> Option<DVec2> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.perp_dot(db);
    if denom == 0.0 {
        return None;
    }
    let t = (b0 - a0).perp_dot(db) / denom;
    let u = (b0 - a0).perp_dot(da) / denom;
    let inside = |value: f64| value > 0.0 && value < 1.0;
    (inside(t) && inside(u)).then(|| a0 + da * t)
}

fn even_odd_width(polygon: &[DVec2], y: f64) -> f64 {
    let n = polygon.len();
    let mut xs: Vec<f64> = (0..n)
        .filter_map(|i| {
            let (p, q) = (polygon[i], polygon[(i + 1) % n]);
            ((p.y > y) != (q.y > y)).then(|| p.x + (y - p.y) / (q.y - p.y) * (q.x - p.x))
        })
        .collect();
    xs.sort_by(f64::total_cmp);
    xs.chunks_exact(2).map(|pair| pair[1] - pair[0]).sum()
}

fn loop_contains(outer: &BoundaryLoop, inner: &BoundaryLoop, tolerance: f64) -> bool {
    if !outer.bounds().contains_bounds(&inner.bounds(), tolerance) {
        return false;
    }
    inner
        .sample_point()
        .is_some_and(|point| outer.contains_point(point, probe_tolerance(outer, tolerance)))
}

/// 计算每个环的嵌套深度与角色。
pub fn classify_loops(loops: &[BoundaryLoop], tolerance: f64) -> Vec<SignedLoop> {
    let containment: Vec<Vec<bool>> = loops
        .iter()
        .map(|outer| {
            loops
                .iter()
                .map(|inner| loop_contains(outer, inner, tolerance))
                .collect()
        })
        .collect();

    (0..loops.len())
        .map(|index| {
            // 互相包含（重合环）时只让序号较小者作为容器。
            let depth = (0..loops.len())
                .filter(|&other| other != index && containment[other][index])
                .filter(|&other| !(containment[index][other] && other > index))
                .count();
            SignedLoop {
                index,
                depth,
                role: LoopRole::from_depth(depth),
                area: loop_even_odd_area(&loops[index], tolerance),
            }
        })
        .collect()
}

/// 有向面积汇总，并按面积上下限报错。
pub fn compute_area(
    loops: &[BoundaryLoop],
    limits: &HatchLimits,
) -> Result<AreaReport, HatchError> {
    let signed = classify_loops(loops, limits.tolerance);
    let total_area: f64 = signed
        .iter()
        .map(|entry| f64::from(entry.role.sign()) * entry.area)
        .sum();

    debug!(loops = signed.len(), total_area, "面积计算完成");

    if total_area < limits.min_area {
        return Err(HatchError::TooSmall { area: total_area });
    }
    if total_area > limits.max_area {
        return Err(HatchError::AreaTooBig { area: total_area });
    }

    Ok(AreaReport {
        total_area,
        loops: signed,
    })
}
