//! 填充图元生成。
//!
//! 实体填充直接输出带角色的区域；图案填充对每个线族把边界环旋转到线族的局部坐标系，
//! 使图案线成为水平线 `y = origin.y + k * spacing`，再逐条做扫描线裁剪与虚线切分。
//! 局部坐标系以填充包围盒中心为原点，远离世界原点的填充也保持足够精度。

use std::f64::consts::{FRAC_PI_2, PI};

use glam::{DAffine2, DVec2};
use hatchcad_core::boundary::BoundaryLoop;
use hatchcad_core::curve::{ArcSegment, Segment, normalize_angle};
use hatchcad_core::document::{HatchData, PatternStyle};
use hatchcad_core::geometry::{Bounds2D, Point2, Transform, Vector2};
use hatchcad_core::pattern::PatternFamily;
use tracing::{debug, warn};

use crate::errors::HatchError;
use crate::limits::HatchLimits;
use crate::pattern::PatternRegistry;
use crate::render::{FillPrimitive, FilledRegion, RegionContour};
use crate::topology::SignedLoop;

const SPLIT_EPSILON: f64 = 1e-12;

/// 某个线族已输出的连续线序号区间；`first > last` 表示尚未输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyCursor {
    pub first: i64,
    pub last: i64,
}

impl FamilyCursor {
    pub const EMPTY: FamilyCursor = FamilyCursor { first: 0, last: -1 };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    #[inline]
    pub fn contains(&self, index: i64) -> bool {
        self.first <= index && index <= self.last
    }

    fn merged(self, first: i64, last: i64) -> FamilyCursor {
        if first > last {
            return self;
        }
        let contiguous = !self.is_empty()
            && first <= self.last.saturating_add(1)
            && self.first <= last.saturating_add(1);
        if contiguous {
            FamilyCursor {
                first: self.first.min(first),
                last: self.last.max(last),
            }
        } else {
            FamilyCursor { first, last }
        }
    }
}

impl Default for FamilyCursor {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// 分窗绘制之间传递的续接状态，调用方只负责原样回传。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContinuationOffset {
    cursors: Vec<FamilyCursor>,
    region_emitted: bool,
}

impl ContinuationOffset {
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.cursors.is_empty() && !self.region_emitted
    }

    /// 实体填充区域是否已在之前的窗口中输出。
    #[inline]
    pub fn region_emitted(&self) -> bool {
        self.region_emitted
    }

    #[inline]
    pub fn cursors(&self) -> &[FamilyCursor] {
        &self.cursors
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursors.clear();
        self.region_emitted = false;
    }

    fn cursor(&self, family: usize, families: usize) -> FamilyCursor {
        if self.cursors.len() == families {
            self.cursors[family]
        } else {
            FamilyCursor::EMPTY
        }
    }
}

pub struct FillRequest<'a> {
    pub loops: &'a [BoundaryLoop],
    pub signed: &'a [SignedLoop],
    pub data: &'a HatchData,
    pub pattern_frame: DAffine2,
    pub registry: &'a PatternRegistry,
    pub limits: HatchLimits,
    /// 仅生成与该窗口相交的图案线；`None` 生成全部。
    pub window: Option<Bounds2D>,
}

impl FillRequest<'_> {
    fn total_area(&self) -> f64 {
        self.signed
            .iter()
            .map(|entry| f64::from(entry.role.sign()) * entry.area)
            .sum()
    }

    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for boundary in self.loops {
            bounds.include_bounds(&boundary.bounds());
        }
        bounds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillOutput {
    pub primitives: Vec<FillPrimitive>,
    pub next_offset: ContinuationOffset,
}

/// 生成填充图元。结果只依赖输入，重复调用逐位一致。
pub fn generate_fill(
    request: &FillRequest<'_>,
    offset: &ContinuationOffset,
) -> Result<FillOutput, HatchError> {
    let bounds = request.bounds();
    let fill_box = match request.window {
        Some(window) => bounds.intersection(&window),
        None => bounds,
    };

    if request.data.is_solid() {
        // 区域整体输出一次，后续窗口不再重复。
        if fill_box.is_empty() || offset.region_emitted {
            return Ok(FillOutput {
                primitives: Vec::new(),
                next_offset: offset.clone(),
            });
        }
        return Ok(FillOutput {
            primitives: vec![solid_region(request)],
            next_offset: ContinuationOffset {
                cursors: offset.cursors.clone(),
                region_emitted: true,
            },
        });
    }

    let style = &request.data.pattern;
    let pattern = request
        .registry
        .get(&style.name)
        .ok_or_else(|| HatchError::PatternNotFound(style.name.clone()))?;

    let tolerance = request.limits.tolerance;
    let pivot = if bounds.is_empty() {
        DVec2::ZERO
    } else {
        bounds.center().as_vec2()
    };
    let families = pattern
        .families
        .iter()
        .map(|family| {
            LineFamily::resolve(family, style, &request.pattern_frame, pivot, tolerance)
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(HatchError::TooSmall {
            area: request.total_area(),
        })?;

    if fill_box.is_empty() {
        return Ok(FillOutput {
            primitives: Vec::new(),
            next_offset: offset.clone(),
        });
    }

    let count = families.len();
    let mut plans = Vec::with_capacity(count);
    let mut estimated: u64 = 0;
    for (index, family) in families.iter().enumerate() {
        let (first, last) = family.index_range(&fill_box, tolerance);
        let cursor = offset.cursor(index, count);
        let pending = pending_ranges(first, last, cursor);
        estimated = pending
            .iter()
            .fold(estimated, |total, range| total.saturating_add(range_len(*range)));
        plans.push((first, last, cursor, pending));
    }
    if estimated > request.limits.max_segments as u64 {
        return Err(HatchError::AreaTooBig {
            area: request.total_area(),
        });
    }

    let mut emitter = LineEmitter {
        primitives: Vec::new(),
        budget: request.limits.max_segments,
        steps: request.limits.max_segments as u64,
        tolerance,
    };
    let mut cursors = Vec::with_capacity(count);
    for (family, (first, last, cursor, pending)) in families.iter().zip(plans) {
        let scan_loops = family.scan_loops(request, tolerance);
        for (low, high) in pending {
            for index in low..=high {
                family
                    .emit_line(index, &scan_loops, &mut emitter)
                    .map_err(|_| HatchError::AreaTooBig {
                        area: request.total_area(),
                    })?;
            }
        }
        cursors.push(cursor.merged(first, last));
    }

    debug!(
        pattern = %pattern.name,
        families = count,
        lines = emitter.primitives.len(),
        windowed = request.window.is_some(),
        "图案填充已生成"
    );

    Ok(FillOutput {
        primitives: emitter.primitives,
        next_offset: ContinuationOffset {
            cursors,
            region_emitted: offset.region_emitted,
        },
    })
}

/// 窗口序号区间中尚未输出的部分，按升序分为游标之前与之后两段。
fn pending_ranges(first: i64, last: i64, cursor: FamilyCursor) -> [(i64, i64); 2] {
    if cursor.is_empty() {
        return [(first, last), (0, -1)];
    }
    [
        (first, last.min(cursor.first.saturating_sub(1))),
        (first.max(cursor.last.saturating_add(1)), last),
    ]
}

fn range_len((low, high): (i64, i64)) -> u64 {
    if low > high {
        0
    } else {
        u64::try_from(i128::from(high) - i128::from(low) + 1).unwrap_or(u64::MAX)
    }
}

fn solid_region(request: &FillRequest<'_>) -> FillPrimitive {
    let contours = request
        .signed
        .iter()
        .filter_map(|entry| {
            request.loops.get(entry.index).map(|boundary| RegionContour {
                boundary: boundary.clone(),
                role: entry.role,
            })
        })
        .collect();
    FillPrimitive::Region(FilledRegion { contours })
}

/// 线族沿线方向的落笔方式。
#[derive(Debug, Clone, PartialEq)]
enum Pen {
    Continuous,
    Dashed { dashes: Vec<f64>, period: f64 },
    /// 只有点或全部短于容差，不输出任何线段。
    Hidden,
}

impl Pen {
    fn resolve(family: &PatternFamily, factor: f64, tolerance: f64) -> Self {
        let Some(period) = family.dash_period() else {
            return Pen::Continuous;
        };
        let dashes: Vec<f64> = family.dashes.iter().map(|dash| dash * factor).collect();
        if !dashes.iter().any(|dash| *dash > tolerance) {
            return Pen::Hidden;
        }
        Pen::Dashed {
            dashes,
            period: period * factor,
        }
    }
}

/// 线族换算到世界坐标后的参数；`origin` 已处于以 `pivot` 为原点的局部坐标系。
#[derive(Debug, Clone)]
struct LineFamily {
    angle: f64,
    pivot: DVec2,
    origin: DVec2,
    spacing: f64,
    shift: f64,
    pen: Pen,
}

impl LineFamily {
    fn resolve(
        family: &PatternFamily,
        style: &PatternStyle,
        frame: &DAffine2,
        pivot: DVec2,
        tolerance: f64,
    ) -> Option<Self> {
        let base = normalize_angle(style.angle);
        let scale = style.scale;
        let direction = DVec2::from_angle(base + family.angle);
        let normal = direction.perp();
        let origin = DVec2::from_angle(base).rotate(family.origin.as_vec2() * scale);
        let step = direction * (family.shift * scale) + normal * (family.spacing * scale);

        let world_direction = frame.matrix2 * direction;
        let stretch = world_direction.length();
        if !stretch.is_finite() || stretch <= tolerance {
            return None;
        }
        let unit = world_direction / stretch;
        let world_step = frame.matrix2 * step;
        let mut spacing = unit.perp_dot(world_step);
        let mut shift = unit.dot(world_step);
        if spacing < 0.0 {
            spacing = -spacing;
            shift = -shift;
        }
        if !spacing.is_finite() || spacing <= tolerance {
            return None;
        }

        let angle = unit.y.atan2(unit.x);
        let pen = Pen::resolve(family, scale.abs() * stretch, tolerance);

        // 把原点平移到离 pivot 最近的那条线上，后续坐标都保持为小量。
        let mut origin = DVec2::from_angle(-angle).rotate(frame.transform_point2(origin) - pivot);
        let lines = (origin.y / spacing).round();
        if lines.is_finite() {
            origin.y -= lines * spacing;
            origin.x -= lines * shift;
        }
        if let Pen::Dashed { period, .. } = &pen {
            origin.x = origin.x.rem_euclid(*period);
        }

        Some(Self {
            angle,
            pivot,
            origin,
            spacing,
            shift,
            pen,
        })
    }

    fn to_world(&self) -> DAffine2 {
        DAffine2::from_translation(self.pivot) * DAffine2::from_angle(self.angle)
    }

    fn index_range(&self, fill_box: &Bounds2D, tolerance: f64) -> (i64, i64) {
        let to_local = DVec2::from_angle(-self.angle);
        let (low, high) = fill_box
            .corners()
            .iter()
            .map(|corner| to_local.rotate(corner.as_vec2() - self.pivot).y)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), y| {
                (low.min(y), high.max(y))
            });
        let slack = tolerance / self.spacing;
        let first = ((low - self.origin.y) / self.spacing - slack).ceil() as i64;
        let last = ((high - self.origin.y) / self.spacing + slack).floor() as i64;
        (first, last)
    }

    fn scan_loops(&self, request: &FillRequest<'_>, tolerance: f64) -> Vec<ScanLoop> {
        let recenter = Transform::Translate(Vector2::new(-self.pivot.x, -self.pivot.y));
        let to_local = Transform::Rotate {
            center: Point2::new(0.0, 0.0),
            angle: -self.angle,
        };
        request
            .signed
            .iter()
            .filter_map(|entry| {
                let boundary = request.loops.get(entry.index)?;
                let local = boundary.transformed(&recenter).transformed(&to_local);
                Some(ScanLoop {
                    edges: scan_edges(&local, tolerance),
                    sign: entry.role.sign(),
                })
            })
            .collect()
    }

    fn emit_line(
        &self,
        index: i64,
        scan_loops: &[ScanLoop],
        emitter: &mut LineEmitter,
    ) -> Result<(), BudgetExceeded> {
        if self.pen == Pen::Hidden {
            return Ok(());
        }
        let y = self.origin.y + index as f64 * self.spacing;
        let phase = self.origin.x + index as f64 * self.shift;
        let to_world = self.to_world();
        for (start, end) in covered_spans(scan_loops, y) {
            match &self.pen {
                Pen::Continuous => emitter.push(&to_world, y, start, end)?,
                Pen::Dashed { dashes, period } => {
                    let first = ((start - phase) / period).floor();
                    let periods = ((end - phase) / period).ceil() - first;
                    emitter.spend(periods)?;
                    let base = phase + first * period;
                    // 每个周期的起点由整数序号直接算出，不做累加。
                    for k in 0..periods as u64 {
                        let mut cursor = base + k as f64 * period;
                        for dash in dashes {
                            let next = cursor + dash.abs();
                            if *dash > 0.0 {
                                emitter.push(&to_world, y, cursor.max(start), next.min(end))?;
                            }
                            cursor = next;
                        }
                    }
                }
                Pen::Hidden => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BudgetExceeded;

struct LineEmitter {
    primitives: Vec<FillPrimitive>,
    budget: usize,
    /// 虚线周期的剩余处理配额。
    steps: u64,
    tolerance: f64,
}

impl LineEmitter {
    fn push(
        &mut self,
        to_world: &DAffine2,
        y: f64,
        x0: f64,
        x1: f64,
    ) -> Result<(), BudgetExceeded> {
        if x1 - x0 <= self.tolerance {
            return Ok(());
        }
        if self.budget == 0 {
            return Err(BudgetExceeded);
        }
        self.budget -= 1;
        self.primitives.push(FillPrimitive::Line {
            start: Point2::from_vec(to_world.transform_point2(DVec2::new(x0, y))),
            end: Point2::from_vec(to_world.transform_point2(DVec2::new(x1, y))),
        });
        Ok(())
    }

    fn spend(&mut self, periods: f64) -> Result<(), BudgetExceeded> {
        if !(periods >= 0.0 && periods <= self.steps as f64) {
            return Err(BudgetExceeded);
        }
        self.steps -= periods as u64;
        Ok(())
    }
}

struct ScanLoop {
    edges: Vec<ScanEdge>,
    sign: i32,
}

/// y 方向单调的一段边界。
#[derive(Debug, Clone, Copy)]
struct ScanEdge {
    y0: f64,
    y1: f64,
    shape: EdgeShape,
}

#[derive(Debug, Clone, Copy)]
enum EdgeShape {
    Line { start: DVec2, end: DVec2 },
    Arc { center: DVec2, radius: f64, right: bool },
}

impl ScanEdge {
    /// 半开规则：恰好经过顶点的扫描线只计一次。
    #[inline]
    fn crosses(&self, y: f64) -> bool {
        (self.y0 > y) != (self.y1 > y)
    }

    fn x_at(&self, y: f64) -> f64 {
        match self.shape {
            EdgeShape::Line { start, end } => {
                let dy = end.y - start.y;
                if dy == 0.0 {
                    return 0.5 * (start.x + end.x);
                }
                let t = ((y - start.y) / dy).clamp(0.0, 1.0);
                start.x + t * (end.x - start.x)
            }
            EdgeShape::Arc {
                center,
                radius,
                right,
            } => {
                let v = ((y - center.y) / radius).clamp(-1.0, 1.0);
                let dx = radius * (1.0 - v * v).max(0.0).sqrt();
                if right { center.x + dx } else { center.x - dx }
            }
        }
    }
}

fn scan_edges(boundary: &BoundaryLoop, tolerance: f64) -> Vec<ScanEdge> {
    let mut edges = Vec::with_capacity(boundary.len());
    for segment in boundary.segments() {
        match segment {
            Segment::Line(line) => edges.push(ScanEdge {
                y0: line.start.y(),
                y1: line.end.y(),
                shape: EdgeShape::Line {
                    start: line.start.as_vec2(),
                    end: line.end.as_vec2(),
                },
            }),
            Segment::Arc(arc) => push_arc_pieces(arc, &mut edges),
        }
    }

    // 相邻边在公共顶点处取同一 y 值，穿越次数才能保持偶数。
    let n = edges.len();
    for i in 0..n {
        let previous = edges[(i + n - 1) % n].y1;
        if (edges[i].y0 - previous).abs() <= tolerance {
            edges[i].y0 = previous;
        }
    }
    edges
}

fn push_arc_pieces(arc: &ArcSegment, edges: &mut Vec<ScanEdge>) {
    let start = arc.start_angle;
    let sweep = arc.sweep();
    let end = start + sweep;

    let mut cuts = vec![start];
    if sweep > 0.0 {
        let mut extremum = FRAC_PI_2 + ((start - FRAC_PI_2) / PI).floor() * PI + PI;
        while extremum < end - SPLIT_EPSILON {
            cuts.push(extremum);
            extremum += PI;
        }
    } else {
        let mut extremum = FRAC_PI_2 + ((start - FRAC_PI_2) / PI).ceil() * PI - PI;
        while extremum > end + SPLIT_EPSILON {
            cuts.push(extremum);
            extremum -= PI;
        }
    }
    cuts.push(end);

    let center = arc.center.as_vec2();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        edges.push(ScanEdge {
            y0: center.y + arc.radius * a.sin(),
            y1: center.y + arc.radius * b.sin(),
            shape: EdgeShape::Arc {
                center,
                radius: arc.radius,
                right: (0.5 * (a + b)).cos() >= 0.0,
            },
        });
    }
}

/// 单个环在扫描线上的内部区间（奇偶规则）。
fn loop_spans(edges: &[ScanEdge], y: f64) -> Vec<(f64, f64)> {
    let mut crossings: Vec<f64> = edges
        .iter()
        .filter(|edge| edge.crosses(y))
        .map(|edge| edge.x_at(y))
        .collect();
    crossings.sort_by(f64::total_cmp);
    if crossings.len() % 2 == 1 {
        warn!(y, count = crossings.len(), "扫描线穿越次数为奇数，丢弃末端交点");
        crossings.pop();
    }
    crossings
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// 合并各环区间：外边界 +1、孔洞 -1，累计为正处填充。
fn covered_spans(scan_loops: &[ScanLoop], y: f64) -> Vec<(f64, f64)> {
    let mut events: Vec<(f64, i32)> = Vec::new();
    for scan_loop in scan_loops {
        for (start, end) in loop_spans(&scan_loop.edges, y) {
            events.push((start, scan_loop.sign));
            events.push((end, -scan_loop.sign));
        }
    }
    events.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut spans = Vec::new();
    let mut depth = 0;
    let mut open: Option<f64> = None;
    let mut i = 0;
    while i < events.len() {
        let x = events[i].0;
        while i < events.len() && events[i].0 == x {
            depth += events[i].1;
            i += 1;
        }
        match (open, depth > 0) {
            (None, true) => open = Some(x),
            (Some(start), false) => {
                spans.push((start, x));
                open = None;
            }
            _ => {}
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use hatchcad_core::document::HatchData;
    use hatchcad_core::pattern::HatchPattern;

    use super::*;
    use crate::topology::{classify_loops, compute_area};

    struct Fixture {
        loops: Vec<BoundaryLoop>,
        signed: Vec<SignedLoop>,
        data: HatchData,
        frame: DAffine2,
        registry: PatternRegistry,
        limits: HatchLimits,
    }

    impl Fixture {
        fn new(loops: Vec<BoundaryLoop>, data: HatchData) -> Self {
            let limits = HatchLimits::default();
            let signed = classify_loops(&loops, limits.tolerance);
            Self {
                loops,
                signed,
                data,
                frame: DAffine2::IDENTITY,
                registry: PatternRegistry::builtin(),
                limits,
            }
        }

        fn request(&self, window: Option<Bounds2D>) -> FillRequest<'_> {
            FillRequest {
                loops: &self.loops,
                signed: &self.signed,
                data: &self.data,
                pattern_frame: self.frame,
                registry: &self.registry,
                limits: self.limits,
                window,
            }
        }

        fn run(&self, window: Option<Bounds2D>, offset: &ContinuationOffset) -> FillOutput {
            generate_fill(&self.request(window), offset).expect("fill generation")
        }
    }

    fn lines(primitives: &[FillPrimitive]) -> Vec<(Point2, Point2)> {
        primitives
            .iter()
            .filter_map(|primitive| match primitive {
                FillPrimitive::Line { start, end } => Some((*start, *end)),
                _ => None,
            })
            .collect()
    }

    fn sorted_keys(primitives: &[FillPrimitive]) -> Vec<[u64; 4]> {
        let mut keys: Vec<[u64; 4]> = lines(primitives)
            .into_iter()
            .map(|(s, e)| [s.x().to_bits(), s.y().to_bits(), e.x().to_bits(), e.y().to_bits()])
            .collect();
        keys.sort_unstable();
        keys
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryLoop {
        BoundaryLoop::rectangle(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn horizontal_lines_span_rectangle() {
        let fixture = Fixture::new(
            vec![rect(0.0, 1.0, 10.0, 11.0)],
            HatchData::pattern("LINE", 1.0, 0.0),
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        let lines = lines(&output.primitives);
        assert_eq!(lines.len(), 3);
        for (k, (start, end)) in lines.iter().enumerate() {
            let y = 3.175 * (k as f64 + 1.0);
            assert!((start.y() - y).abs() < 1e-9 && (end.y() - y).abs() < 1e-9);
            assert!(start.x().abs() < 1e-9);
            assert!((end.x() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn holes_split_lines() {
        let fixture = Fixture::new(
            vec![rect(4.0, 4.0, 6.0, 6.0), rect(0.0, 0.5, 10.0, 10.5)],
            HatchData::pattern("LINE", 0.5, 0.0),
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        let lines = lines(&output.primitives);
        let through_hole: Vec<_> = lines
            .iter()
            .filter(|(start, _)| (start.y() - 4.7625).abs() < 1e-9)
            .collect();
        assert_eq!(through_hole.len(), 2);
        assert!((through_hole[0].1.x() - 4.0).abs() < 1e-9);
        assert!((through_hole[1].0.x() - 6.0).abs() < 1e-9);
        for (start, end) in &lines {
            let mid = start.lerp(*end, 0.5);
            let inside_hole = mid.x() > 4.0 && mid.x() < 6.0 && mid.y() > 4.0 && mid.y() < 6.0;
            assert!(!inside_hole);
        }
    }

    #[test]
    fn arcs_clip_exactly() {
        let fixture = Fixture::new(
            vec![BoundaryLoop::circle(Point2::new(0.0, 0.0), 10.0)],
            HatchData::pattern("LINE", 1.0, 0.0),
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        let lines = lines(&output.primitives);
        // 线序号 -3..=3
        assert_eq!(lines.len(), 7);
        for (start, end) in &lines {
            assert!((start.as_vec2().length() - 10.0).abs() < 1e-9);
            assert!((end.as_vec2().length() - 10.0).abs() < 1e-9);
            assert!(start.x() < end.x());
        }
    }

    #[test]
    fn dashes_follow_phase_and_length() {
        let fixture = Fixture::new(
            vec![rect(0.0, 1.0, 20.0, 4.0)],
            HatchData::pattern("DASH", 1.0, 0.0),
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        let lines = lines(&output.primitives);
        assert_eq!(lines.len(), 3);
        assert!((lines[0].0.x() - 3.175).abs() < 1e-9);
        for (start, end) in &lines {
            assert!((start.distance(*end) - 3.175).abs() < 1e-9);
        }
    }

    #[test]
    fn pattern_frame_scales_spacing() {
        let mut fixture = Fixture::new(
            vec![rect(0.0, 1.0, 10.0, 20.0)],
            HatchData::pattern("LINE", 1.0, 0.0),
        );
        fixture.frame = DAffine2::from_scale(DVec2::new(1.0, 2.0));
        let output = fixture.run(None, &ContinuationOffset::default());
        let ys: Vec<f64> = lines(&output.primitives).iter().map(|(s, _)| s.y()).collect();
        assert_eq!(ys.len(), 3);
        assert!((ys[0] - 6.35).abs() < 1e-9);
        assert!((ys[2] - 19.05).abs() < 1e-9);
    }

    #[test]
    fn solid_fill_emits_single_region_with_roles() {
        let mut data = HatchData::solid();
        data.pattern.name = "DOES_NOT_EXIST".to_string();
        let fixture = Fixture::new(
            vec![rect(0.0, 0.0, 10.0, 10.0), rect(2.0, 2.0, 4.0, 4.0)],
            data,
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        assert_eq!(output.primitives.len(), 1);
        match &output.primitives[0] {
            FillPrimitive::Region(region) => {
                assert_eq!(region.contours.len(), 2);
                assert_eq!(region.contours[1].role, crate::topology::LoopRole::Hole);
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn errors_for_unknown_pattern_and_overflow() {
        let fixture = Fixture::new(
            vec![rect(0.0, 0.0, 1000.0, 1000.0)],
            HatchData::pattern("MISSING", 1.0, 0.0),
        );
        let err =
            generate_fill(&fixture.request(None), &ContinuationOffset::default()).unwrap_err();
        assert_eq!(err, HatchError::PatternNotFound("MISSING".to_string()));

        let mut fixture = Fixture::new(
            vec![rect(0.0, 0.0, 1000.0, 1000.0)],
            HatchData::pattern("LINE", 1.0, 0.0),
        );
        fixture.limits.max_segments = 100;
        let err =
            generate_fill(&fixture.request(None), &ContinuationOffset::default()).unwrap_err();
        assert!(matches!(err, HatchError::AreaTooBig { .. }));

        let fixture = Fixture::new(
            vec![rect(0.0, 0.0, 10.0, 10.0)],
            HatchData::pattern("LINE", 1e-12, 0.0),
        );
        let err =
            generate_fill(&fixture.request(None), &ContinuationOffset::default()).unwrap_err();
        assert!(matches!(err, HatchError::TooSmall { .. }));
    }

    #[test]
    fn generation_is_deterministic() {
        let fixture = Fixture::new(
            vec![
                BoundaryLoop::circle(Point2::new(0.0, 0.0), 25.0),
                rect(-5.0, -5.0, 5.0, 5.0),
            ],
            HatchData::pattern("HONEY", 1.0, 0.4),
        );
        let first = fixture.run(None, &ContinuationOffset::default());
        let second = fixture.run(None, &ContinuationOffset::default());
        assert_eq!(first, second);
        assert!(!first.primitives.is_empty());
    }

    #[test]
    fn adjacent_windows_tile_the_full_pass() {
        let fixture = Fixture::new(
            vec![
                BoundaryLoop::circle(Point2::new(0.0, 0.0), 20.0),
                BoundaryLoop::circle(Point2::new(3.0, -4.0), 5.0),
            ],
            HatchData::pattern("ANSI37", 1.5, 0.3),
        );
        let full = fixture.run(None, &ContinuationOffset::default());

        let bounds = fixture.request(None).bounds();
        let split = 0.7;
        let lower = Bounds2D::new(bounds.min(), Point2::new(bounds.max().x(), split));
        let upper = Bounds2D::new(Point2::new(bounds.min().x(), split), bounds.max());

        let first = fixture.run(Some(lower), &ContinuationOffset::default());
        let second = fixture.run(Some(upper), &first.next_offset);

        let mut tiled = first.primitives.clone();
        tiled.extend(second.primitives.iter().cloned());
        assert_eq!(sorted_keys(&tiled), sorted_keys(&full.primitives));
        assert_eq!(tiled.len(), full.primitives.len());

        // 同一窗口再次续接不会重复输出
        let mut again = second.next_offset.clone();
        assert!(!again.is_fresh());
        assert!(fixture.run(Some(upper), &again).primitives.is_empty());
        again.reset();
        assert!(again.is_fresh());
        assert!(fixture.run(Some(upper), &again).primitives.len() >= second.primitives.len());
    }

    /// 线长乘间距，近似图案线实际覆盖的面积。
    fn covered_area(primitives: &[FillPrimitive], spacing: f64) -> f64 {
        lines(primitives)
            .iter()
            .map(|(start, end)| start.distance(*end) * spacing)
            .sum()
    }

    #[test]
    fn self_intersecting_loops_fill_what_their_area_reports() {
        let bowtie = BoundaryLoop::from_polygon([
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ]);
        let star = BoundaryLoop::from_polygon((0..5u32).map(|k| {
            let angle = (90.0 + 144.0 * f64::from(k)).to_radians();
            Point2::new(10.0 * angle.cos(), 10.0 * angle.sin())
        }));

        for (boundary, relative) in [(bowtie, 0.03), (star, 0.01)] {
            let loops = vec![boundary];
            let area = compute_area(&loops, &HatchLimits::default())
                .expect("even-odd area")
                .total_area;
            let fixture = Fixture::new(loops, HatchData::pattern("LINE", 0.01, 0.0));
            let output = fixture.run(None, &ContinuationOffset::default());
            let filled = covered_area(&output.primitives, 0.03175);
            assert!(
                ((filled - area) / area).abs() < relative,
                "filled {filled} vs area {area}"
            );
        }
    }

    #[test]
    fn dashes_stay_accurate_far_from_origin() {
        let fixture = Fixture::new(
            vec![rect(1e11, 1.0, 1e11 + 20.0, 4.0)],
            HatchData::pattern("DASH", 1.0, 0.0),
        );
        let output = fixture.run(None, &ContinuationOffset::default());
        let lines = lines(&output.primitives);
        assert!(!lines.is_empty());
        for (start, end) in &lines {
            let length = start.distance(*end);
            assert!(length <= 3.175 + 1e-3, "dash length {length}");
            assert!(start.x() >= 1e11 - 1e-3 && end.x() <= 1e11 + 20.0 + 1e-3);
        }

        // 极小比例下周期数超过配额，报错而不是无限循环。
        let fixture = Fixture::new(
            vec![rect(1e11, 0.0, 1e11 + 1.0, 0.3)],
            HatchData::pattern("DASH", 1e-6, 0.0),
        );
        let err = generate_fill(&fixture.request(None), &ContinuationOffset::default());
        assert!(matches!(err, Err(HatchError::AreaTooBig { .. })));
    }

    #[test]
    fn dot_only_families_draw_nothing() {
        let mut fixture = Fixture::new(
            vec![rect(0.0, 0.0, 10.0, 3.0)],
            HatchData::pattern("SPECKS", 1.0, 0.0),
        );
        fixture.registry.register(HatchPattern::new(
            "SPECKS",
            vec![
                PatternFamily::new(0.0, 1.0).with_dashes([0.0]),
                PatternFamily::new(0.0, 1.0).with_dashes([0.0, -0.5]),
            ],
        ));
        let output = fixture.run(None, &ContinuationOffset::default());
        assert!(output.primitives.is_empty());

        fixture.registry.register(HatchPattern::new(
            "SPECKS",
            vec![PatternFamily::new(0.0, 1.0).with_dashes([0.0, -0.5, 0.5, -0.5])],
        ));
        let output = fixture.run(None, &ContinuationOffset::default());
        assert!(!output.primitives.is_empty());
    }

    #[test]
    fn solid_region_is_emitted_once_across_windows() {
        let fixture = Fixture::new(vec![rect(0.0, 0.0, 10.0, 10.0)], HatchData::solid());
        let left = Bounds2D::new(Point2::new(0.0, 0.0), Point2::new(5.0, 10.0));
        let right = Bounds2D::new(Point2::new(5.0, 0.0), Point2::new(10.0, 10.0));

        let first = fixture.run(Some(left), &ContinuationOffset::default());
        assert_eq!(first.primitives.len(), 1);
        assert!(first.next_offset.region_emitted());
        let second = fixture.run(Some(right), &first.next_offset);
        assert!(second.primitives.is_empty());

        let mut offset = second.next_offset;
        offset.reset();
        assert!(offset.is_fresh());
        assert_eq!(fixture.run(Some(right), &offset).primitives.len(), 1);
    }

    #[test]
    fn cursor_merge_keeps_contiguous_hull() {
        let cursor = FamilyCursor::EMPTY.merged(3, 7);
        assert_eq!(cursor, FamilyCursor { first: 3, last: 7 });
        assert!(cursor.contains(7) && !cursor.contains(8));
        assert_eq!(cursor.merged(8, 10), FamilyCursor { first: 3, last: 10 });
        assert_eq!(cursor.merged(-2, 4), FamilyCursor { first: -2, last: 7 });
        assert_eq!(cursor.merged(20, 25), FamilyCursor { first: 20, last: 25 });
        assert_eq!(cursor.merged(5, 4), cursor);
        let pending = pending_ranges(0, 10, cursor);
        assert_eq!(pending, [(0, 2), (8, 10)]);
        assert_eq!(pending.into_iter().map(range_len).sum::<u64>(), 6);
        assert_eq!(range_len((5, 4)), 0);
    }
}
