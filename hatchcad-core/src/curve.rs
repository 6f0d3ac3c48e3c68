//! 边界图元：直线段与圆弧，以及填充边界所需的曲线能力集。

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds2D, Point2, Transform};

const ANGLE_EPSILON: f64 = 1e-12;
const PARAM_EPSILON: f64 = 1e-9;

/// 非等比缩放圆弧时的离散化精度（相对半径）。
const ARC_FLATTEN_RATIO: f64 = 1e-4;

/// 填充边界图元需要提供的能力。
pub trait Curve {
    fn start(&self) -> Point2;
    fn end(&self) -> Point2;
    fn length(&self) -> f64;
    fn bounds(&self) -> Bounds2D;
    fn distance_to_point(&self, point: Point2) -> f64;
    /// 与另一图元的全部交点（忽略共线重叠）。
    fn intersect_with(&self, other: &Segment) -> Vec<Point2>;
    /// 变换后的图元。圆弧在非等比缩放下会离散为多段直线。
    fn apply_transform(&self, transform: &Transform) -> Vec<Segment>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point2,
    pub end: Point2,
}

impl LineSegment {
    #[inline]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn direction(&self) -> DVec2 {
        self.end.0 - self.start.0
    }

    /// 与无限直线 `origin + t * direction` 的交点参数（相对本线段为 [0, 1]）。
    fn crossing_params(&self, origin: DVec2, direction: DVec2) -> Option<(f64, f64)> {
        let own = self.direction();
        let denom = cross(own, direction);
        if denom.abs() <= f64::EPSILON * own.length() * direction.length() {
            return None;
        }
        let delta = origin - self.start.0;
        let u = cross(delta, direction) / denom;
        let t = cross(delta, own) / denom;
        Some((u, t))
    }
}

impl Curve for LineSegment {
    fn start(&self) -> Point2 {
        self.start
    }

    fn end(&self) -> Point2 {
        self.end
    }

    fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    fn bounds(&self) -> Bounds2D {
        Bounds2D::from_corners(self.start, self.end)
    }

    fn distance_to_point(&self, point: Point2) -> f64 {
        let dir = self.direction();
        let len_sq = dir.length_squared();
        if len_sq <= f64::EPSILON {
            return self.start.distance(point);
        }
        let t = ((point.0 - self.start.0).dot(dir) / len_sq).clamp(0.0, 1.0);
        self.start.lerp(self.end, t).distance(point)
    }

    fn intersect_with(&self, other: &Segment) -> Vec<Point2> {
        match other {
            Segment::Line(line) => line_line_intersections(self, line),
            Segment::Arc(arc) => line_arc_intersections(self, arc),
        }
    }

    fn apply_transform(&self, transform: &Transform) -> Vec<Segment> {
        let moved = LineSegment::new(
            transform.apply_to_point(self.start),
            transform.apply_to_point(self.end),
        );
        vec![Segment::Line(moved)]
    }
}

/// 圆弧，角度为弧度；`is_counter_clockwise` 决定扫掠方向，起止角相同表示整圆。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub is_counter_clockwise: bool,
}

impl ArcSegment {
    pub fn new(
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        is_counter_clockwise: bool,
    ) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
            is_counter_clockwise,
        }
    }

    /// 以 DXF 凸度（bulge）描述的圆弧；凸度接近 0 时退化为直线段。
    pub fn from_bulge(start: Point2, end: Point2, bulge: f64) -> Segment {
        let chord = end.0 - start.0;
        let chord_len = chord.length();
        if bulge.abs() <= 1e-9 || chord_len <= f64::EPSILON {
            return Segment::Line(LineSegment::new(start, end));
        }
        let theta = 4.0 * bulge.atan();
        let radius = chord_len / (2.0 * (theta / 2.0).sin().abs());
        let midpoint = (start.0 + end.0) * 0.5;
        let perp = DVec2::new(-chord.y, chord.x) / chord_len;
        // 圆心到弦中点的有向距离
        let apothem = chord_len / 2.0 / (theta / 2.0).tan();
        let center = midpoint + perp * apothem;
        let start_dir = start.0 - center;
        let end_dir = end.0 - center;
        Segment::Arc(ArcSegment {
            center: Point2::from_vec(center),
            radius,
            start_angle: start_dir.y.atan2(start_dir.x),
            end_angle: end_dir.y.atan2(end_dir.x),
            is_counter_clockwise: theta > 0.0,
        })
    }

    /// 有符号扫掠角，逆时针为正，整圆为 ±2π。
    pub fn sweep(&self) -> f64 {
        let raw = if self.is_counter_clockwise {
            normalize_angle(self.end_angle - self.start_angle)
        } else {
            normalize_angle(self.start_angle - self.end_angle)
        };
        let span = if raw <= ANGLE_EPSILON { TAU } else { raw };
        if self.is_counter_clockwise { span } else { -span }
    }

    #[inline]
    pub fn bulge(&self) -> f64 {
        (self.sweep() / 4.0).tan()
    }

    #[inline]
    pub fn point_at_angle(&self, angle: f64) -> Point2 {
        Point2::from_vec(self.center.0 + DVec2::new(angle.cos(), angle.sin()) * self.radius)
    }

    pub fn midpoint(&self) -> Point2 {
        self.point_at_angle(self.start_angle + self.sweep() / 2.0)
    }

    /// 判断角度是否落在圆弧扫掠范围内。
    pub fn contains_angle(&self, angle: f64) -> bool {
        let sweep = self.sweep();
        let offset = if sweep >= 0.0 {
            normalize_angle(angle - self.start_angle)
        } else {
            normalize_angle(self.start_angle - angle)
        };
        offset <= sweep.abs() + PARAM_EPSILON || offset >= TAU - PARAM_EPSILON
    }

    pub fn reversed(&self) -> ArcSegment {
        ArcSegment {
            center: self.center,
            radius: self.radius,
            start_angle: self.end_angle,
            end_angle: self.start_angle,
            is_counter_clockwise: !self.is_counter_clockwise,
        }
    }

    /// 离散为折线点（含起点与终点），弦高误差不超过 `tolerance`。
    pub fn flatten(&self, tolerance: f64) -> Vec<Point2> {
        let sweep = self.sweep();
        let max_step = if tolerance >= self.radius || self.radius <= f64::EPSILON {
            FRAC_PI_2
        } else {
            (2.0 * (1.0 - tolerance / self.radius).acos()).clamp(1e-3, FRAC_PI_2)
        };
        let steps = ((sweep.abs() / max_step).ceil() as usize).max(2);
        (0..=steps)
            .map(|i| self.point_at_angle(self.start_angle + sweep * (i as f64 / steps as f64)))
            .collect()
    }

    fn mapped_by_affine(&self, affine: &DAffine2) -> Vec<Segment> {
        let linear = affine.matrix2;
        let col_x = linear.x_axis;
        let col_y = linear.y_axis;
        let conformal = (col_x.length() - col_y.length()).abs()
            <= 1e-12 * col_x.length().max(col_y.length())
            && col_x.dot(col_y).abs() <= 1e-12 * col_x.length_squared().max(1.0);
        let center = self.center.transformed(affine);
        if !conformal {
            let points = self.flatten(self.radius * ARC_FLATTEN_RATIO);
            return points
                .windows(2)
                .map(|pair| {
                    Segment::Line(LineSegment::new(
                        pair[0].transformed(affine),
                        pair[1].transformed(affine),
                    ))
                })
                .collect();
        }
        let preserves_orientation = linear.determinant() > 0.0;
        let map_angle = |angle: f64| {
            let dir = linear * DVec2::new(angle.cos(), angle.sin());
            dir.y.atan2(dir.x)
        };
        let mapped = ArcSegment {
            center,
            radius: self.radius * col_x.length(),
            start_angle: map_angle(self.start_angle),
            end_angle: map_angle(self.end_angle),
            is_counter_clockwise: self.is_counter_clockwise == preserves_orientation,
        };
        vec![Segment::Arc(mapped)]
    }
}

impl Curve for ArcSegment {
    fn start(&self) -> Point2 {
        self.point_at_angle(self.start_angle)
    }

    fn end(&self) -> Point2 {
        self.point_at_angle(self.end_angle)
    }

    fn length(&self) -> f64 {
        self.radius * self.sweep().abs()
    }

    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        bounds.include_point(self.start());
        bounds.include_point(self.end());
        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for angle in QUADRANTS {
            if self.contains_angle(angle) {
                bounds.include_point(self.point_at_angle(angle));
            }
        }
        bounds
    }

    fn distance_to_point(&self, point: Point2) -> f64 {
        let offset = point.0 - self.center.0;
        let dist = offset.length();
        if dist <= f64::EPSILON {
            return self.radius;
        }
        if self.contains_angle(offset.y.atan2(offset.x)) {
            (dist - self.radius).abs()
        } else {
            self.start().distance(point).min(self.end().distance(point))
        }
    }

    fn intersect_with(&self, other: &Segment) -> Vec<Point2> {
        match other {
            Segment::Line(line) => line_arc_intersections(line, self),
            Segment::Arc(arc) => arc_arc_intersections(self, arc),
        }
    }

    fn apply_transform(&self, transform: &Transform) -> Vec<Segment> {
        if let Some(affine) = transform.affine() {
            return self.mapped_by_affine(&affine);
        }
        let Some((window, offset)) = transform.stretch_window() else {
            return vec![Segment::Arc(*self)];
        };
        let start_inside = window.contains_point(self.start(), 0.0);
        let end_inside = window.contains_point(self.end(), 0.0);
        match (start_inside, end_inside) {
            (true, true) => {
                let mut moved = *self;
                moved.center = moved.center.translate(offset);
                vec![Segment::Arc(moved)]
            }
            (false, false) => vec![Segment::Arc(*self)],
            _ => {
                let start = transform.apply_to_point(self.start());
                let end = transform.apply_to_point(self.end());
                vec![ArcSegment::from_bulge(start, end, self.bulge())]
            }
        }
    }
}

/// 填充边界由直线段与圆弧组成。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Line(LineSegment),
    Arc(ArcSegment),
}

impl Segment {
    #[inline]
    pub fn line(start: Point2, end: Point2) -> Self {
        Segment::Line(LineSegment::new(start, end))
    }

    pub fn reversed(&self) -> Segment {
        match self {
            Segment::Line(line) => Segment::line(line.end, line.start),
            Segment::Arc(arc) => Segment::Arc(arc.reversed()),
        }
    }

    pub fn midpoint(&self) -> Point2 {
        match self {
            Segment::Line(line) => line.start.lerp(line.end, 0.5),
            Segment::Arc(arc) => arc.midpoint(),
        }
    }

    /// 离散点序列，含起点与终点。
    pub fn flatten(&self, tolerance: f64) -> Vec<Point2> {
        match self {
            Segment::Line(line) => vec![line.start, line.end],
            Segment::Arc(arc) => arc.flatten(tolerance),
        }
    }

    #[inline]
    pub fn is_arc(&self) -> bool {
        matches!(self, Segment::Arc(_))
    }
}

impl Curve for Segment {
    fn start(&self) -> Point2 {
        match self {
            Segment::Line(line) => line.start(),
            Segment::Arc(arc) => arc.start(),
        }
    }

    fn end(&self) -> Point2 {
        match self {
            Segment::Line(line) => line.end(),
            Segment::Arc(arc) => arc.end(),
        }
    }

    fn length(&self) -> f64 {
        match self {
            Segment::Line(line) => line.length(),
            Segment::Arc(arc) => arc.length(),
        }
    }

    fn bounds(&self) -> Bounds2D {
        match self {
            Segment::Line(line) => line.bounds(),
            Segment::Arc(arc) => arc.bounds(),
        }
    }

    fn distance_to_point(&self, point: Point2) -> f64 {
        match self {
            Segment::Line(line) => line.distance_to_point(point),
            Segment::Arc(arc) => arc.distance_to_point(point),
        }
    }

    fn intersect_with(&self, other: &Segment) -> Vec<Point2> {
        match self {
            Segment::Line(line) => line.intersect_with(other),
            Segment::Arc(arc) => arc.intersect_with(other),
        }
    }

    fn apply_transform(&self, transform: &Transform) -> Vec<Segment> {
        match self {
            Segment::Line(line) => line.apply_transform(transform),
            Segment::Arc(arc) => arc.apply_transform(transform),
        }
    }
}

/// 将角度规整到 [0, 2π)。
pub fn normalize_angle(angle: f64) -> f64 {
    let mut result = angle % TAU;
    if result < 0.0 {
        result += TAU;
    }
    if result >= TAU { 0.0 } else { result }
}

#[inline]
fn cross(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

#[inline]
fn within_unit(t: f64) -> bool {
    (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&t)
}

fn line_line_intersections(a: &LineSegment, b: &LineSegment) -> Vec<Point2> {
    match a.crossing_params(b.start.0, b.direction()) {
        Some((u, t)) if within_unit(u) && within_unit(t) => vec![a.start.lerp(a.end, u)],
        _ => Vec::new(),
    }
}

/// 直线 `origin + t * direction` 与整圆的交点参数。
fn circle_line_params(center: Point2, radius: f64, origin: DVec2, direction: DVec2) -> Vec<f64> {
    let a = direction.length_squared();
    if a <= f64::EPSILON {
        return Vec::new();
    }
    let delta = origin - center.0;
    let b = 2.0 * delta.dot(direction);
    let c = delta.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    let root = disc.sqrt();
    vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
}

fn line_arc_intersections(line: &LineSegment, arc: &ArcSegment) -> Vec<Point2> {
    circle_line_params(arc.center, arc.radius, line.start.0, line.direction())
        .into_iter()
        .filter(|t| within_unit(*t))
        .map(|t| line.start.lerp(line.end, t))
        .filter(|p| {
            let offset = p.0 - arc.center.0;
            arc.contains_angle(offset.y.atan2(offset.x))
        })
        .collect()
}

fn arc_arc_intersections(a: &ArcSegment, b: &ArcSegment) -> Vec<Point2> {
    let between = b.center.0 - a.center.0;
    let d = between.length();
    if d <= f64::EPSILON || d > a.radius + b.radius || d < (a.radius - b.radius).abs() {
        return Vec::new();
    }
    let along = (a.radius * a.radius - b.radius * b.radius + d * d) / (2.0 * d);
    let h = (a.radius * a.radius - along * along).max(0.0).sqrt();
    let dir = between / d;
    let base = a.center.0 + dir * along;
    let perp = DVec2::new(-dir.y, dir.x) * h;
    let mut candidates = vec![base + perp];
    if h > f64::EPSILON {
        candidates.push(base - perp);
    }
    candidates
        .into_iter()
        .filter(|p| {
            let on_a = *p - a.center.0;
            let on_b = *p - b.center.0;
            a.contains_angle(on_a.y.atan2(on_a.x)) && b.contains_angle(on_b.y.atan2(on_b.x))
        })
        .map(Point2::from_vec)
        .collect()
}

/// 以点为中心的整圆，便于构造圆形边界。
pub fn full_circle(center: Point2, radius: f64) -> Segment {
    Segment::Arc(ArcSegment::new(center, radius, 0.0, 0.0, true))
}
