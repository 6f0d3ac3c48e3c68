//! 边界环：由首尾相接的图元组成的一条闭合轮廓（外边界或孔洞）。

use serde::{Deserialize, Serialize};

use crate::curve::{Curve, Segment, full_circle};
use crate::geometry::{Bounds2D, Point2, Transform};

/// 闭合轮廓。包围盒随每次修改重新计算，序列化时仅保存图元列表。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct BoundaryLoop {
    segments: Vec<Segment>,
    bounds: Bounds2D,
}

impl BoundaryLoop {
    pub fn new(segments: Vec<Segment>) -> Self {
        let mut boundary = Self {
            segments,
            bounds: Bounds2D::empty(),
        };
        boundary.refresh_bounds();
        boundary
    }

    /// 由顶点序列构造闭合多边形，末点自动连回首点。
    pub fn from_polygon<I>(vertices: I) -> Self
    where
        I: IntoIterator<Item = Point2>,
    {
        let points: Vec<Point2> = vertices.into_iter().collect();
        let segments = (0..points.len())
            .map(|i| Segment::line(points[i], points[(i + 1) % points.len()]))
            .collect();
        Self::new(segments)
    }

    pub fn rectangle(min: Point2, max: Point2) -> Self {
        Self::from_polygon([
            min,
            Point2::new(max.x(), min.y()),
            max,
            Point2::new(min.x(), max.y()),
        ])
    }

    pub fn circle(center: Point2, radius: f64) -> Self {
        Self::new(vec![full_circle(center, radius)])
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    pub fn push(&mut self, segment: Segment) {
        self.bounds.include_bounds(&segment.bounds());
        self.segments.push(segment);
    }

    /// 末段终点到首段起点的距离；空环返回 `None`。
    pub fn closure_gap(&self) -> Option<f64> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(last.end().distance(first.start()))
    }

    #[inline]
    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.closure_gap().is_some_and(|gap| gap <= tolerance)
    }

    /// 第一个与前一段不相接的图元序号。
    pub fn first_gap(&self, tolerance: f64) -> Option<usize> {
        self.segments
            .windows(2)
            .position(|pair| pair[0].end().distance(pair[1].start()) > tolerance)
            .map(|index| index + 1)
    }

    /// 在容差内互不重合的顶点数量。
    pub fn distinct_vertex_count(&self, tolerance: f64) -> usize {
        let mut vertices: Vec<Point2> = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            for point in [segment.start(), segment.end()] {
                if !vertices.iter().any(|known| known.distance(point) <= tolerance) {
                    vertices.push(point);
                }
            }
        }
        vertices.len()
    }

    #[inline]
    pub fn has_arc(&self) -> bool {
        self.segments.iter().any(Segment::is_arc)
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(Curve::length).sum()
    }

    /// 贪心整理图元顺序与方向，使无序给出的轮廓首尾相接。
    /// 无法接续的图元按原顺序追加，留给校验阶段报告缺口。
    pub fn optimize_contour(&mut self, tolerance: f64) {
        if self.segments.len() < 2 {
            return;
        }
        let mut remaining: Vec<Segment> = self.segments.split_off(1);
        let mut ordered = std::mem::take(&mut self.segments);
        while !remaining.is_empty() {
            let Some(tail) = ordered.last().map(Curve::end) else {
                break;
            };
            let next = remaining.iter().enumerate().find_map(|(index, segment)| {
                if segment.start().distance(tail) <= tolerance {
                    Some((index, false))
                } else if segment.end().distance(tail) <= tolerance {
                    Some((index, true))
                } else {
                    None
                }
            });
            match next {
                Some((index, reverse)) => {
                    let segment = remaining.remove(index);
                    ordered.push(if reverse { segment.reversed() } else { segment });
                }
                None => {
                    ordered.append(&mut remaining);
                }
            }
        }
        self.segments = ordered;
        self.refresh_bounds();
    }

    /// 对全部图元施加变换。
    pub fn apply_transform(&mut self, transform: &Transform) {
        self.segments = self
            .segments
            .iter()
            .flat_map(|segment| segment.apply_transform(transform))
            .collect();
        self.refresh_bounds();
    }

    pub fn transformed(&self, transform: &Transform) -> BoundaryLoop {
        let mut copy = self.clone();
        copy.apply_transform(transform);
        copy
    }

    /// 离散为多边形顶点（不重复闭合点）。
    pub fn flatten(&self, tolerance: f64) -> Vec<Point2> {
        let mut points = Vec::new();
        for segment in &self.segments {
            let flattened = segment.flatten(tolerance);
            points.extend_from_slice(&flattened[..flattened.len() - 1]);
        }
        points
    }

    /// 射线法判断点是否位于轮廓内（奇偶规则，圆弧按容差离散）。
    pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        if !self.bounds.contains_point(point, tolerance) {
            return false;
        }
        let polygon = self.flatten(tolerance);
        let n = polygon.len();
        if n < 3 {
            return false;
        }
        let (px, py) = (point.x(), point.y());
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (polygon[i].x(), polygon[i].y());
            let (xj, yj) = (polygon[j].x(), polygon[j].y());
            if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn distance_to_point(&self, point: Point2) -> f64 {
        self.segments
            .iter()
            .map(|segment| segment.distance_to_point(point))
            .fold(f64::INFINITY, f64::min)
    }

    /// 轮廓上的代表点，用于嵌套判定。
    pub fn sample_point(&self) -> Option<Point2> {
        self.segments.first().map(Segment::midpoint)
    }

    fn refresh_bounds(&mut self) {
        let mut bounds = Bounds2D::empty();
        for segment in &self.segments {
            bounds.include_bounds(&segment.bounds());
        }
        self.bounds = bounds;
    }
}

impl From<Vec<Segment>> for BoundaryLoop {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

impl From<BoundaryLoop> for Vec<Segment> {
    fn from(boundary: BoundaryLoop) -> Self {
        boundary.segments
    }
}
