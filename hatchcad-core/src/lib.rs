pub mod boundary;
pub mod curve;
pub mod pattern;

/// 闭合判定、裁剪比较等几何运算共用的默认容差。
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

pub mod geometry {
    use glam::{DAffine2, DMat2, DVec2};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn lerp(self, other: Point2, t: f64) -> Point2 {
            Self(self.0.lerp(other.0, t))
        }

        #[inline]
        pub fn transformed(self, affine: &DAffine2) -> Point2 {
            Self(affine.transform_point2(self.0))
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算实体范围与视口窗口。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// 由任意两个对角点构造，自动整理最小/最大坐标。
        pub fn from_corners(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
                max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        #[inline]
        pub fn diagonal(&self) -> f64 {
            self.width().hypot(self.height())
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 判断点是否落在框内（含边界，允许 `tolerance` 的外扩）。
        pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
            !self.is_empty()
                && point.x() >= self.min.x() - tolerance
                && point.x() <= self.max.x() + tolerance
                && point.y() >= self.min.y() - tolerance
                && point.y() <= self.max.y() + tolerance
        }

        pub fn contains_bounds(&self, other: &Bounds2D, tolerance: f64) -> bool {
            !other.is_empty()
                && self.contains_point(other.min, tolerance)
                && self.contains_point(other.max, tolerance)
        }

        /// 求交集；不相交时返回空框。
        pub fn intersection(&self, other: &Bounds2D) -> Bounds2D {
            if self.is_empty() || other.is_empty() {
                return Bounds2D::empty();
            }
            let min = self.min.as_vec2().max(other.min.as_vec2());
            let max = self.max.as_vec2().min(other.max.as_vec2());
            if min.x > max.x || min.y > max.y {
                Bounds2D::empty()
            } else {
                Bounds2D::new(Point2::from_vec(min), Point2::from_vec(max))
            }
        }

        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 图元变换。除 `Stretch` 外均可表示为仿射矩阵。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Transform {
        Translate(Vector2),
        Rotate {
            center: Point2,
            angle: f64,
        },
        /// 允许非等比缩放，`factor` 分别作用于 X/Y 轴。
        Scale {
            center: Point2,
            factor: Vector2,
        },
        Mirror {
            axis_start: Point2,
            axis_end: Point2,
        },
        /// 仅移动落在两角点所围窗口内的顶点。
        Stretch {
            first_corner: Point2,
            second_corner: Point2,
            offset: Vector2,
        },
    }

    impl Transform {
        /// 返回对应的仿射矩阵；`Stretch` 是逐顶点编辑，返回 `None`。
        pub fn affine(&self) -> Option<DAffine2> {
            match *self {
                Transform::Translate(offset) => Some(DAffine2::from_translation(offset.0)),
                Transform::Rotate { center, angle } => {
                    Some(about(center, DMat2::from_angle(angle)))
                }
                Transform::Scale { center, factor } => {
                    Some(about(center, DMat2::from_diagonal(factor.0)))
                }
                Transform::Mirror {
                    axis_start,
                    axis_end,
                } => {
                    let axis = axis_end.0 - axis_start.0;
                    if axis.length_squared() <= f64::EPSILON {
                        return Some(DAffine2::IDENTITY);
                    }
                    let u = axis.normalize();
                    let reflection = DMat2::from_cols(
                        DVec2::new(2.0 * u.x * u.x - 1.0, 2.0 * u.x * u.y),
                        DVec2::new(2.0 * u.x * u.y, 2.0 * u.y * u.y - 1.0),
                    );
                    Some(about(axis_start, reflection))
                }
                Transform::Stretch { .. } => None,
            }
        }

        /// 拉伸窗口，仅对 `Stretch` 有意义。
        pub fn stretch_window(&self) -> Option<(Bounds2D, Vector2)> {
            match *self {
                Transform::Stretch {
                    first_corner,
                    second_corner,
                    offset,
                } => Some((Bounds2D::from_corners(first_corner, second_corner), offset)),
                _ => None,
            }
        }

        /// 变换单个点。
        pub fn apply_to_point(&self, point: Point2) -> Point2 {
            match self.affine() {
                Some(affine) => point.transformed(&affine),
                None => match self.stretch_window() {
                    Some((window, offset)) if window.contains_point(point, 0.0) => {
                        point.translate(offset)
                    }
                    _ => point,
                },
            }
        }
    }

    fn about(center: Point2, linear: DMat2) -> DAffine2 {
        DAffine2::from_translation(center.0)
            * DAffine2::from_mat2(linear)
            * DAffine2::from_translation(-center.0)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        #[test]
        fn bounds_intersection_and_containment() {
            let a = Bounds2D::from_corners(Point2::new(10.0, 10.0), Point2::new(0.0, 0.0));
            let b = Bounds2D::new(Point2::new(5.0, -5.0), Point2::new(15.0, 5.0));
            let both = a.intersection(&b);
            assert_eq!(both.min(), Point2::new(5.0, 0.0));
            assert_eq!(both.max(), Point2::new(10.0, 5.0));
            assert!(a.contains_bounds(&both, 0.0));
            assert!(!both.contains_bounds(&a, 0.0));

            let far = Bounds2D::new(Point2::new(20.0, 20.0), Point2::new(30.0, 30.0));
            assert!(a.intersection(&far).is_empty());
            assert!((a.diagonal() - 200f64.sqrt()).abs() < 1e-12);
        }

        #[test]
        fn transforms_map_points() {
            let rotate = Transform::Rotate {
                center: Point2::new(1.0, 0.0),
                angle: FRAC_PI_2,
            };
            let p = rotate.apply_to_point(Point2::new(2.0, 0.0));
            assert!((p.x() - 1.0).abs() < 1e-12);
            assert!((p.y() - 1.0).abs() < 1e-12);

            let mirror = Transform::Mirror {
                axis_start: Point2::new(0.0, 0.0),
                axis_end: Point2::new(1.0, 1.0),
            };
            let q = mirror.apply_to_point(Point2::new(3.0, 1.0));
            assert!((q.x() - 1.0).abs() < 1e-12);
            assert!((q.y() - 3.0).abs() < 1e-12);

            let stretch = Transform::Stretch {
                first_corner: Point2::new(-1.0, -1.0),
                second_corner: Point2::new(1.0, 1.0),
                offset: Vector2::new(5.0, 0.0),
            };
            assert_eq!(stretch.apply_to_point(Point2::new(0.0, 0.0)), Point2::new(5.0, 0.0));
            assert_eq!(stretch.apply_to_point(Point2::new(3.0, 0.0)), Point2::new(3.0, 0.0));
            assert!(stretch.affine().is_none());
        }
    }
}

pub mod document {
    use std::collections::HashMap;

    use glam::DAffine2;
    use serde::{Deserialize, Serialize};

    use crate::boundary::BoundaryLoop;
    use crate::geometry::Bounds2D;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
            }
        }
    }

    /// 填充方式：实体填充或线型图案填充。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FillKind {
        Solid,
        Pattern,
    }

    /// 图案参数。实体填充时依旧保存，便于往返。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PatternStyle {
        pub name: String,
        pub scale: f64,
        /// 弧度，可取任意值，生成时规整到 [0, 2π)。
        pub angle: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HatchData {
        pub fill: FillKind,
        pub pattern: PatternStyle,
    }

    impl HatchData {
        pub fn solid() -> Self {
            Self {
                fill: FillKind::Solid,
                pattern: PatternStyle {
                    name: "ANSI31".to_string(),
                    scale: 1.0,
                    angle: 0.0,
                },
            }
        }

        pub fn pattern(name: impl Into<String>, scale: f64, angle: f64) -> Self {
            Self {
                fill: FillKind::Pattern,
                pattern: PatternStyle {
                    name: name.into(),
                    scale,
                    angle,
                },
            }
        }

        #[inline]
        pub fn is_solid(&self) -> bool {
            matches!(self.fill, FillKind::Solid)
        }
    }

    /// 填充实体的持久化记录：边界环、样式与图案坐标系。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HatchRecord {
        pub layer: String,
        pub data: HatchData,
        pub loops: Vec<BoundaryLoop>,
        /// 图案空间到世界坐标的仿射映射，缺省为单位阵。
        #[serde(default)]
        pub pattern_frame: DAffine2,
    }

    impl HatchRecord {
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for boundary in &self.loops {
                bounds.include_bounds(&boundary.bounds());
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        hatches: Vec<(EntityId, HatchRecord)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_hatch(&mut self, record: HatchRecord) -> EntityId {
            self.ensure_layer(&record.layer);
            let id = self.next_id();
            self.hatches.push((id, record));
            id
        }

        /// 以指定 ID 插入，用于从场景回写文档。
        pub fn insert_hatch(&mut self, id: EntityId, record: HatchRecord) {
            self.ensure_layer(&record.layer);
            self.next_entity_id = self.next_entity_id.max(id.get() + 1);
            self.hatches.push((id, record));
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        #[inline]
        pub fn hatches(&self) -> impl Iterator<Item = &(EntityId, HatchRecord)> {
            self.hatches.iter()
        }

        pub fn hatch(&self, id: EntityId) -> Option<&HatchRecord> {
            self.hatches
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, record)| record)
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for (_, record) in &self.hatches {
                if let Some(record_bounds) = record.bounds() {
                    bounds.include_bounds(&record_bounds);
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        #[inline]
        pub fn next_entity_id(&self) -> u64 {
            self.next_entity_id
        }

        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::Point2;

        #[test]
        fn document_stores_hatches() {
            let mut doc = Document::new();
            let square = BoundaryLoop::rectangle(Point2::new(0.0, 0.0), Point2::new(10.0, 5.0));
            let id = doc.add_hatch(HatchRecord {
                layer: "HATCH".to_string(),
                data: HatchData::pattern("ANSI31", 2.0, 0.5),
                loops: vec![square],
                pattern_frame: DAffine2::IDENTITY,
            });
            let solid_id = doc.add_hatch(HatchRecord {
                layer: "0".to_string(),
                data: HatchData::solid(),
                loops: vec![BoundaryLoop::circle(Point2::new(20.0, 0.0), 2.0)],
                pattern_frame: DAffine2::IDENTITY,
            });

            assert_eq!(id.get(), 0);
            assert_eq!(solid_id.get(), 1);
            assert_eq!(doc.hatches().count(), 2);
            let layers: Vec<_> = doc.layers().map(|l| l.name.clone()).collect();
            assert!(layers.contains(&"0".to_string()));
            assert!(layers.contains(&"HATCH".to_string()));

            let record = doc.hatch(solid_id).expect("solid hatch missing");
            assert!(record.data.is_solid());
            assert_eq!(record.data.pattern.name, "ANSI31");

            let bounds = doc.bounds().expect("document bounds should exist");
            assert!((bounds.min().x() - 0.0).abs() < 1e-9);
            assert!((bounds.min().y() + 2.0).abs() < 1e-9);
            assert!((bounds.max().x() - 22.0).abs() < 1e-9);
            assert!((bounds.max().y() - 5.0).abs() < 1e-9);
        }

        #[test]
        fn insert_hatch_advances_id_allocator() {
            let mut doc = Document::new();
            doc.insert_hatch(
                EntityId::new(7),
                HatchRecord {
                    layer: "0".to_string(),
                    data: HatchData::solid(),
                    loops: Vec::new(),
                    pattern_frame: DAffine2::IDENTITY,
                },
            );
            assert_eq!(doc.next_entity_id(), 8);
            assert!(doc.bounds().is_none());
        }
    }
}
