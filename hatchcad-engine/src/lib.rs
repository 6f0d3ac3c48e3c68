pub mod command;
pub mod fill;
pub mod hatch;
pub mod pattern;
pub mod render;
pub mod topology;
pub mod validate;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("pattern scale must be positive and finite, got {0}")]
        InvalidScale(f64),
    }

    /// 轮廓无效的具体原因。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ContourDefect {
        #[error("contour has no segments")]
        Empty,
        #[error("contour has fewer than two distinct vertices")]
        Degenerate,
        #[error("segment {segment} does not start where the previous one ends")]
        Gap { segment: usize },
        #[error("contour is open, closing gap is {gap}")]
        Open { gap: f64 },
    }

    /// 填充更新失败的原因，记录在实体状态中而不向外传播。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum HatchError {
        #[error("loop {loop_index} is not a valid contour: {defect}")]
        InvalidContour {
            loop_index: usize,
            defect: ContourDefect,
        },
        #[error("hatch pattern `{0}` not found")]
        PatternNotFound(String),
        #[error("hatch area {area} is below the minimum")]
        TooSmall { area: f64 },
        #[error("hatch area {area} is too big to fill")]
        AreaTooBig { area: f64 },
    }

    impl HatchError {
        pub fn kind(&self) -> UpdateError {
            match self {
                HatchError::InvalidContour { .. } => UpdateError::InvalidContour,
                HatchError::PatternNotFound(_) => UpdateError::PatternNotFound,
                HatchError::TooSmall { .. } => UpdateError::TooSmall,
                HatchError::AreaTooBig { .. } => UpdateError::AreaTooBig,
            }
        }
    }

    /// 最近一次更新的结果代码。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum UpdateError {
        Undefined,
        Ok,
        InvalidContour,
        PatternNotFound,
        TooSmall,
        AreaTooBig,
    }
}

pub mod limits {
    use hatchcad_core::DEFAULT_TOLERANCE;

    /// 校验与图案生成使用的数值阈值。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct HatchLimits {
        /// 闭合判定与裁剪比较的容差 ε。
        pub tolerance: f64,
        /// 轮廓包围盒对角线下限。
        pub min_size: f64,
        pub min_area: f64,
        pub max_area: f64,
        /// 单次生成允许的图案线段上限。
        pub max_segments: usize,
    }

    impl Default for HatchLimits {
        fn default() -> Self {
            Self {
                tolerance: DEFAULT_TOLERANCE,
                min_size: 1e-6,
                min_area: 1e-6,
                max_area: 1e12,
                max_segments: 200_000,
            }
        }
    }
}

pub mod scene {
    use std::collections::HashSet;
    use std::sync::Arc;

    use hatchcad_core::boundary::BoundaryLoop;
    use hatchcad_core::curve::{ArcSegment, Segment};
    use hatchcad_core::document::{Document, EntityId, HatchData};
    use hatchcad_core::geometry::{Bounds2D, Point2, Vector2};
    use tracing::debug;

    use crate::errors::EngineError;
    use crate::fill::ContinuationOffset;
    use crate::hatch::Hatch;
    use crate::limits::HatchLimits;
    use crate::pattern::PatternRegistry;
    use crate::render::{RenderTarget, ViewContext};

    const DEFAULT_ZOOM: f64 = 1.0;
    const MIN_ZOOM: f64 = 0.01;
    const MAX_ZOOM: f64 = 1_000.0;

    /// 记录视口状态（中心点与缩放）。
    #[derive(Debug, Clone, Copy)]
    pub struct ViewportState {
        pub center: Point2,
        pub zoom: f64,
    }

    impl ViewportState {
        #[inline]
        fn clamp_zoom(value: f64) -> f64 {
            value.clamp(MIN_ZOOM, MAX_ZOOM)
        }

        /// 给定屏幕尺寸（世界单位，缩放为 1 时）下的可见窗口。
        pub fn visible_window(&self, view_size: Vector2) -> Bounds2D {
            let half = view_size.as_vec2().abs() * (0.5 / self.zoom);
            Bounds2D::new(
                Point2::from_vec(self.center.as_vec2() - half),
                Point2::from_vec(self.center.as_vec2() + half),
            )
        }
    }

    impl Default for ViewportState {
        fn default() -> Self {
            Self {
                center: Point2::new(0.0, 0.0),
                zoom: DEFAULT_ZOOM,
            }
        }
    }

    /// 引擎层负责维护填充实体集合和运行时状态（选中集、视图设置等）。
    #[derive(Debug)]
    pub struct Scene {
        hatches: Vec<(EntityId, Hatch)>,
        next_entity_id: u64,
        registry: Arc<PatternRegistry>,
        limits: HatchLimits,
        selected: HashSet<EntityId>,
        viewport: ViewportState,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct DemoEntities {
        pub plate: EntityId,
        pub disc: EntityId,
        pub grid: EntityId,
        pub broken: EntityId,
    }

    impl Scene {
        pub fn new(registry: Arc<PatternRegistry>, limits: HatchLimits) -> Self {
            Self {
                hatches: Vec::new(),
                next_entity_id: 0,
                registry,
                limits,
                selected: HashSet::new(),
                viewport: ViewportState::default(),
            }
        }

        /// 使用现有文档初始化场景。
        pub fn with_document(
            document: Document,
            registry: Arc<PatternRegistry>,
            limits: HatchLimits,
        ) -> Self {
            let mut scene = Self::new(registry, limits);
            scene.load_document(document);
            scene
        }

        /// 替换当前全部实体并重置运行时状态。
        pub fn load_document(&mut self, document: Document) {
            self.hatches = document
                .hatches()
                .map(|(id, record)| {
                    let hatch =
                        Hatch::from_record(record.clone(), Arc::clone(&self.registry), self.limits);
                    (*id, hatch)
                })
                .collect();
            self.next_entity_id = document.next_entity_id();
            self.selected.clear();
            self.viewport = ViewportState::default();

            if let Some(bounds) = self.bounds() {
                self.viewport.center = bounds.center();
            }
        }

        /// 导出为可持久化的文档。
        pub fn to_document(&self) -> Document {
            let mut document = Document::new();
            for (id, hatch) in &self.hatches {
                document.insert_hatch(*id, hatch.to_record());
            }
            document
        }

        pub fn add_hatch(
            &mut self,
            data: HatchData,
            loops: Vec<BoundaryLoop>,
            layer: impl Into<String>,
        ) -> EntityId {
            let mut hatch = Hatch::new(data, Arc::clone(&self.registry), self.limits);
            hatch.set_layer(layer);
            for boundary in loops {
                hatch.add_loop(boundary);
            }
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            self.hatches.push((id, hatch));
            id
        }

        #[inline]
        pub fn registry(&self) -> &Arc<PatternRegistry> {
            &self.registry
        }

        #[inline]
        pub fn limits(&self) -> HatchLimits {
            self.limits
        }

        pub fn hatch(&self, id: EntityId) -> Option<&Hatch> {
            self.hatches
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, hatch)| hatch)
        }

        pub fn hatch_mut(&mut self, id: EntityId) -> Result<&mut Hatch, EngineError> {
            self.hatches
                .iter_mut()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, hatch)| hatch)
                .ok_or(EngineError::EntityNotFound(id.get()))
        }

        #[inline]
        pub fn hatches(&self) -> impl Iterator<Item = &(EntityId, Hatch)> {
            self.hatches.iter()
        }

        #[inline]
        pub fn hatches_mut(&mut self) -> impl Iterator<Item = &mut (EntityId, Hatch)> {
            self.hatches.iter_mut()
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for (_, hatch) in &self.hatches {
                bounds.include_bounds(&hatch.bounds());
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// 返回当前选中实体数量。
        #[inline]
        pub fn selection_len(&self) -> usize {
            self.selected.len()
        }

        #[inline]
        pub fn is_selected(&self, id: EntityId) -> bool {
            self.selected.contains(&id)
        }

        /// 选中指定实体。若实体不存在则返回错误。
        pub fn select(&mut self, id: EntityId) -> Result<(), EngineError> {
            if self.hatch(id).is_none() {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            self.selected.insert(id);
            Ok(())
        }

        /// 取消选中指定实体，返回之前是否处于选中状态。
        pub fn deselect(&mut self, id: EntityId) -> bool {
            self.selected.remove(&id)
        }

        /// 切换实体选中状态，返回切换后的状态。
        pub fn toggle_selection(&mut self, id: EntityId) -> Result<bool, EngineError> {
            if self.hatch(id).is_none() {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            if !self.selected.insert(id) {
                self.selected.remove(&id);
                Ok(false)
            } else {
                Ok(true)
            }
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selected.clear();
        }

        /// 以 ID 升序返回当前选中实体。
        pub fn selection(&self) -> Vec<EntityId> {
            let mut ids: Vec<EntityId> = self.selected.iter().copied().collect();
            ids.sort_by_key(|id| id.get());
            ids
        }

        pub fn selection_bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for id in &self.selected {
                if let Some(hatch) = self.hatch(*id) {
                    bounds.include_bounds(&hatch.bounds());
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// 拾取距离 `point` 最近且不超过 `tolerance` 的填充。
        pub fn pick(&self, point: Point2, tolerance: f64) -> Option<EntityId> {
            self.hatches
                .iter()
                .map(|(id, hatch)| (*id, hatch.distance_to_point(point)))
                .filter(|(_, distance)| *distance <= tolerance)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        }

        #[inline]
        pub fn viewport(&self) -> ViewportState {
            self.viewport
        }

        #[inline]
        pub fn reset_viewport(&mut self) {
            self.viewport = ViewportState::default();
        }

        #[inline]
        pub fn set_viewport_center(&mut self, center: Point2) {
            self.viewport.center = center;
        }

        pub fn pan_viewport(&mut self, delta: Vector2) {
            self.viewport.center = self.viewport.center.translate(delta);
        }

        /// 设置缩放倍数（自动限制在合法范围内）。
        pub fn set_viewport_zoom(&mut self, zoom: f64) {
            self.viewport.zoom = ViewportState::clamp_zoom(zoom);
        }

        pub fn scale_viewport_zoom(&mut self, factor: f64) {
            let current = self.viewport.zoom;
            let target = if factor.is_finite() {
                current * factor
            } else {
                current
            };
            self.set_viewport_zoom(target);
        }

        /// 聚焦当前选中实体，若为空则退化到全部实体范围。
        pub fn focus_on_selection(&mut self) {
            let target = self.selection_bounds().or_else(|| self.bounds());
            if let Some(bounds) = target {
                self.viewport.center = bounds.center();
            }
        }

        /// 绘制视口内的全部填充，返回输出的图元数量。
        pub fn draw_visible(
            &mut self,
            target: &mut dyn RenderTarget,
            view_size: Vector2,
            outline_invalid: bool,
        ) -> usize {
            let view = ViewContext {
                window: Some(self.viewport.visible_window(view_size)),
                outline_invalid,
            };
            let mut counter = CountingTarget {
                inner: target,
                count: 0,
            };
            for (_, hatch) in &mut self.hatches {
                let mut offset = ContinuationOffset::default();
                hatch.draw(&mut counter, &view, &mut offset);
            }
            counter.count
        }

        /// 为 CLI / 快速验证填充一组示例实体，返回关键实体 ID。
        pub fn populate_demo(&mut self) -> DemoEntities {
            use std::f64::consts::{FRAC_PI_6, PI};

            self.clear_selection();

            let outer = BoundaryLoop::rectangle(Point2::new(0.0, 0.0), Point2::new(100.0, 60.0));
            let hole = BoundaryLoop::circle(Point2::new(30.0, 30.0), 12.0);
            let plate = self.add_hatch(
                HatchData::pattern("ANSI31", 1.0, 0.0),
                vec![hole, outer],
                "HATCH",
            );

            let disc = self.add_hatch(
                HatchData::solid(),
                vec![BoundaryLoop::circle(Point2::new(75.0, 30.0), 10.0)],
                "FILL",
            );

            let slot = BoundaryLoop::new(vec![
                Segment::line(Point2::new(120.0, 10.0), Point2::new(150.0, 10.0)),
                Segment::Arc(ArcSegment::new(
                    Point2::new(150.0, 20.0),
                    10.0,
                    -PI / 2.0,
                    PI / 2.0,
                    true,
                )),
                Segment::line(Point2::new(150.0, 30.0), Point2::new(120.0, 30.0)),
                Segment::line(Point2::new(120.0, 30.0), Point2::new(120.0, 10.0)),
            ]);
            let grid_data = HatchData::pattern("NET", 2.0, FRAC_PI_6);
            let grid = self.add_hatch(grid_data, vec![slot], "HATCH");

            let open = BoundaryLoop::new(vec![
                Segment::line(Point2::new(0.0, 80.0), Point2::new(20.0, 80.0)),
                Segment::line(Point2::new(20.0, 80.0), Point2::new(20.0, 95.0)),
            ]);
            let broken_data = HatchData::pattern("ANSI37", 1.0, 0.0);
            let broken = self.add_hatch(broken_data, vec![open], "HATCH");

            let ids = DemoEntities {
                plate,
                disc,
                grid,
                broken,
            };

            debug!(
                plate = ids.plate.get(),
                disc = ids.disc.get(),
                grid = ids.grid.get(),
                broken = ids.broken.get(),
                "已创建演示填充"
            );

            ids
        }
    }

    impl Default for Scene {
        fn default() -> Self {
            Self::new(PatternRegistry::builtin().into_shared(), HatchLimits::default())
        }
    }

    struct CountingTarget<'a> {
        inner: &'a mut dyn RenderTarget,
        count: usize,
    }

    impl RenderTarget for CountingTarget<'_> {
        fn draw_primitive(&mut self, primitive: &crate::render::FillPrimitive) {
            self.count += 1;
            self.inner.draw_primitive(primitive);
        }
    }

    #[cfg(test)]
    mod tests {
        use hatchcad_core::document::Document;

        use super::*;
        use crate::errors::UpdateError;
        use crate::render::FillPrimitive;

        #[test]
        fn demo_population_creates_hatches() {
            let mut scene = Scene::default();
            let ids = scene.populate_demo();
            assert_eq!(scene.hatches().count(), 4);
            assert_eq!(scene.hatch(ids.plate).map(Hatch::count_loops), Some(2));
            assert!(scene.hatch(ids.disc).is_some_and(Hatch::is_solid));

            let broken = scene.hatch_mut(ids.broken).expect("broken hatch");
            broken.update();
            assert_eq!(broken.update_error(), UpdateError::InvalidContour);

            let plate = scene.hatch_mut(ids.plate).expect("plate hatch");
            let expected = 6000.0 - std::f64::consts::PI * 144.0;
            assert!((plate.total_area() - expected).abs() < 1e-6);
        }

        #[test]
        fn selection_operations_work() {
            let mut scene = Scene::default();
            let ids = scene.populate_demo();

            assert_eq!(scene.selection_len(), 0);
            assert!(!scene.is_selected(ids.disc));

            scene.select(ids.disc).expect("select disc");
            assert!(scene.is_selected(ids.disc));
            assert_eq!(scene.selection_len(), 1);

            // toggle should remove when already selected
            let now_selected = scene
                .toggle_selection(ids.disc)
                .expect("toggle existing selection");
            assert!(!now_selected);
            assert!(!scene.is_selected(ids.disc));

            let now_selected = scene.toggle_selection(ids.disc).expect("toggle again");
            assert!(now_selected);

            assert!(scene.deselect(ids.disc));
            assert!(!scene.deselect(ids.disc));
            assert_eq!(scene.selection_len(), 0);

            let missing = EntityId::new(9_999);
            let err = scene.select(missing).unwrap_err();
            assert!(matches!(err, EngineError::EntityNotFound(_)));
        }

        #[test]
        fn viewport_state_clamps_zoom_and_reports_window() {
            let mut scene = Scene::default();
            scene.set_viewport_center(Point2::new(10.0, -5.0));
            scene.pan_viewport(Vector2::new(5.0, 5.0));
            assert_eq!(scene.viewport().center.x(), 15.0);
            assert_eq!(scene.viewport().center.y(), 0.0);

            scene.set_viewport_zoom(0.0001);
            assert!((scene.viewport().zoom - MIN_ZOOM).abs() < f64::EPSILON);
            scene.set_viewport_zoom(10_000.0);
            assert!((scene.viewport().zoom - MAX_ZOOM).abs() < f64::EPSILON);

            scene.set_viewport_zoom(2.0);
            let window = scene.viewport().visible_window(Vector2::new(40.0, 20.0));
            assert_eq!(window.min(), Point2::new(5.0, -5.0));
            assert_eq!(window.max(), Point2::new(25.0, 5.0));

            scene.scale_viewport_zoom(0.5);
            assert!((scene.viewport().zoom - 1.0).abs() < f64::EPSILON);
            scene.reset_viewport();
            assert!((scene.viewport().center.x()).abs() < f64::EPSILON);
        }

        #[test]
        fn pick_and_focus_use_hatch_geometry() {
            let mut scene = Scene::default();
            let ids = scene.populate_demo();

            assert_eq!(scene.pick(Point2::new(75.0, 30.0), 0.5), Some(ids.disc));
            assert_eq!(scene.pick(Point2::new(100.2, 30.0), 0.5), Some(ids.plate));
            assert_eq!(scene.pick(Point2::new(500.0, 500.0), 0.5), None);

            scene.select(ids.disc).unwrap();
            scene.focus_on_selection();
            let center = scene.viewport().center;
            assert!((center.x() - 75.0).abs() < 1e-9);
            assert!((center.y() - 30.0).abs() < 1e-9);
        }

        #[test]
        fn draw_visible_emits_only_for_valid_hatches() {
            let mut scene = Scene::default();
            let ids = scene.populate_demo();
            scene.focus_on_selection();
            let mut primitives: Vec<FillPrimitive> = Vec::new();
            let count = scene.draw_visible(&mut primitives, Vector2::new(400.0, 300.0), false);
            assert_eq!(count, primitives.len());
            let regions = primitives
                .iter()
                .filter(|p| matches!(p, FillPrimitive::Region(_)))
                .count();
            assert_eq!(regions, 1);
            assert!(primitives.iter().all(|p| !matches!(p, FillPrimitive::Outline(_))));

            let mut outlined: Vec<FillPrimitive> = Vec::new();
            scene.draw_visible(&mut outlined, Vector2::new(400.0, 300.0), true);
            let outlines = outlined
                .iter()
                .filter(|p| matches!(p, FillPrimitive::Outline(_)))
                .count();
            assert_eq!(outlines, scene.hatch(ids.broken).map(Hatch::count_loops).unwrap());
        }

        #[test]
        fn document_round_trip_preserves_hatches() {
            let mut scene = Scene::default();
            let ids = scene.populate_demo();
            let document = scene.to_document();
            assert_eq!(document.hatches().count(), 4);

            let mut reloaded = Scene::with_document(
                document,
                Arc::clone(scene.registry()),
                scene.limits(),
            );
            assert_eq!(reloaded.selection_len(), 0);
            let plate = reloaded.hatch_mut(ids.plate).expect("plate survives reload");
            assert_eq!(plate.pattern_name(), "ANSI31");
            assert!(plate.total_area() > 0.0);

            let empty = Scene::with_document(
                Document::new(),
                PatternRegistry::builtin().into_shared(),
                HatchLimits::default(),
            );
            assert!(empty.bounds().is_none());
        }
    }
}
