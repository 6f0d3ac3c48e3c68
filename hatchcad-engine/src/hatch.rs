//! 填充实体：边界环、填充样式与惰性重算的状态机。
//!
//! 任何修改只把实体标记为 `Unvalidated`，真正的校验、面积与图元生成推迟到
//! 下一次 [`Hatch::update`] 或 [`Hatch::draw`]。

use std::sync::Arc;

use glam::DAffine2;
use hatchcad_core::boundary::BoundaryLoop;
use hatchcad_core::document::{FillKind, HatchData, HatchRecord};
use hatchcad_core::geometry::{Bounds2D, Point2, Transform, Vector2};
use tracing::{debug, trace, warn};

use crate::errors::{EngineError, HatchError, UpdateError};
use crate::fill::{self, ContinuationOffset, FillRequest};
use crate::limits::HatchLimits;
use crate::pattern::PatternRegistry;
use crate::render::{FillPrimitive, RenderTarget, ViewContext};
use crate::topology::{self, SignedLoop};
use crate::validate;

/// 一次成功更新的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct FillCache {
    pub total_area: f64,
    pub loops: Vec<SignedLoop>,
    pub primitives: Vec<FillPrimitive>,
    pub next_offset: ContinuationOffset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HatchState {
    Empty,
    Unvalidated,
    /// 更新进行中，重入的 `update` 直接返回。
    Updating,
    Valid(FillCache),
    Invalid(HatchError),
}

#[derive(Debug, Clone)]
pub struct Hatch {
    layer: String,
    data: HatchData,
    loops: Vec<BoundaryLoop>,
    pattern_frame: DAffine2,
    bounds: Bounds2D,
    contour_active: bool,
    registry: Arc<PatternRegistry>,
    limits: HatchLimits,
    state: HatchState,
    update_error: UpdateError,
    validation_count: u64,
}

impl Hatch {
    pub fn new(data: HatchData, registry: Arc<PatternRegistry>, limits: HatchLimits) -> Self {
        Self {
            layer: "0".to_string(),
            data,
            loops: Vec::new(),
            pattern_frame: DAffine2::IDENTITY,
            bounds: Bounds2D::empty(),
            contour_active: false,
            registry,
            limits,
            state: HatchState::Empty,
            update_error: UpdateError::Undefined,
            validation_count: 0,
        }
    }

    /// 从持久化记录重建，环按记录原样保留（不重新整理顺序）。
    pub fn from_record(
        record: HatchRecord,
        registry: Arc<PatternRegistry>,
        limits: HatchLimits,
    ) -> Self {
        let mut hatch = Self::new(record.data, registry, limits);
        hatch.layer = record.layer;
        hatch.loops = record.loops;
        hatch.pattern_frame = record.pattern_frame;
        hatch.calculate_borders();
        hatch.invalidate();
        hatch
    }

    pub fn to_record(&self) -> HatchRecord {
        HatchRecord {
            layer: self.layer.clone(),
            data: self.data.clone(),
            loops: self.loops.clone(),
            pattern_frame: self.pattern_frame,
        }
    }

    #[inline]
    pub fn data(&self) -> &HatchData {
        &self.data
    }

    #[inline]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn set_layer(&mut self, layer: impl Into<String>) {
        self.layer = layer.into();
    }

    #[inline]
    pub fn loops(&self) -> &[BoundaryLoop] {
        &self.loops
    }

    #[inline]
    pub fn count_loops(&self) -> usize {
        self.loops.len()
    }

    #[inline]
    pub fn pattern_frame(&self) -> DAffine2 {
        self.pattern_frame
    }

    #[inline]
    pub fn state(&self) -> &HatchState {
        &self.state
    }

    #[inline]
    pub fn update_error(&self) -> UpdateError {
        self.update_error
    }

    pub fn last_error(&self) -> Option<&HatchError> {
        match &self.state {
            HatchState::Invalid(error) => Some(error),
            _ => None,
        }
    }

    #[inline]
    pub fn validation_count(&self) -> u64 {
        self.validation_count
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.data.is_solid()
    }

    #[inline]
    pub fn pattern_name(&self) -> &str {
        &self.data.pattern.name
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.data.pattern.scale
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.data.pattern.angle
    }

    /// 追加边界环；图元顺序会先按首尾相接整理。
    pub fn add_loop(&mut self, mut boundary: BoundaryLoop) {
        boundary.optimize_contour(self.limits.tolerance);
        self.bounds.include_bounds(&boundary.bounds());
        self.loops.push(boundary);
        self.invalidate();
    }

    pub fn set_solid(&mut self, solid: bool) {
        self.data.fill = if solid {
            FillKind::Solid
        } else {
            FillKind::Pattern
        };
        self.invalidate();
    }

    /// 只修改图案名，查找推迟到下一次更新。
    pub fn set_pattern(&mut self, name: impl Into<String>) {
        self.data.pattern.name = name.into();
        self.invalidate();
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), EngineError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::InvalidScale(scale));
        }
        self.data.pattern.scale = scale;
        self.invalidate();
        Ok(())
    }

    /// 弧度，任意取值；生成时规整。
    pub fn set_angle(&mut self, angle: f64) {
        self.data.pattern.angle = angle;
        self.invalidate();
    }

    pub fn activate_contour(&mut self, on: bool) {
        self.contour_active = on;
    }

    #[inline]
    pub fn is_contour_active(&self) -> bool {
        self.contour_active
    }

    /// 只做边界环校验，不改变状态。
    pub fn validate(&self) -> Result<(), HatchError> {
        validate::validate_loops(&self.loops, &self.limits)
    }

    /// 重新计算并缓存包围盒。
    pub fn calculate_borders(&mut self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for boundary in &self.loops {
            bounds.include_bounds(&boundary.bounds());
        }
        self.bounds = bounds;
        bounds
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    pub fn update(&mut self) {
        match self.state {
            HatchState::Unvalidated => {}
            HatchState::Updating => {
                warn!("填充正在更新，忽略重入的更新请求");
                return;
            }
            _ => return,
        }

        self.state = HatchState::Updating;
        self.validation_count += 1;

        self.state = match self.recompute() {
            Ok(cache) => {
                debug!(
                    area = cache.total_area,
                    primitives = cache.primitives.len(),
                    "填充更新完成"
                );
                self.update_error = UpdateError::Ok;
                HatchState::Valid(cache)
            }
            Err(error) => {
                warn!(%error, "填充更新失败");
                self.update_error = error.kind();
                HatchState::Invalid(error)
            }
        };
    }

    fn recompute(&self) -> Result<FillCache, HatchError> {
        validate::validate_loops(&self.loops, &self.limits)?;
        let report = topology::compute_area(&self.loops, &self.limits)?;
        let request = FillRequest {
            loops: &self.loops,
            signed: &report.loops,
            data: &self.data,
            pattern_frame: self.pattern_frame,
            registry: &self.registry,
            limits: self.limits,
            window: None,
        };
        let output = fill::generate_fill(&request, &ContinuationOffset::default())?;
        Ok(FillCache {
            total_area: report.total_area,
            loops: report.loops,
            primitives: output.primitives,
            next_offset: output.next_offset,
        })
    }

    /// 需要时先更新；无效填充返回 0。
    pub fn total_area(&mut self) -> f64 {
        self.update();
        match &self.state {
            HatchState::Valid(cache) => cache.total_area,
            _ => 0.0,
        }
    }

    /// 向渲染目标输出图元。带窗口时按窗口重新生成并推进 `offset`。
    pub fn draw(
        &mut self,
        target: &mut dyn RenderTarget,
        view: &ViewContext,
        offset: &mut ContinuationOffset,
    ) {
        self.update();

        match &self.state {
            HatchState::Valid(cache) => {
                match view.window {
                    None => {
                        for primitive in &cache.primitives {
                            target.draw_primitive(primitive);
                        }
                        *offset = cache.next_offset.clone();
                    }
                    Some(window) => {
                        let request = FillRequest {
                            loops: &self.loops,
                            signed: &cache.loops,
                            data: &self.data,
                            pattern_frame: self.pattern_frame,
                            registry: &self.registry,
                            limits: self.limits,
                            window: Some(window),
                        };
                        match fill::generate_fill(&request, offset) {
                            Ok(output) => {
                                for primitive in &output.primitives {
                                    target.draw_primitive(primitive);
                                }
                                *offset = output.next_offset;
                            }
                            Err(error) => warn!(%error, "窗口内填充生成失败"),
                        }
                    }
                }
                if self.contour_active {
                    self.draw_outline(target);
                }
            }
            HatchState::Invalid(_) if view.outline_invalid => self.draw_outline(target),
            _ => trace!("跳过未生成的填充"),
        }
    }

    fn draw_outline(&self, target: &mut dyn RenderTarget) {
        for boundary in &self.loops {
            target.draw_primitive(&FillPrimitive::Outline(boundary.clone()));
        }
    }

    /// 实体填充内部距离为 0，否则取到最近边界的距离。
    pub fn distance_to_point(&self, point: Point2) -> f64 {
        if self.is_solid() && self.covers(point) {
            return 0.0;
        }
        self.loops
            .iter()
            .map(|boundary| boundary.distance_to_point(point))
            .fold(f64::INFINITY, f64::min)
    }

    fn covers(&self, point: Point2) -> bool {
        let tolerance = self.limits.tolerance.max(self.bounds.diagonal() * 1e-5);
        let inside = self
            .loops
            .iter()
            .filter(|boundary| boundary.contains_point(point, tolerance))
            .count();
        inside % 2 == 1
    }

    pub fn move_by(&mut self, offset: Vector2) {
        self.apply_transform(&Transform::Translate(offset));
    }

    pub fn rotate(&mut self, center: Point2, angle: f64) {
        self.apply_transform(&Transform::Rotate { center, angle });
    }

    pub fn scale_by(&mut self, center: Point2, factor: Vector2) {
        self.apply_transform(&Transform::Scale { center, factor });
    }

    pub fn mirror(&mut self, axis_start: Point2, axis_end: Point2) {
        self.apply_transform(&Transform::Mirror {
            axis_start,
            axis_end,
        });
    }

    pub fn stretch(&mut self, first_corner: Point2, second_corner: Point2, offset: Vector2) {
        self.apply_transform(&Transform::Stretch {
            first_corner,
            second_corner,
            offset,
        });
    }

    /// 边界与图案坐标系一起变换。拉伸窗口完整包住填充时退化为平移。
    pub fn apply_transform(&mut self, transform: &Transform) {
        match transform.affine() {
            Some(affine) => {
                self.pattern_frame = affine * self.pattern_frame;
                for boundary in &mut self.loops {
                    boundary.apply_transform(transform);
                }
            }
            None => {
                if let Some((window, offset)) = transform.stretch_window() {
                    if !self.bounds.is_empty() && window.contains_bounds(&self.bounds, 0.0) {
                        self.apply_transform(&Transform::Translate(offset));
                        return;
                    }
                }
                for boundary in &mut self.loops {
                    boundary.apply_transform(transform);
                }
            }
        }
        self.calculate_borders();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.state = if self.loops.is_empty() {
            HatchState::Empty
        } else {
            HatchState::Unvalidated
        };
    }
}
