//! 绘制输出：填充生成的图元与接收图元的渲染目标。

use hatchcad_core::boundary::BoundaryLoop;
use hatchcad_core::geometry::{Bounds2D, Point2};

use crate::topology::LoopRole;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionContour {
    pub boundary: BoundaryLoop,
    pub role: LoopRole,
}

/// 实体填充区域：外边界减去孔洞。
#[derive(Debug, Clone, PartialEq)]
pub struct FilledRegion {
    pub contours: Vec<RegionContour>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillPrimitive {
    Region(FilledRegion),
    Line { start: Point2, end: Point2 },
    /// 无效填充的轮廓提示。
    Outline(BoundaryLoop),
}

/// 单次绘制的视图参数。
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewContext {
    /// 可见窗口；`None` 表示不裁剪、输出完整图案。
    pub window: Option<Bounds2D>,
    pub outline_invalid: bool,
}

pub trait RenderTarget {
    fn draw_primitive(&mut self, primitive: &FillPrimitive);
}

impl RenderTarget for Vec<FillPrimitive> {
    fn draw_primitive(&mut self, primitive: &FillPrimitive) {
        self.push(primitive.clone());
    }
}
