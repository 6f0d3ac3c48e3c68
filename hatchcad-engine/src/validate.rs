//! 边界环校验：闭合、连续、非退化且尺寸不低于下限。

use hatchcad_core::boundary::BoundaryLoop;
use tracing::trace;

use crate::errors::{ContourDefect, HatchError};
use crate::limits::HatchLimits;
use crate::topology::loop_even_odd_area;

/// 校验单个边界环，`index` 仅用于错误报告。
pub fn validate_loop(
    index: usize,
    boundary: &BoundaryLoop,
    limits: &HatchLimits,
) -> Result<(), HatchError> {
    let invalid = |defect| HatchError::InvalidContour {
        loop_index: index,
        defect,
    };

    if boundary.is_empty() {
        return Err(invalid(ContourDefect::Empty));
    }
    if !boundary.has_arc() && boundary.distinct_vertex_count(limits.tolerance) < 2 {
        return Err(invalid(ContourDefect::Degenerate));
    }
    if let Some(segment) = boundary.first_gap(limits.tolerance) {
        return Err(invalid(ContourDefect::Gap { segment }));
    }
    let gap = boundary.closure_gap().unwrap_or(0.0);
    if gap > limits.tolerance {
        return Err(invalid(ContourDefect::Open { gap }));
    }

    let area = loop_even_odd_area(boundary, limits.tolerance);
    if boundary.bounds().diagonal() < limits.min_size || area < limits.min_area {
        return Err(HatchError::TooSmall { area });
    }

    trace!(index, area, "边界环校验通过");
    Ok(())
}

/// 按顺序校验全部边界环，返回第一个错误。
pub fn validate_loops(loops: &[BoundaryLoop], limits: &HatchLimits) -> Result<(), HatchError> {
    loops
        .iter()
        .enumerate()
        .try_for_each(|(index, boundary)| validate_loop(index, boundary, limits))
}
