//! 填充图案定义。语义与 `.pat` 文件一致：每个线族给出角度、原点、
//! 相邻线沿线方向的错位与垂直间距，以及可选的虚线描述。

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

/// 图案中的一组平行线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFamily {
    /// 相对图案整体角度的偏转，弧度。
    pub angle: f64,
    pub origin: Point2,
    /// 相邻两条线沿线方向的错位。
    pub shift: f64,
    /// 相邻两条线的垂直间距。
    pub spacing: f64,
    /// 正数为实线段，负数为间隙，0 为点。为空表示连续线。
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dashes: Vec<f64>,
}

impl PatternFamily {
    pub fn new(angle: f64, spacing: f64) -> Self {
        Self {
            angle,
            origin: Point2::new(0.0, 0.0),
            shift: 0.0,
            spacing,
            dashes: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: Point2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_dashes(mut self, dashes: impl Into<Vec<f64>>) -> Self {
        self.dashes = dashes.into();
        self
    }

    /// 虚线周期长度；连续线返回 `None`，只含点的线族周期为 0。
    pub fn dash_period(&self) -> Option<f64> {
        if self.dashes.is_empty() {
            return None;
        }
        Some(self.dashes.iter().map(|dash| dash.abs()).sum())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatchPattern {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub families: Vec<PatternFamily>,
}

impl HatchPattern {
    pub fn new(name: impl Into<String>, families: Vec<PatternFamily>) -> Self {
        Self {
            name: name.into(),
            description: None,
            families,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 图案名按大写存储与查找。
    #[inline]
    pub fn key(&self) -> String {
        self.name.to_ascii_uppercase()
    }
}
