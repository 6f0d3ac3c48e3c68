//! 只读图案库。启动时装配一次，之后以 `Arc` 在各填充实体间共享。

use std::collections::HashMap;
use std::sync::Arc;

use hatchcad_core::geometry::Point2;
use hatchcad_core::pattern::{HatchPattern, PatternFamily};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: HashMap<String, HatchPattern>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置的常用图案，尺寸单位为毫米。
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for pattern in builtin_patterns() {
            registry.register(pattern);
        }
        registry
    }

    /// 注册图案，同名（不区分大小写）时覆盖旧定义并返回之。
    pub fn register(&mut self, pattern: HatchPattern) -> Option<HatchPattern> {
        self.patterns.insert(pattern.key(), pattern)
    }

    pub fn with_patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = HatchPattern>,
    {
        let mut replaced = 0usize;
        for pattern in patterns {
            if self.register(pattern).is_some() {
                replaced += 1;
            }
        }
        debug!(total = self.patterns.len(), replaced, "图案库已合并");
        self
    }

    pub fn get(&self, name: &str) -> Option<&HatchPattern> {
        self.patterns.get(&name.to_ascii_uppercase())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 排序后的图案名列表。
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn builtin_patterns() -> Vec<HatchPattern> {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};

    const UNIT: f64 = 3.175;
    vec![
        HatchPattern::new("ANSI31", vec![PatternFamily::new(FRAC_PI_4, UNIT)])
            .with_description("ANSI Iron, Brick, Stone masonry"),
        HatchPattern::new(
            "ANSI32",
            vec![
                PatternFamily::new(FRAC_PI_4, 3.0 * UNIT),
                PatternFamily::new(FRAC_PI_4, 3.0 * UNIT).with_origin(Point2::new(4.49013, 0.0)),
            ],
        )
        .with_description("ANSI Steel"),
        HatchPattern::new(
            "ANSI33",
            vec![
                PatternFamily::new(FRAC_PI_4, 2.0 * UNIT),
                PatternFamily::new(FRAC_PI_4, 2.0 * UNIT)
                    .with_origin(Point2::new(4.49013, 0.0))
                    .with_dashes([UNIT, -UNIT / 2.0]),
            ],
        )
        .with_description("ANSI Bronze, Brass, Copper"),
        HatchPattern::new(
            "ANSI37",
            vec![
                PatternFamily::new(FRAC_PI_4, UNIT),
                PatternFamily::new(135_f64.to_radians(), UNIT),
            ],
        )
        .with_description("ANSI Lead, Zinc, Magnesium, Sound/Heat/Elec Insulation"),
        HatchPattern::new("LINE", vec![PatternFamily::new(0.0, UNIT)])
            .with_description("Parallel horizontal lines"),
        HatchPattern::new(
            "NET",
            vec![
                PatternFamily::new(0.0, UNIT),
                PatternFamily::new(FRAC_PI_2, UNIT),
            ],
        )
        .with_description("Horizontal / vertical grid"),
        HatchPattern::new(
            "DASH",
            vec![
                PatternFamily::new(0.0, UNIT)
                    .with_shift(UNIT)
                    .with_dashes([UNIT, -UNIT]),
            ],
        )
        .with_description("Dashed lines"),
        HatchPattern::new(
            "BRICK",
            vec![
                PatternFamily::new(0.0, 2.0 * UNIT),
                PatternFamily::new(FRAC_PI_2, 2.0 * UNIT)
                    .with_shift(2.0 * UNIT)
                    .with_dashes([2.0 * UNIT, -2.0 * UNIT]),
                PatternFamily::new(FRAC_PI_2, 2.0 * UNIT)
                    .with_origin(Point2::new(2.0 * UNIT, 0.0))
                    .with_shift(2.0 * UNIT)
                    .with_dashes([-2.0 * UNIT, 2.0 * UNIT]),
            ],
        )
        .with_description("Brick or masonry-type surface"),
        HatchPattern::new(
            "HONEY",
            vec![
                PatternFamily::new(0.0, 2.749_630_645)
                    .with_shift(1.5 * UNIT)
                    .with_dashes([UNIT, -2.0 * UNIT]),
                PatternFamily::new(2.0 * FRAC_PI_3, 2.749_630_645)
                    .with_shift(1.5 * UNIT)
                    .with_dashes([UNIT, -2.0 * UNIT]),
                PatternFamily::new(FRAC_PI_3, 2.749_630_645)
                    .with_origin(Point2::new(UNIT, 0.0))
                    .with_shift(1.5 * UNIT)
                    .with_dashes([UNIT, -2.0 * UNIT]),
            ],
        )
        .with_description("Honeycomb pattern"),
    ]
}
