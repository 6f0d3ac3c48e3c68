use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use hatchcad_config::AppConfig;
use hatchcad_engine::limits::HatchLimits;
use hatchcad_engine::pattern::PatternRegistry;
use hatchcad_engine::scene::{DemoEntities, Scene};
use hatchcad_io::{DocumentLoader, JsonFacade, load_pattern_file};
use tracing::{info, warn};

/// 覆盖配置中示例文档路径的环境变量。
pub const SAMPLE_DOCUMENT_ENV: &str = "HATCHCAD_SAMPLE_DOCUMENT";

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Json(PathBuf),
    Demo,
}

/// 统一封装加载后的场景与元信息。
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub source: DocumentSource,
    pub demo_entities: Option<DemoEntities>,
}

pub fn limits_from_config(config: &AppConfig) -> HatchLimits {
    let hatch = &config.hatch;
    HatchLimits {
        tolerance: hatch.tolerance,
        min_size: hatch.min_size,
        min_area: hatch.min_area,
        max_area: hatch.max_area,
        max_segments: hatch.max_segments,
    }
}

/// 内置图案加上配置中列出的 `.pat` 文件；单个文件失败只记录警告。
pub fn build_registry(config: &AppConfig) -> Arc<PatternRegistry> {
    let mut registry = PatternRegistry::builtin();
    for path in config.pattern_files() {
        match load_pattern_file(&path) {
            Ok(patterns) => {
                info!(path = %path.display(), count = patterns.len(), "已加载图案文件");
                registry = registry.with_patterns(patterns);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载图案文件失败，已跳过");
            }
        }
    }
    registry.into_shared()
}

/// 按环境变量 `HATCHCAD_SAMPLE_DOCUMENT`、配置项 `frontend.sample_document` 的顺序加载 JSON 文档，
/// 若都不可用则回退到内置示例。
pub fn load_scene(config: &AppConfig) -> LoadedScene {
    let registry = build_registry(config);
    let limits = limits_from_config(config);

    let candidate = env::var_os(SAMPLE_DOCUMENT_ENV)
        .map(PathBuf::from)
        .or_else(|| {
            config
                .frontend
                .sample_document
                .as_deref()
                .map(|path| config.resolve_path(path))
        });

    if let Some(path) = candidate {
        match JsonFacade::new().load(&path) {
            Ok(document) => {
                info!(path = %path.display(), "从 JSON 加载文档成功");
                let scene = Scene::with_document(document, registry, limits);
                return LoadedScene {
                    scene,
                    source: DocumentSource::Json(path),
                    demo_entities: None,
                };
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载文档失败，回退到内置示例");
            }
        }
    }

    let mut scene = Scene::new(registry, limits);
    let demo_entities = scene.populate_demo();
    let _ = scene.select(demo_entities.plate);
    scene.focus_on_selection();

    LoadedScene {
        scene,
        source: DocumentSource::Demo,
        demo_entities: Some(demo_entities),
    }
}
