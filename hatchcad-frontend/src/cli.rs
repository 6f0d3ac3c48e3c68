use std::collections::BTreeMap;

use hatchcad_config::AppConfig;
use hatchcad_core::document::FillKind;
use hatchcad_core::geometry::Vector2;
use hatchcad_engine::command::{CommandBus, CommandContext, CommandRequest};
use hatchcad_engine::errors::UpdateError;
use hatchcad_engine::render::FillPrimitive;
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{DocumentSource, load_scene};

/// 简易 CLI 演示：加载文档（失败则回退到内置示例），更新全部填充并打印概览。
pub fn run_demo(config: &AppConfig) -> Result<(), FrontendError> {
    let loaded = load_scene(config);
    let mut scene = loaded.scene;
    let command_bus = CommandBus::new();
    let mut context = CommandContext { scene: &mut scene };
    dispatch_cli_command(&command_bus, "focus_selection", &[], &mut context)?;
    let commands: Vec<&str> = command_bus.available_commands().copied().collect();
    println!("支持的命令: {}", commands.join(", "));

    println!("Rust 版 HatchCAD CLI 演示");
    match &loaded.source {
        DocumentSource::Json(path) => {
            println!("已从 JSON 加载文档：{}", path.display());
        }
        DocumentSource::Demo => {
            if let Some(ids) = &loaded.demo_entities {
                println!("已构建内置示例填充：");
                println!("  - 带孔板 ID = {}", ids.plate.get());
                println!("  - 实心圆 ID = {}", ids.disc.get());
                println!("  - 网格槽 ID = {}", ids.grid.get());
                println!("  - 未闭合边界 ID = {}", ids.broken.get());
            }
        }
    }

    let selection: Vec<String> = context
        .scene
        .selection()
        .iter()
        .map(|id| id.get().to_string())
        .collect();
    if selection.is_empty() {
        println!("当前尚未选中任何填充。");
    } else {
        println!("选中集包含填充 ID：{}", selection.join(", "));
    }
    let viewport = context.scene.viewport();
    println!(
        "视口中心=({:.2}, {:.2}), 缩放={:.3}",
        viewport.center.x(),
        viewport.center.y(),
        viewport.zoom
    );

    println!("当前填充：");
    let mut invalid = 0usize;
    for (id, hatch) in context.scene.hatches_mut() {
        let area = hatch.total_area();
        let style = match hatch.data().fill {
            FillKind::Solid => "实心".to_string(),
            FillKind::Pattern => format!(
                "图案 {} 比例={:.3} 角度={:.1}°",
                hatch.pattern_name(),
                hatch.scale(),
                hatch.angle().to_degrees()
            ),
        };
        println!(
            "  - 填充 #{}, Layer={}, {}, 环数={}, 面积={:.3}, 状态={:?}",
            id.get(),
            hatch.layer(),
            style,
            hatch.count_loops(),
            area,
            hatch.update_error()
        );
        if let Some(error) = hatch.last_error() {
            invalid += 1;
            println!("      错误: {error}");
        }
    }

    let view_size = Vector2::new(
        config.frontend.viewport_width,
        config.frontend.viewport_height,
    );
    let mut primitives: Vec<FillPrimitive> = Vec::new();
    let total = context
        .scene
        .draw_visible(&mut primitives, view_size, config.frontend.outline_invalid);
    let summary = summarize_primitives(&primitives);
    info!(total, invalid, "CLI 演示绘制完成");
    println!(
        "视口内图元 {} 个：区域 {}，线段 {}，轮廓 {}",
        total,
        summary.get("region").copied().unwrap_or(0),
        summary.get("line").copied().unwrap_or(0),
        summary.get("outline").copied().unwrap_or(0)
    );

    if invalid > 0 {
        context.scene.clear_selection();
        if let Err(err) = dispatch_cli_command(&command_bus, "validate", &[], &mut context) {
            println!("校验结果: {err}");
        }
    }
    Ok(())
}

fn summarize_primitives(primitives: &[FillPrimitive]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for primitive in primitives {
        let key = match primitive {
            FillPrimitive::Region(_) => "region",
            FillPrimitive::Line { .. } => "line",
            FillPrimitive::Outline(_) => "outline",
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn dispatch_cli_command(
    bus: &CommandBus,
    name: &str,
    args: &[&str],
    context: &mut CommandContext<'_>,
) -> Result<(), FrontendError> {
    let request = CommandRequest::new(name, args.iter().copied());
    let response = bus.dispatch(&request, context);
    if response.success {
        if let Some(message) = response.message {
            println!("[命令] {message}");
        }
        Ok(())
    } else {
        let message = response
            .message
            .unwrap_or_else(|| "未知错误".to_string());
        warn!(command = name, %message, "CLI 命令执行失败");
        Err(FrontendError::Command {
            command: name.to_string(),
            message,
        })
    }
}
