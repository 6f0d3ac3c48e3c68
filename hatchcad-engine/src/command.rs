use std::collections::HashMap;

use hatchcad_core::document::EntityId;

use crate::errors::UpdateError;
use crate::hatch::{Hatch, HatchState};
use crate::scene::Scene;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(FocusSelectionCommand);
        bus.register(ClearSelectionCommand);
        bus.register(SetPatternCommand);
        bus.register(SetScaleCommand);
        bus.register(SetAngleCommand);
        bus.register(SetSolidCommand);
        bus.register(ValidateCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 对选中的每个填充执行 `edit`，返回处理数量；选中集为空时报错。
fn edit_selection<F>(scene: &mut Scene, mut edit: F) -> Result<usize, String>
where
    F: FnMut(&mut Hatch) -> Result<(), String>,
{
    let ids = scene.selection();
    if ids.is_empty() {
        return Err("当前没有选中的填充".to_string());
    }
    for id in &ids {
        let hatch = scene.hatch_mut(*id).map_err(|err| err.to_string())?;
        edit(hatch)?;
    }
    Ok(ids.len())
}

fn single_arg<'a>(request: &'a CommandRequest, usage: &str) -> Result<&'a str, String> {
    match request.args.as_slice() {
        [value] => Ok(value.as_str()),
        _ => Err(format!("用法: {} {}", request.name, usage)),
    }
}

fn respond(result: Result<String, String>) -> CommandResponse {
    match result {
        Ok(message) => CommandResponse::ok(message),
        Err(message) => CommandResponse::err(message),
    }
}

struct FocusSelectionCommand;

impl CommandHandler for FocusSelectionCommand {
    fn name(&self) -> &'static str {
        "focus_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.focus_on_selection();
        CommandResponse::ok("视口已聚焦当前选中实体")
    }
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.clear_selection();
        CommandResponse::ok("选中集已清空")
    }
}

struct SetPatternCommand;

impl CommandHandler for SetPatternCommand {
    fn name(&self) -> &'static str {
        "set_pattern"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        respond(single_arg(request, "<图案名>").and_then(|name| {
            if !context.scene.registry().contains(name) {
                return Err(format!("图案库中没有 {name}"));
            }
            let count = edit_selection(context.scene, |hatch| {
                hatch.set_pattern(name);
                hatch.set_solid(false);
                Ok(())
            })?;
            Ok(format!("已为 {count} 个填充设置图案 {name}"))
        }))
    }
}

struct SetScaleCommand;

impl CommandHandler for SetScaleCommand {
    fn name(&self) -> &'static str {
        "set_scale"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        respond(single_arg(request, "<比例>").and_then(|raw| {
            let scale: f64 = raw
                .parse()
                .map_err(|_| format!("无法解析比例: {raw}"))?;
            let count = edit_selection(context.scene, |hatch| {
                hatch.set_scale(scale).map_err(|err| err.to_string())
            })?;
            Ok(format!("已为 {count} 个填充设置比例 {scale}"))
        }))
    }
}

struct SetAngleCommand;

impl CommandHandler for SetAngleCommand {
    fn name(&self) -> &'static str {
        "set_angle"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        respond(single_arg(request, "<角度(度)>").and_then(|raw| {
            let degrees: f64 = raw
                .parse()
                .map_err(|_| format!("无法解析角度: {raw}"))?;
            let count = edit_selection(context.scene, |hatch| {
                hatch.set_angle(degrees.to_radians());
                Ok(())
            })?;
            Ok(format!("已为 {count} 个填充设置角度 {degrees}°"))
        }))
    }
}

struct SetSolidCommand;

impl CommandHandler for SetSolidCommand {
    fn name(&self) -> &'static str {
        "set_solid"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        respond(single_arg(request, "<on|off>").and_then(|raw| {
            let solid = match raw {
                "on" => true,
                "off" => false,
                other => return Err(format!("无效的开关值: {other}")),
            };
            let count = edit_selection(context.scene, |hatch| {
                hatch.set_solid(solid);
                Ok(())
            })?;
            let kind = if solid { "实体填充" } else { "图案填充" };
            Ok(format!("已将 {count} 个填充切换为{kind}"))
        }))
    }
}

/// 更新选中填充（选中集为空时更新全部），汇报失败项。
struct ValidateCommand;

impl CommandHandler for ValidateCommand {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let scene = &mut *context.scene;
        let mut ids = scene.selection();
        if ids.is_empty() {
            ids = scene.hatches().map(|(id, _)| *id).collect();
        }

        let mut failures: Vec<(EntityId, UpdateError)> = Vec::new();
        let mut skipped = 0usize;
        for id in &ids {
            let Ok(hatch) = scene.hatch_mut(*id) else {
                continue;
            };
            // 没有边界环的填充无从校验
            if matches!(hatch.state(), HatchState::Empty) {
                skipped += 1;
                continue;
            }
            hatch.update();
            if hatch.update_error() != UpdateError::Ok {
                failures.push((*id, hatch.update_error()));
            }
        }

        let checked = ids.len() - skipped;
        let note = if skipped > 0 {
            format!("，跳过 {skipped} 个无边界的填充")
        } else {
            String::new()
        };
        if failures.is_empty() {
            CommandResponse::ok(format!("{checked} 个填充全部有效{note}"))
        } else {
            let detail: Vec<String> = failures
                .iter()
                .map(|(id, error)| format!("#{}: {:?}", id.get(), error))
                .collect();
            CommandResponse::err(format!(
                "{} 个填充无效: {}{note}",
                failures.len(),
                detail.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use hatchcad_core::document::HatchData;

    use super::*;
    use crate::scene::Scene;

    fn request(name: &str, args: &[&str]) -> CommandRequest {
        CommandRequest::new(name, args.iter().copied())
    }

    #[test]
    fn focus_and_clear_commands_work() {
        let mut scene = Scene::default();
        let ids = scene.populate_demo();
        scene.select(ids.disc).unwrap();

        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&request("focus_selection", &[]), &mut context);
        assert!(response.success);

        let response = bus.dispatch(&request("clear_selection", &[]), &mut context);
        assert!(response.success);
        assert_eq!(context.scene.selection_len(), 0);

        let response = bus.dispatch(&request("explode", &[]), &mut context);
        assert!(!response.success);
    }

    #[test]
    fn style_commands_edit_selected_hatches() {
        let mut scene = Scene::default();
        let ids = scene.populate_demo();
        let bus = CommandBus::new();

        {
            let mut context = CommandContext { scene: &mut scene };
            let response = bus.dispatch(&request("set_scale", &["2"]), &mut context);
            assert!(!response.success, "empty selection must be rejected");
        }

        scene.select(ids.plate).unwrap();
        let mut context = CommandContext { scene: &mut scene };
        assert!(bus.dispatch(&request("set_pattern", &["net"]), &mut context).success);
        assert!(bus.dispatch(&request("set_scale", &["2.5"]), &mut context).success);
        assert!(bus.dispatch(&request("set_angle", &["90"]), &mut context).success);
        assert!(!bus.dispatch(&request("set_scale", &["-1"]), &mut context).success);
        assert!(!bus.dispatch(&request("set_scale", &["abc"]), &mut context).success);
        assert!(!bus.dispatch(&request("set_pattern", &["UNKNOWN"]), &mut context).success);

        let plate = context.scene.hatch(ids.plate).expect("plate");
        assert_eq!(plate.pattern_name(), "net");
        assert!((plate.scale() - 2.5).abs() < 1e-12);
        assert!((plate.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(plate.state(), &HatchState::Unvalidated);

        assert!(bus.dispatch(&request("set_solid", &["on"]), &mut context).success);
        assert!(context.scene.hatch(ids.plate).is_some_and(Hatch::is_solid));
        assert!(!bus.dispatch(&request("set_solid", &["maybe"]), &mut context).success);
    }

    #[test]
    fn validate_reports_invalid_hatches() {
        let mut scene = Scene::default();
        let ids = scene.populate_demo();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&request("validate", &[]), &mut context);
        assert!(!response.success);
        let message = response.message.unwrap_or_default();
        assert!(message.contains(&format!("#{}", ids.broken.get())));
        assert!(message.contains("InvalidContour"));

        context.scene.select(ids.disc).unwrap();
        let response = bus.dispatch(&request("validate", &[]), &mut context);
        assert!(response.success);
    }

    #[test]
    fn validate_skips_hatches_without_loops() {
        let mut scene = Scene::default();
        let blank = scene.add_hatch(HatchData::solid(), Vec::new(), "0");
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&request("validate", &[]), &mut context);
        assert!(response.success);
        assert!(response.message.unwrap_or_default().contains("跳过 1 个"));
        let hatch = context.scene.hatch(blank).expect("blank hatch");
        assert_eq!(hatch.update_error(), UpdateError::Undefined);
    }
}
