//! AutoCAD / LibreCAD 风格的 `.pat` 图案文件。
//!
//! ```text
//! ; 注释
//! *NAME, 描述
//! angle, x-origin, y-origin, delta-x, delta-y [, dash-1, dash-2, ...]
//! ```
//! 角度为度，读入后换算为弧度；`delta-x` 为沿线错位，`delta-y` 为线间距。

use std::fs;
use std::path::Path;

use hatchcad_core::geometry::Point2;
use hatchcad_core::pattern::{HatchPattern, PatternFamily};

use crate::IoError;

/// 解析 `.pat` 文本，按出现顺序返回图案。
pub fn parse_pat(source: &str) -> Result<Vec<HatchPattern>, IoError> {
    let mut reader = PatReader::new(source);
    let mut patterns: Vec<HatchPattern> = Vec::new();
    let mut current: Option<(HatchPattern, usize)> = None;

    while let Some((line_number, line)) = reader.next_line() {
        if let Some(header) = line.strip_prefix('*') {
            if let Some(pattern) = current.take() {
                patterns.push(finish(pattern)?);
            }
            current = Some((parse_header(header, line_number)?, line_number));
            continue;
        }

        let Some((pattern, _)) = current.as_mut() else {
            return Err(invalid(line_number, "线族定义出现在图案名之前"));
        };
        pattern.families.push(parse_family(line, line_number)?);
    }

    if let Some(pattern) = current.take() {
        patterns.push(finish(pattern)?);
    }
    Ok(patterns)
}

pub fn load_pattern_file(path: &Path) -> Result<Vec<HatchPattern>, IoError> {
    let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pat(&data)
}

struct PatReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> PatReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line_number: 0,
        }
    }

    /// 下一条有效行（去掉注释与空白），附带 1 起始的行号。
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for raw in self.lines.by_ref() {
            self.line_number += 1;
            let content = match raw.find(';') {
                Some(index) => &raw[..index],
                None => raw,
            };
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Some((self.line_number, trimmed));
            }
        }
        None
    }
}

fn invalid(line: usize, message: impl Into<String>) -> IoError {
    IoError::InvalidPattern {
        line,
        message: message.into(),
    }
}

fn parse_header(header: &str, line: usize) -> Result<HatchPattern, IoError> {
    let (name, description) = match header.split_once(',') {
        Some((name, description)) => (name.trim(), Some(description.trim())),
        None => (header.trim(), None),
    };
    if name.is_empty() {
        return Err(invalid(line, "图案名为空"));
    }
    let pattern = HatchPattern::new(name, Vec::new());
    Ok(match description.filter(|text| !text.is_empty()) {
        Some(text) => pattern.with_description(text),
        None => pattern,
    })
}

fn parse_family(line: &str, line_number: usize) -> Result<PatternFamily, IoError> {
    let values = line
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| invalid(line_number, format!("无法解析数值 \"{field}\"")))
        })
        .collect::<Result<Vec<f64>, IoError>>()?;

    let [angle, x, y, shift, spacing, dashes @ ..] = values.as_slice() else {
        return Err(invalid(
            line_number,
            format!("线族至少需要 5 个数值，实际 {}", values.len()),
        ));
    };

    Ok(PatternFamily::new(angle.to_radians(), *spacing)
        .with_origin(Point2::new(*x, *y))
        .with_shift(*shift)
        .with_dashes(dashes.to_vec()))
}

fn finish((pattern, line): (HatchPattern, usize)) -> Result<HatchPattern, IoError> {
    if pattern.families.is_empty() {
        return Err(invalid(line, format!("图案 {} 没有线族定义", pattern.name)));
    }
    Ok(pattern)
}
