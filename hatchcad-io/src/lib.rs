use std::fs;
use std::path::{Path, PathBuf};

use hatchcad_core::document::Document;
use thiserror::Error;

mod pat;

pub use pat::{load_pattern_file, parse_pat};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
    #[error("invalid pattern definition at line {line}: {message}")]
    InvalidPattern { line: usize, message: String },
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// 以 JSON 保存/读取完整文档（图层、填充记录与图案坐标系）。
#[derive(Debug, Clone, Copy)]
pub struct JsonFacade {
    pretty: bool,
}

impl JsonFacade {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// 输出不带缩进的紧凑 JSON。
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        serde_json::from_str(source).map_err(|err| IoError::InvalidDocument(err.to_string()))
    }

    pub fn encode(&self, document: &Document) -> Result<String, IoError> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        };
        encoded.map_err(|err| IoError::InvalidDocument(err.to_string()))
    }
}

impl Default for JsonFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&data)
    }
}

impl DocumentSaver for JsonFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let encoded = self.encode(document)?;
        fs::write(path, encoded).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}
