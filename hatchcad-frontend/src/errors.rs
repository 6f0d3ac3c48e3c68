use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("文档读写失败: {0}")]
    Io(#[from] hatchcad_io::IoError),
    #[error("命令 {command} 执行失败: {message}")]
    Command { command: String, message: String },
}
