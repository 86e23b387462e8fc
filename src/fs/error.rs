use thiserror::Error;

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Disk I/O error: {0}")]
    Io(#[from] std::io::Error), // 底层 I/O 错误

    #[error("Block index {index} out of range (capacity {capacity})")]
    OutOfRange { index: u64, capacity: u64 },

    #[error("Write of {len} bytes exceeds block size {block_size}")]
    OversizeWrite { len: usize, block_size: usize },

    #[error("Disk space is full")]
    DeviceFull, // 磁盘已满

    #[error("File or directory already exists: {0}")]
    AlreadyExists(String),

    #[error("File or directory not found: {0}")]
    NotFound(String),

    #[error("Expected a directory, found a file: {0}")]
    NotADirectory(String),

    #[error("Expected a file, found a directory: {0}")]
    IsADirectory(String),

    #[error("Directory is not empty: {0}")]
    NotEmpty(String),

    #[error("Not a compressed file: {0}")]
    NotACompressedFile(String),

    #[error("Corrupted data: {0}")]
    CorruptData(String),

    #[error("Content is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Metadata snapshot needs {needed} bytes but only {available} are reserved")]
    MetadataOverflow { needed: usize, available: usize },

    #[error("Device holds no file system snapshot")]
    Unformatted,

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FsError>;
