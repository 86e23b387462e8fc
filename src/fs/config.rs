use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fs::error::{FsError, Result};

/// 默认块大小：512 字节
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// 默认块总数（包含元数据区）
pub const DEFAULT_CAPACITY_BLOCKS: u64 = 1024;

/// 默认元数据区块数：16 * 512B = 8KB 用于存放快照
pub const DEFAULT_METADATA_BLOCKS: u64 = 16;

pub const DEFAULT_DISK_PATH: &str = "disk.img";

/// 覆盖磁盘镜像路径的环境变量
pub const DISK_PATH_ENV: &str = "BLOCKFS_DISK";

/// 卷的几何参数与镜像位置。
///
/// 块 `[0, metadata_blocks)` 保留给元数据快照，其余块才参与分配。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub disk_path: PathBuf,
    pub block_size: usize,
    pub capacity_blocks: u64,
    pub metadata_blocks: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            block_size: DEFAULT_BLOCK_SIZE,
            capacity_blocks: DEFAULT_CAPACITY_BLOCKS,
            metadata_blocks: DEFAULT_METADATA_BLOCKS,
        }
    }
}

impl FsConfig {
    pub fn new(block_size: usize, capacity_blocks: u64, metadata_blocks: u64) -> Self {
        Self {
            block_size,
            capacity_blocks,
            metadata_blocks,
            ..Default::default()
        }
    }

    /// 从 TOML 文件读取配置；文件不存在时使用默认值。
    /// 环境变量 `BLOCKFS_DISK` 优先于文件中的 `disk_path`。
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            toml::from_str::<FsConfig>(&text)
                .map_err(|e| FsError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Self::default()
        };

        if let Ok(disk) = std::env::var(DISK_PATH_ENV) {
            if !disk.is_empty() {
                config.disk_path = PathBuf::from(disk);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(FsError::Config("block_size must be positive".into()));
        }
        if self.capacity_blocks == 0 {
            return Err(FsError::Config("capacity_blocks must be positive".into()));
        }
        if self.metadata_blocks >= self.capacity_blocks {
            return Err(FsError::Config(format!(
                "metadata_blocks ({}) leaves no data blocks out of {}",
                self.metadata_blocks, self.capacity_blocks
            )));
        }
        Ok(())
    }

    /// 元数据区可用字节数
    pub fn metadata_bytes(&self) -> usize {
        self.metadata_blocks as usize * self.block_size
    }

    pub fn data_blocks(&self) -> u64 {
        self.capacity_blocks - self.metadata_blocks
    }
}
