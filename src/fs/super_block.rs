use serde::{Deserialize, Serialize};

use crate::{
    fs::config::FsConfig,
    utils::{current_timestamp, generate_uuid},
};

/// 魔数，用于识别文件系统
pub const MAGIC: u64 = 0xB10C_F5_2024;

pub const FS_TYPE: &str = "BlockFS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u64,
    pub fs_type: String,   // 文件系统标识
    pub volume_id: String, // 格式化时生成的卷 ID
    /** 几何信息 */
    pub block_size: u64,
    pub capacity_blocks: u64,
    pub metadata_blocks: u64,
    pub free_blocks: u64, // 快照时的空闲块数
    /** 时间戳（秒） */
    pub formatted_at: i64,
    pub saved_at: i64,
}

impl SuperBlock {
    pub fn new(config: &FsConfig) -> Self {
        let now = current_timestamp();
        Self {
            magic: MAGIC,
            fs_type: FS_TYPE.to_string(),
            volume_id: generate_uuid(),
            block_size: config.block_size as u64,
            capacity_blocks: config.capacity_blocks,
            metadata_blocks: config.metadata_blocks,
            free_blocks: config.data_blocks(),
            formatted_at: now,
            saved_at: now,
        }
    }

    /// 与当前配置的几何参数是否一致
    pub fn matches(&self, config: &FsConfig) -> bool {
        self.block_size == config.block_size as u64
            && self.capacity_blocks == config.capacity_blocks
            && self.metadata_blocks == config.metadata_blocks
    }
}
