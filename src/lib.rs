//! BlockFS：在定长块设备上模拟的单卷文件系统。
//!
//! 镜像布局：
//! - 块 `[0, metadata_blocks)`：元数据快照（超级块 + 分配表 + 目录树）
//! - 其余块：数据块，按首次适配分配，文件以块链形式保存
//!
//! 交互式 shell 在二进制 crate 中，库只提供存储核心。

pub mod disk;
pub mod fs;
pub mod utils;

pub use disk::{BlockDevice, FileDisk, MemDisk};
pub use fs::{
    config::FsConfig,
    error::{FsError, Result},
    FileSystem,
};
