//! 元数据快照：超级块 + 分配表 + 目录树，写入设备头部的保留块。
//!
//! 布局：`[len: u64 LE][bincode 数据][0 填充]`，从块 0 开始，
//! 跨越 `metadata_blocks` 个块。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    disk::BlockDevice,
    fs::{
        allocator::AllocationTable,
        config::FsConfig,
        directory::{Directory, Node},
        error::{FsError, Result},
        super_block::{SuperBlock, MAGIC},
    },
};

const LEN_PREFIX: usize = 8;

/// 写入时借用现有状态，避免整棵树拷贝
#[derive(Serialize)]
struct SnapshotRef<'a> {
    super_block: &'a SuperBlock,
    allocation: &'a AllocationTable,
    root: &'a Directory,
}

/// 与 `DirEntry` 编码相同，用来估算新目录项的大小
#[derive(Serialize)]
struct EntryRef<'a> {
    name: &'a str,
    node: &'a Node,
}

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    pub super_block: SuperBlock,
    pub allocation: AllocationTable,
    pub root: Directory,
}

/// 当前状态编码后的字节数（含长度前缀）
pub fn encoded_len(
    super_block: &SuperBlock,
    allocation: &AllocationTable,
    root: &Directory,
) -> Result<usize> {
    let len = bincode::serialized_size(&SnapshotRef {
        super_block,
        allocation,
        root,
    })?;
    Ok(len as usize + LEN_PREFIX)
}

/// 往某个目录里加一项会让快照增长的字节数。
/// bincode 的定长整数编码下，`Vec` 长度前缀不随元素个数变化。
pub fn entry_len(name: &str, node: &Node) -> Result<usize> {
    Ok(bincode::serialized_size(&EntryRef { name, node })? as usize)
}

pub fn write_snapshot<D: BlockDevice + ?Sized>(
    disk: &D,
    config: &FsConfig,
    super_block: &SuperBlock,
    allocation: &AllocationTable,
    root: &Directory,
) -> Result<usize> {
    let bytes = bincode::serialize(&SnapshotRef {
        super_block,
        allocation,
        root,
    })?;

    let available = config.metadata_bytes();
    let needed = bytes.len() + LEN_PREFIX;
    if needed > available {
        return Err(FsError::MetadataOverflow { needed, available });
    }

    let mut region = Vec::with_capacity(available);
    region.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    region.extend_from_slice(&bytes);
    region.resize(available, 0);

    for (i, chunk) in region.chunks(config.block_size).enumerate() {
        disk.write_block(i as u64, chunk)?;
    }
    debug!(bytes = needed, available, "snapshot written");
    Ok(needed)
}

pub fn read_snapshot<D: BlockDevice + ?Sized>(disk: &D, config: &FsConfig) -> Result<Snapshot> {
    let mut region = Vec::with_capacity(config.metadata_bytes());
    for i in 0..config.metadata_blocks {
        region.extend_from_slice(&disk.read_block(i)?);
    }
    if region.len() < LEN_PREFIX {
        return Err(FsError::Unformatted);
    }

    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&region[..LEN_PREFIX]);
    let len = u64::from_le_bytes(len_bytes) as usize;
    if len == 0 || len > region.len() - LEN_PREFIX {
        return Err(FsError::Unformatted);
    }

    let mut snapshot: Snapshot = bincode::deserialize(&region[LEN_PREFIX..LEN_PREFIX + len])
        .map_err(|e| FsError::CorruptData(format!("snapshot decode failed: {}", e)))?;

    if snapshot.super_block.magic != MAGIC {
        return Err(FsError::Unformatted);
    }
    if !snapshot.super_block.matches(config)
        || snapshot.allocation.total_blocks() != config.capacity_blocks
        || snapshot.allocation.reserved_blocks() != config.metadata_blocks
    {
        return Err(FsError::CorruptData(format!(
            "snapshot geometry {}x{} (+{} metadata) does not match device {}x{} (+{})",
            snapshot.super_block.capacity_blocks,
            snapshot.super_block.block_size,
            snapshot.super_block.metadata_blocks,
            config.capacity_blocks,
            config.block_size,
            config.metadata_blocks,
        )));
    }

    snapshot.allocation.verify()?;
    check_chains(&snapshot.root, &snapshot.allocation, config.block_size)?;
    snapshot.root.rebuild_index_map();
    Ok(snapshot)
}

/// 块链必须落在数据区内、已分配、互不重叠，且长度与大小相符
fn check_chains(root: &Directory, allocation: &AllocationTable, block_size: usize) -> Result<()> {
    let mut seen = HashSet::new();
    let mut fault = None;
    root.walk("", &mut |path, node| {
        let Node::File(record) = node else {
            return;
        };
        if fault.is_some() {
            return;
        }
        if !record.is_tight(block_size) {
            fault = Some(format!(
                "{} has {} blocks for {} bytes",
                path,
                record.block_chain.len(),
                record.size
            ));
            return;
        }
        for &block in &record.block_chain {
            let in_data_region =
                block >= allocation.reserved_blocks() && block < allocation.total_blocks();
            let reason = if !in_data_region {
                "outside the data region"
            } else if !allocation.is_used(block) {
                "marked free"
            } else if !seen.insert(block) {
                "shared with another file"
            } else {
                continue;
            };
            fault = Some(format!("{}: block {} is {}", path, block, reason));
            return;
        }
    });

    match fault {
        Some(reason) => Err(FsError::CorruptData(reason)),
        None => Ok(()),
    }
}
