//! Common utilities for tests

#![allow(dead_code)]

use std::collections::HashSet;

use blockfs::{FileSystem, FsConfig, MemDisk};

/// 内存盘上的空文件系统（未格式化，不做 I/O）
pub fn mem_fs(
    block_size: usize,
    capacity_blocks: u64,
    metadata_blocks: u64,
) -> FileSystem<MemDisk> {
    let config = FsConfig::new(block_size, capacity_blocks, metadata_blocks);
    FileSystem::new(MemDisk::new(capacity_blocks, block_size), config).unwrap()
}

/// 已格式化的默认几何文件系统（1024 x 512，16 块元数据）
pub fn formatted_fs() -> FileSystem<MemDisk> {
    let config = FsConfig::default();
    let mut fs = FileSystem::new(
        MemDisk::new(config.capacity_blocks, config.block_size),
        config,
    )
    .unwrap();
    fs.format().unwrap();
    fs
}

/// 每个块最多属于一个文件，块链中的块都已分配，块链长度恰好够用
pub fn assert_invariants(fs: &FileSystem<MemDisk>) {
    let block_size = fs.config().block_size;
    let mut seen = HashSet::new();
    for (path, record) in fs.tree().files() {
        assert!(
            record.is_tight(block_size),
            "{} has {} blocks for {} bytes",
            path,
            record.block_chain.len(),
            record.size
        );
        for &block in &record.block_chain {
            assert!(seen.insert(block), "block {} shared, seen again in {}", block, path);
            assert!(fs.allocation().is_used(block), "block {} of {} is free", block, path);
            assert!(block >= fs.config().metadata_blocks, "{} uses metadata block {}", path, block);
        }
    }
}

/// 已分配块与文件引用的块完全一致（没有泄漏时成立）
pub fn assert_no_leaks(fs: &FileSystem<MemDisk>) {
    let referenced: HashSet<u64> = fs
        .tree()
        .files()
        .iter()
        .flat_map(|(_, r)| r.block_chain.iter().copied())
        .collect();
    let used: HashSet<u64> = fs.allocation().used_data_blocks().collect();
    assert_eq!(used, referenced);
}
