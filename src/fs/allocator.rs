//! 块分配表（FAT）。
//!
//! 分配策略是最简单的首次适配：按块号升序线性扫描，返回第一个空闲块。
//! 不做整理，也不保证文件的块连续，一个文件的块链可以任意分散。

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fs::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Used,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTable {
    bits: Vec<u8>,        // 位图数据，每个 bit 表示一个块是否被使用
    total_blocks: u64,    // 块总数
    free_blocks: u64,     // 当前空闲块数
    reserved_blocks: u64, // 头部保留给元数据的块数，永不分配
}

impl AllocationTable {
    pub fn new(total_blocks: u64, reserved_blocks: u64) -> Self {
        let byte_len = ((total_blocks + 7) / 8) as usize;
        let mut table = Self {
            bits: vec![0; byte_len],
            total_blocks,
            free_blocks: total_blocks,
            reserved_blocks: reserved_blocks.min(total_blocks),
        };
        for index in 0..table.reserved_blocks {
            table.set(index);
        }
        table.free_blocks = total_blocks - table.reserved_blocks;
        table
    }

    /// 分配一个空闲块，返回块号
    pub fn allocate(&mut self) -> Result<u64> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte == 0xFF {
                continue;
            }
            for bit in 0..8 {
                let index = (byte_index * 8 + bit) as u64;
                if index >= self.total_blocks {
                    return Err(FsError::DeviceFull);
                }
                if *byte & (1 << bit) == 0 {
                    *byte |= 1 << bit;
                    self.free_blocks -= 1;
                    debug!(block = index, free = self.free_blocks, "allocated block");
                    return Ok(index);
                }
            }
        }
        Err(FsError::DeviceFull)
    }

    /// 释放一个块。释放已空闲的块不报错（幂等），也不会改变空闲计数。
    pub fn free(&mut self, index: u64) -> Result<()> {
        if index >= self.total_blocks || index < self.reserved_blocks {
            return Err(FsError::OutOfRange {
                index,
                capacity: self.total_blocks,
            });
        }

        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;
        if self.bits[byte_index] & (1 << bit_index) != 0 {
            self.bits[byte_index] &= !(1 << bit_index);
            self.free_blocks += 1;
            debug!(block = index, free = self.free_blocks, "freed block");
        } else {
            warn!(block = index, "freeing a block that is already free");
        }
        Ok(())
    }

    pub fn state(&self, index: u64) -> Result<BlockState> {
        if index >= self.total_blocks {
            return Err(FsError::OutOfRange {
                index,
                capacity: self.total_blocks,
            });
        }
        Ok(if self.is_set(index) {
            BlockState::Used
        } else {
            BlockState::Free
        })
    }

    pub fn is_used(&self, index: u64) -> bool {
        index < self.total_blocks && self.is_set(index)
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn reserved_blocks(&self) -> u64 {
        self.reserved_blocks
    }

    pub fn free_blocks(&self) -> u64 {
        self.free_blocks
    }

    /// 已分配的数据块（不含保留区）
    pub fn used_data_blocks(&self) -> impl Iterator<Item = u64> + '_ {
        (self.reserved_blocks..self.total_blocks).filter(|&i| self.is_set(i))
    }

    /// 反序列化后校验位图长度并重新统计空闲块
    pub(crate) fn verify(&mut self) -> Result<()> {
        let byte_len = ((self.total_blocks + 7) / 8) as usize;
        if self.bits.len() != byte_len || self.reserved_blocks > self.total_blocks {
            return Err(FsError::CorruptData(format!(
                "allocation table holds {} bytes for {} blocks",
                self.bits.len(),
                self.total_blocks
            )));
        }
        let used = (0..self.total_blocks).filter(|&i| self.is_set(i)).count() as u64;
        self.free_blocks = self.total_blocks - used;
        Ok(())
    }

    fn is_set(&self, index: u64) -> bool {
        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;
        self.bits[byte_index] & (1 << bit_index) != 0
    }

    fn set(&mut self, index: u64) {
        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;
        self.bits[byte_index] |= 1 << bit_index;
    }
}
