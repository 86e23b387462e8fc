use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    disk::block_device::{check_index, pad_block, BlockDevice},
    fs::error::Result,
};

/// 内存盘：扁平化存储所有块，用于测试和临时卷
#[derive(Debug)]
pub struct MemDisk {
    blocks: Mutex<Vec<u8>>,
    block_size: usize,
    capacity_blocks: u64,
}

impl MemDisk {
    pub fn new(capacity_blocks: u64, block_size: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![0u8; capacity_blocks as usize * block_size]),
            block_size,
            capacity_blocks,
        }
    }

    /// 整个设备内容的拷贝，便于检查镜像布局
    pub fn image(&self) -> Vec<u8> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockDevice for MemDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn capacity_blocks(&self) -> u64 {
        self.capacity_blocks
    }

    fn read_block(&self, index: u64) -> Result<Vec<u8>> {
        check_index(index, self.capacity_blocks)?;
        let start = index as usize * self.block_size;
        Ok(self.lock()[start..start + self.block_size].to_vec())
    }

    fn write_block(&self, index: u64, data: &[u8]) -> Result<()> {
        check_index(index, self.capacity_blocks)?;
        let buf = pad_block(data, self.block_size)?;
        let start = index as usize * self.block_size;
        self.lock()[start..start + self.block_size].copy_from_slice(&buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
