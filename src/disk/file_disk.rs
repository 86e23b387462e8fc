use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{
    disk::block_device::{check_index, pad_block, BlockDevice},
    fs::error::Result,
};

/// 以宿主机文件作为后端的虚拟磁盘（disk.img）
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    block_size: usize,
    capacity_blocks: u64,
}

impl FileDisk {
    /// 打开或创建镜像文件，长度不足时扩展到 `capacity_blocks * block_size`。
    /// 返回值中的 bool 表示镜像是否为新建。
    pub fn open(
        path: impl AsRef<Path>,
        block_size: usize,
        capacity_blocks: u64,
    ) -> Result<(Self, bool)> {
        let path = path.as_ref();
        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let disk_size = block_size as u64 * capacity_blocks;
        if file.metadata()?.len() < disk_size {
            debug!(path = %path.display(), disk_size, "allocating disk image");
            file.set_len(disk_size)?;
        }

        let disk = Self {
            file: Mutex::new(file),
            block_size,
            capacity_blocks,
        };
        Ok((disk, !existed))
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockDevice for FileDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn capacity_blocks(&self) -> u64 {
        self.capacity_blocks
    }

    fn read_block(&self, index: u64) -> Result<Vec<u8>> {
        check_index(index, self.capacity_blocks)?;
        let mut buf = vec![0u8; self.block_size];
        let mut file = self.lock();
        file.seek(SeekFrom::Start(index * self.block_size as u64))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_block(&self, index: u64, data: &[u8]) -> Result<()> {
        check_index(index, self.capacity_blocks)?;
        let buf = pad_block(data, self.block_size)?;
        let mut file = self.lock();
        file.seek(SeekFrom::Start(index * self.block_size as u64))?;
        file.write_all(&buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.lock();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}
