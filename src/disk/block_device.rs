use crate::fs::error::{FsError, Result};

/// 定长块设备：所有读写都以块为单位，偏移为 `index * block_size`。
pub trait BlockDevice: Send + Sync {
    /// 每块字节数
    fn block_size(&self) -> usize;

    /// 设备块总数
    fn capacity_blocks(&self) -> u64;

    /// 读取整块，返回长度恰好为 `block_size` 的缓冲区
    fn read_block(&self, index: u64) -> Result<Vec<u8>>;

    /// 写入一块；不足一块的部分补零，超过一块返回 `OversizeWrite`
    fn write_block(&self, index: u64, data: &[u8]) -> Result<()>;

    /// 把缓存中的数据刷到底层存储
    fn flush(&self) -> Result<()>;
}

/// 块号越界检查，设备实现共用
pub(crate) fn check_index(index: u64, capacity: u64) -> Result<()> {
    if index >= capacity {
        return Err(FsError::OutOfRange { index, capacity });
    }
    Ok(())
}

/// 把写入数据补零到整块长度
pub(crate) fn pad_block(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if data.len() > block_size {
        return Err(FsError::OversizeWrite {
            len: data.len(),
            block_size,
        });
    }
    let mut buf = vec![0u8; block_size];
    buf[..data.len()].copy_from_slice(data);
    Ok(buf)
}
