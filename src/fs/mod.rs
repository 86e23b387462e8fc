use tracing::{debug, info, warn};

use crate::{
    disk::{BlockDevice, FileDisk},
    fs::{
        allocator::AllocationTable,
        compression::{
            compressed_name, frame, is_compressed_name, unframe, Codec, CompressionReport,
            DecompressionReport, Lz4Codec,
        },
        config::FsConfig,
        directory::{validate_name, DirectoryTree, Entry, FileRecord, Node},
        error::{FsError, Result},
        executor::Executor,
        snapshot::{encoded_len, entry_len, read_snapshot, write_snapshot},
        super_block::SuperBlock,
    },
};

pub mod allocator;
pub mod compression;
pub mod config;
pub mod directory;
pub mod error;
pub mod executor;
pub mod snapshot;
pub mod super_block;

/// 存储占用（按逻辑大小统计，不是按已分配块统计）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

impl StorageUsage {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes - self.free_bytes
    }
}

/// `stat` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInfo {
    File(FileRecord),
    Directory { children: usize },
}

/// 单卷文件系统。持有设备与全部可变状态（分配表、目录树、游标），
/// 所有操作都经由它进行。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = FileDisk> {
    disk: D,                     // 底层磁盘抽象层
    config: FsConfig,            // 几何参数
    super_block: SuperBlock,     // 文件系统总体信息
    allocation: AllocationTable, // 块分配信息
    tree: DirectoryTree,         // 目录树与当前目录
    codec: Box<dyn Codec>,       // 压缩编解码器
    persistent: bool,            // 已格式化或已挂载：元数据区要能容纳快照
}

impl<D: BlockDevice> FileSystem<D> {
    /// 在设备上建立空的内存状态，不做任何 I/O
    pub fn new(disk: D, config: FsConfig) -> Result<Self> {
        config.validate()?;
        if disk.block_size() != config.block_size
            || disk.capacity_blocks() != config.capacity_blocks
        {
            return Err(FsError::Config(format!(
                "device is {}x{} bytes but config expects {}x{}",
                disk.capacity_blocks(),
                disk.block_size(),
                config.capacity_blocks,
                config.block_size
            )));
        }

        Ok(Self {
            super_block: SuperBlock::new(&config),
            allocation: AllocationTable::new(config.capacity_blocks, config.metadata_blocks),
            tree: DirectoryTree::new(),
            codec: Box::new(Lz4Codec),
            persistent: false,
            disk,
            config,
        })
    }

    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    pub fn allocation(&self) -> &AllocationTable {
        &self.allocation
    }

    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    /// 交还底层设备（卸载后重新挂载时使用）
    pub fn into_disk(self) -> D {
        self.disk
    }

    // ---------------------------------------------------------------- 生命周期

    /// 清零设备，重置状态并写入新快照
    pub fn format(&mut self) -> Result<()> {
        for index in 0..self.config.capacity_blocks {
            self.disk.write_block(index, &[])?;
        }
        self.super_block = SuperBlock::new(&self.config);
        self.allocation =
            AllocationTable::new(self.config.capacity_blocks, self.config.metadata_blocks);
        self.tree = DirectoryTree::new();
        self.persistent = false;
        self.save()?;
        self.persistent = true;
        info!(volume = %self.super_block.volume_id, "disk formatted");
        Ok(())
    }

    /// 从快照恢复分配表和目录树，游标回到根目录
    pub fn mount(&mut self) -> Result<()> {
        let snapshot = read_snapshot(&self.disk, &self.config)?;
        self.super_block = snapshot.super_block;
        self.allocation = snapshot.allocation;
        self.tree = DirectoryTree::from_root(snapshot.root);
        self.persistent = true;
        info!(
            volume = %self.super_block.volume_id,
            free_blocks = self.allocation.free_blocks(),
            "file system mounted"
        );
        Ok(())
    }

    /// 把分配表和目录树写入元数据区
    pub fn save(&mut self) -> Result<()> {
        self.super_block.free_blocks = self.allocation.free_blocks();
        self.super_block.saved_at = crate::utils::current_timestamp();
        let written = write_snapshot(
            &self.disk,
            &self.config,
            &self.super_block,
            &self.allocation,
            self.tree.root(),
        )?;
        info!(bytes = written, "snapshot saved");
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.save()?;
        self.disk.flush()
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.sync()?;
        info!("disk shut down");
        Ok(())
    }

    // ---------------------------------------------------------------- 文件操作

    pub fn create(&mut self, name: &str, content: &[u8]) -> Result<()> {
        validate_name(name)?;
        if self.tree.current_mut()?.contains(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let block_size = self.config.block_size;
        let blocks_needed = content.len().div_ceil(block_size);
        self.reserve_file_entry(name, blocks_needed, content.len() as u64)?;
        let block_chain = self.allocate_chain(blocks_needed)?;

        for (i, &block) in block_chain.iter().enumerate() {
            let start = i * block_size;
            let end = (start + block_size).min(content.len());
            self.disk.write_block(block, &content[start..end])?;
        }

        debug!(name, size = content.len(), blocks = ?block_chain, "file created");
        self.tree.current_mut()?.add(
            name,
            Node::File(FileRecord {
                block_chain,
                size: content.len() as u64,
            }),
        )
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let dir = self.tree.current_mut()?;
        match dir.get(name) {
            Some(Node::File(_)) => {}
            Some(Node::Directory(_)) => return Err(FsError::IsADirectory(name.to_string())),
            None => return Err(FsError::NotFound(name.to_string())),
        }
        if let Some(Node::File(record)) = dir.remove(name) {
            for block in record.block_chain {
                self.allocation.free(block)?;
            }
        }
        debug!(name, "file deleted");
        Ok(())
    }

    /// 改名只换键，块链和大小不变
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        self.reserve_metadata(new.len().saturating_sub(old.len()))?;
        self.tree.current_mut()?.rename(old, new)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let record = self.file_record(name)?;
        let mut content = Vec::with_capacity(record.block_chain.len() * self.config.block_size);
        for &block in &record.block_chain {
            content.extend_from_slice(&self.disk.read_block(block)?);
        }
        content.truncate(record.size as usize);
        Ok(content)
    }

    pub fn read_text(&self, name: &str) -> Result<String> {
        String::from_utf8(self.read(name)?)
            .map_err(|e| FsError::InvalidEncoding(format!("{}: {}", name, e)))
    }

    /// 分配新的块链并逐块拷贝
    pub fn copy(&mut self, src: &str, dest: &str) -> Result<()> {
        validate_name(dest)?;
        let source = self.file_record(src)?.clone();
        if self.tree.current_mut()?.contains(dest) {
            return Err(FsError::AlreadyExists(dest.to_string()));
        }
        self.reserve_file_entry(dest, source.block_chain.len(), source.size)?;

        let block_chain = self.allocate_chain(source.block_chain.len())?;
        for (&from, &to) in source.block_chain.iter().zip(&block_chain) {
            let buf = self.disk.read_block(from)?;
            self.disk.write_block(to, &buf)?;
        }

        debug!(src, dest, blocks = ?block_chain, "file copied");
        self.tree.current_mut()?.add(
            dest,
            Node::File(FileRecord {
                block_chain,
                size: source.size,
            }),
        )
    }

    pub fn list(&self) -> Vec<String> {
        self.tree.list_children()
    }

    pub fn stat(&self, name: &str) -> Result<NodeInfo> {
        match self.tree.current().get(name) {
            Some(Node::File(record)) => Ok(NodeInfo::File(record.clone())),
            Some(Node::Directory(dir)) => Ok(NodeInfo::Directory {
                children: dir.len(),
            }),
            None => Err(FsError::NotFound(name.to_string())),
        }
    }

    /// 整棵树中所有文件逻辑大小之和，与分配表无关
    pub fn check_storage(&self) -> StorageUsage {
        let total_bytes = self.config.capacity_blocks * self.config.block_size as u64;
        let used: u64 = self.tree.files().iter().map(|(_, r)| r.size).sum();
        StorageUsage {
            free_bytes: total_bytes.saturating_sub(used),
            total_bytes,
        }
    }

    pub fn find(&self, keyword: &str) -> Vec<String> {
        self.tree.find(keyword)
    }

    pub fn resolve(&self, path: &str) -> Result<Entry<'_>> {
        self.tree.resolve(path)
    }

    // ---------------------------------------------------------------- 目录操作

    pub fn make_dir(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.tree.current().contains(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        self.reserve_metadata(entry_len(name, &Node::Directory(Default::default()))?)?;
        self.tree.make_dir(name)
    }

    pub fn remove_dir(&mut self, name: &str) -> Result<()> {
        self.tree.remove_dir(name)
    }

    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        self.tree.change_dir(name)
    }

    /// 返回 false 表示已在根目录
    pub fn move_to_parent(&mut self) -> bool {
        self.tree.move_to_parent()
    }

    pub fn pwd(&self) -> String {
        self.tree.pwd()
    }

    // ---------------------------------------------------------------- 压缩

    pub fn compress(&mut self, name: &str) -> Result<CompressionReport> {
        let content = self.read(name)?;
        let framed = frame(name, &content, self.codec.as_ref())?;
        let target = compressed_name(name);
        self.create(&target, &framed)?;

        Ok(CompressionReport {
            source: name.to_string(),
            target,
            original_size: content.len() as u64,
            compressed_size: framed.len() as u64,
        })
    }

    pub fn decompress(&mut self, name: &str) -> Result<DecompressionReport> {
        if !is_compressed_name(name) {
            return Err(FsError::NotACompressedFile(name.to_string()));
        }
        let framed = self.read(name)?;
        let (restored, content) = unframe(&framed, self.codec.as_ref())?;
        self.create(&restored, &content)?;

        Ok(DecompressionReport {
            source: name.to_string(),
            restored,
            size: content.len() as u64,
        })
    }

    // ---------------------------------------------------------------- 执行

    pub fn run_file(&self, name: &str, executor: &mut dyn Executor) -> Result<()> {
        let source = self.read_text(name)?;
        executor
            .execute(name, &source)
            .map_err(|e| FsError::Execution(format!("{}: {}", name, e)))
    }

    // ---------------------------------------------------------------- 内部

    fn file_record(&self, name: &str) -> Result<&FileRecord> {
        match self.tree.current().get(name) {
            Some(Node::File(record)) => Ok(record),
            Some(Node::Directory(_)) => Err(FsError::IsADirectory(name.to_string())),
            None => Err(FsError::NotFound(name.to_string())),
        }
    }

    /// 快照再增长 `extra` 字节后仍要放得进元数据区，否则拒绝这次修改。
    /// 未格式化的卷没有快照需要保护，不做检查。
    fn reserve_metadata(&self, extra: usize) -> Result<()> {
        if !self.persistent || extra == 0 {
            return Ok(());
        }
        let needed =
            encoded_len(&self.super_block, &self.allocation, self.tree.root())? + extra;
        let available = self.config.metadata_bytes();
        if needed > available {
            warn!(needed, available, "metadata region full, change refused");
            return Err(FsError::MetadataOverflow { needed, available });
        }
        Ok(())
    }

    fn reserve_file_entry(&self, name: &str, blocks: usize, size: u64) -> Result<()> {
        if !self.persistent {
            return Ok(());
        }
        // 块号的取值不影响编码长度
        let node = Node::File(FileRecord {
            block_chain: vec![0; blocks],
            size,
        });
        self.reserve_metadata(entry_len(name, &node)?)
    }

    /// 逐块分配；中途失败时已分配的块不回收
    fn allocate_chain(&mut self, count: usize) -> Result<Vec<u64>> {
        let mut chain = Vec::with_capacity(count);
        for _ in 0..count {
            match self.allocation.allocate() {
                Ok(block) => chain.push(block),
                Err(e) => {
                    if !chain.is_empty() {
                        warn!(leaked = ?chain, "allocation failed part way, blocks stay in use");
                    }
                    return Err(e);
                }
            }
        }
        Ok(chain)
    }
}
