use std::sync::mpsc::Sender;

use tracing::warn;

use crate::{
    disk::FileDisk,
    fs::{
        config::FsConfig,
        error::{FsError, Result},
        FileSystem,
    },
};

/// 启动过程中发给 shell 的进度消息
#[derive(Debug)]
pub enum BootProgress {
    Step(&'static str),
    Progress(u64),
    Finished(Result<FileSystem<FileDisk>>),
}

/// 打开磁盘镜像并挂载，结果通过 `BootProgress::Finished` 送回
pub fn perform_disk_initialization(config: FsConfig, tx: Sender<BootProgress>) {
    let _ = tx.send(BootProgress::Step("🧠 Initializing virtual disk..."));
    let result = open_file_system(config, &tx);
    let _ = tx.send(BootProgress::Progress(100));
    let _ = tx.send(BootProgress::Finished(result));
}

fn open_file_system(config: FsConfig, tx: &Sender<BootProgress>) -> Result<FileSystem<FileDisk>> {
    let (disk, created) =
        FileDisk::open(&config.disk_path, config.block_size, config.capacity_blocks)?;
    let _ = tx.send(BootProgress::Progress(30));

    let mut fs = FileSystem::new(disk, config)?;

    if created {
        // 只有“明确是新磁盘”才格式化
        let _ = tx.send(BootProgress::Step(
            "🔧 No disk found, formatting new file system...",
        ));
        fs.format()?;
        return Ok(fs);
    }

    let _ = tx.send(BootProgress::Step("⚙️ Mounting file system..."));
    match fs.mount() {
        Ok(()) => {}
        Err(FsError::Unformatted) => {
            warn!("disk image holds no snapshot, formatting");
            let _ = tx.send(BootProgress::Step("🔧 Empty disk image, formatting..."));
            fs.format()?;
        }
        Err(e) => return Err(e),
    }
    Ok(fs)
}
