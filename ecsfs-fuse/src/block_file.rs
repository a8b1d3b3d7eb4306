use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError, BLOCK_SIZE};

/// 以宿主机上的镜像文件充当块设备
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    block_count: usize,
}

impl BlockFile {
    /// 打开已有的镜像，块数由文件长度决定
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let block_count = file.metadata()?.len() as usize / BLOCK_SIZE;
        Ok(Self {
            file: Mutex::new(file),
            block_count,
        })
    }

    /// 新建（或截断）镜像，长度向下取整到整块
    pub fn create(path: &Path, disk_size: u64) -> io::Result<Self> {
        let block_count = disk_size as usize / BLOCK_SIZE;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((block_count * BLOCK_SIZE) as u64)?;
        Ok(Self {
            file: Mutex::new(file),
            block_count,
        })
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(buf).expect("not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.write_all(buf).expect("not a complete block!");
    }

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn close(&self) -> Result<(), DeviceError> {
        let file = self.file.lock().map_err(|_| DeviceError::Io)?;
        file.sync_all().map_err(|e| {
            log::error!("failed to sync image: {e}");
            DeviceError::Io
        })
    }
}
