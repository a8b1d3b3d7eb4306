//! 卷：挂载期间的全部状态
//!
//! 挂载时读入超级块、FAT与根目录，之后的操作只改动内存中的副本，
//! 卸载时再按超级块、FAT、根目录的顺序写回。

mod io;
mod report;

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;

pub use self::report::{FileRecord, VolumeInfo};
use crate::dir::Directory;
use crate::fat::FatTable;
use crate::layout::{validate_name, SuperBlock};
use crate::session::SessionTable;
use crate::{BlockId, Error, Result, BLOCK_SIZE};

pub struct Volume {
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    sb: SuperBlock,
    fat: FatTable,
    dir: Directory,
    sessions: SessionTable,
}

impl Volume {
    /// 在设备上建立空白的卷，布局由设备的块数决定。
    pub fn format(dev: &dyn BlockDevice) -> Result<SuperBlock> {
        let sb = SuperBlock::new(dev.block_count()).ok_or(Error::InvalidArgument)?;

        let zero = vec![0u8; BLOCK_SIZE];
        for block_id in 1..sb.total_blocks() {
            dev.write_block(block_id, &zero);
        }
        dev.write_block(0, &sb.encode());
        FatTable::new(&sb).store(dev, &sb);
        Directory::new().store(dev, sb.root_dir());

        log::debug!("formatted {sb:?}");
        Ok(sb)
    }

    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self> {
        if dev.block_count() == 0 {
            return Err(Error::InvalidVolume);
        }

        let sb: SuperBlock = {
            let mut block = vec![0u8; BLOCK_SIZE];
            dev.read_block(0, &mut block);
            SuperBlock::decode(&block).ok_or(Error::InvalidVolume)?
        };
        sb.validate(dev.block_count())?;

        let fat = FatTable::load(dev.as_ref(), &sb);
        let dir = Directory::load(dev.as_ref(), sb.root_dir())?;
        log::debug!("mounted {sb:?}");

        Ok(Self {
            dev,
            sb,
            fat,
            dir,
            sessions: SessionTable::new(),
        })
    }

    /// 写回超级块、FAT与根目录，然后关闭设备。
    pub fn unmount(self) -> Result<()> {
        self.check()?;

        let dev = self.dev.as_ref();
        dev.write_block(0, &self.sb.encode());
        self.fat.store(dev, &self.sb);
        self.dir.store(dev, self.sb.root_dir());
        if !self.sessions.is_empty() {
            log::debug!("unmounting with {} open sessions", self.sessions.len());
        }

        self.dev.close()?;
        log::debug!("unmounted");
        Ok(())
    }

    pub fn info(&self) -> Result<VolumeInfo> {
        self.check()?;

        Ok(VolumeInfo {
            total_blocks: self.sb.total_blocks(),
            fat_blocks: self.sb.fat_blocks(),
            root_dir: self.sb.root_dir(),
            data_start: self.sb.data_start(),
            data_blocks: self.sb.data_blocks(),
            fat_free: self.fat.free_count(),
            dir_free: self.dir.free_count(),
        })
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.sb
    }

    /// 创建空文件，首块留待第一次写入时分配。
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.check()?;
        self.dir.create(name)?;
        log::trace!("created {name:?}");
        Ok(())
    }

    /// 删除文件，其块链表归还为空闲，数据块清零。
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.check()?;

        let dir_entry = self.dir.remove(name)?;
        // 从未写入过的文件不占有数据块
        if dir_entry.has_blocks() {
            let freed = self.fat.remove(dir_entry.first_block());
            self.zeroize(&freed);
        }
        log::trace!("deleted {name:?}");

        Ok(())
    }

    pub fn ls(&self) -> Result<Vec<FileRecord>> {
        self.check()?;

        Ok(self
            .dir
            .entries()
            .map(|dir_entry| FileRecord {
                name: dir_entry.name().into_owned(),
                size: dir_entry.size(),
                first_block: dir_entry.first_block(),
            })
            .collect())
    }

    /// 打开文件，返回描述符
    pub fn open(&mut self, name: &str) -> Result<usize> {
        self.check()?;
        if self.sessions.is_full() {
            return Err(Error::CapacityExhausted);
        }
        validate_name(name)?;
        self.dir.find(name).ok_or(Error::NotFound)?;

        self.sessions.open(name)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.check()?;
        self.sessions.close(fd)?;
        Ok(())
    }

    /// 文件的字节数
    pub fn stat(&self, fd: usize) -> Result<usize> {
        self.check()?;
        let index = self.resolve(fd)?;
        Ok(self.dir.get(index).size())
    }

    /// 设置游标，允许越过文件末尾
    pub fn seek(&mut self, fd: usize, offset: usize) -> Result<()> {
        self.check()?;
        self.sessions.get_mut(fd)?.seek(offset);
        Ok(())
    }
}

impl Volume {
    /// 超级块须与设备吻合，否则任何操作都不能进行
    fn check(&self) -> Result<()> {
        self.sb.validate(self.dev.block_count())
    }

    /// 描述符所指文件的目录项索引
    fn resolve(&self, fd: usize) -> Result<usize> {
        let session = self.sessions.get(fd)?;
        self.dir.find(session.name()).ok_or(Error::NotFound)
    }

    fn zeroize(&self, blocks: &[BlockId]) {
        let zero = vec![0u8; BLOCK_SIZE];
        for &id in blocks {
            self.dev.write_block(self.sb.data_block(id), &zero);
        }
    }
}
