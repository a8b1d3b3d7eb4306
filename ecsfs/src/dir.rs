//! 根目录：定长的目录项表，整体存放在一个块中

use alloc::vec::Vec;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};
use block_dev::BlockDevice;

use crate::layout::{validate_name, DirEntry};
use crate::{Error, Result, BLOCK_SIZE, FILE_MAX_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    slots: Vec<DirEntry>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            slots: alloc::vec![DirEntry::default(); FILE_MAX_COUNT],
        }
    }

    /// 读入根目录块。
    /// 若块中的目录项无法解析，返回`InvalidVolume`。
    pub fn load(dev: &dyn BlockDevice, block_id: usize) -> Result<Self> {
        let mut block = alloc::vec![0u8; BLOCK_SIZE];
        dev.read_block(block_id, &mut block);

        let mut cursor = Cursor::new(&block[..]);
        let slots = (0..FILE_MAX_COUNT)
            .map(|_| DirEntry::read(&mut cursor).map_err(|_| Error::InvalidVolume))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots })
    }

    pub fn store(&self, dev: &dyn BlockDevice, block_id: usize) {
        let mut block = alloc::vec![0u8; BLOCK_SIZE];
        let mut cursor = Cursor::new(&mut block[..]);
        for dir_entry in &self.slots {
            dir_entry
                .write(&mut cursor)
                .expect("the root directory always fits in one block");
        }
        dev.write_block(block_id, &block);
    }

    /// 文件名对应的目录项索引
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_named(name))
    }

    pub fn get(&self, index: usize) -> &DirEntry {
        &self.slots[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut DirEntry {
        &mut self.slots[index]
    }

    /// 在首个空闲项中创建空文件
    pub fn create(&mut self, name: &str) -> Result<usize> {
        let dir_entry = DirEntry::new(name)?;
        let index = self
            .slots
            .iter()
            .position(DirEntry::is_free)
            .ok_or(Error::CapacityExhausted)?;
        if self.find(name).is_some() {
            return Err(Error::Duplicate);
        }
        self.slots[index] = dir_entry;

        Ok(index)
    }

    /// 清空文件名对应的目录项，返回原先的内容
    pub fn remove(&mut self, name: &str) -> Result<DirEntry> {
        validate_name(name)?;
        let index = self.find(name).ok_or(Error::NotFound)?;
        Ok(core::mem::take(&mut self.slots[index]))
    }

    /// 所有被占用的目录项
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().filter(|slot| !slot.is_free())
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_free()).count()
    }
}
