//! 数据块的编号与暂存缓冲区

use alloc::boxed::Box;
use alloc::vec;

use block_dev::BlockDevice;
use derive_more::{Display, From, Into};

use crate::BLOCK_SIZE;

/// 数据块编号，同时也是FAT条目的取值。
///
/// - `0`: 空闲
/// - [`BlockId::EOC`]: 链表上最后一个块
/// - 其余: 链表上下一个块的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct BlockId(u16);

impl BlockId {
    pub const FREE: Self = Self(0);

    /// 最小的可用块号，0号条目保留
    pub const MIN: Self = Self(1);

    pub const EOC: Self = Self(u16::MAX);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<BlockId> for usize {
    fn from(id: BlockId) -> Self {
        id.0 as usize
    }
}

/// 暂存缓冲区
///
/// 块设备只能整块读写，零碎的字节访问都经由它中转。
#[derive(Debug)]
pub struct Staging {
    data: Box<[u8]>,
    /// 所缓存的设备块号
    id: Option<usize>,
    /// 是否为脏块
    modified: bool,
}

impl Staging {
    pub fn new() -> Self {
        Self {
            data: vec![0; BLOCK_SIZE].into(),
            id: None,
            modified: false,
        }
    }

    /// 写回当前块，再从设备读入`id`
    pub fn load(&mut self, dev: &dyn BlockDevice, id: usize) {
        self.sync(dev);
        dev.read_block(id, &mut self.data);
        self.id = Some(id);
        log::trace!("staging: loaded block {id}");
    }

    /// 写回当前块，改为暂存一个全新的零块`id`，不读设备
    pub fn fresh(&mut self, dev: &dyn BlockDevice, id: usize) {
        self.sync(dev);
        self.data.fill(0);
        self.id = Some(id);
        self.modified = true;
        log::trace!("staging: fresh block {id}");
    }

    pub fn sync(&mut self, dev: &dyn BlockDevice) {
        if let Some(id) = self.id.filter(|_| self.modified) {
            self.modified = false;
            dev.write_block(id, &self.data);
            log::trace!("staging: flushed block {id}");
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.modified = true;
        &mut self.data
    }
}
