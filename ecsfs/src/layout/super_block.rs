use core::ops::Range;

use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};

use crate::{BlockId, DataBlock, Error, Result, BLOCK_SIZE, SIGNATURE};

/// 超级块，位于0号块，记录卷的几何信息。
///
/// 编码后只占块首的17字节，块内其余部分皆填0。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// 恒为[`SIGNATURE`]
    signature: [u8; 8],

    /// 卷的块总数，须与设备一致
    total_blocks: u16,

    /// 根目录所在块
    root_dir: u16,

    /// 数据区的起始块
    data_start: u16,

    /// 数据块数量
    data_blocks: u16,

    /// FAT占用的块数，FAT紧随超级块存放
    fat_blocks: u8,
}

impl SuperBlock {
    /// 编码后的字节数
    pub const SIZE: usize = 17;

    /// 为一个共有`total_blocks`块的设备规划布局：
    ///
    /// 超级块 | FAT区 | 根目录 | 数据区
    ///
    /// FAT为每个数据块提供一个16位条目，取能容纳全部数据块的最少块数。
    pub fn new(total_blocks: usize) -> Option<Self> {
        if total_blocks > u16::MAX as usize {
            return None;
        }

        let fat_blocks = (1..=u8::MAX as usize).find(|&fat_blocks| {
            total_blocks
                .checked_sub(2 + fat_blocks)
                .is_some_and(|data_blocks| data_blocks * 2 <= fat_blocks * BLOCK_SIZE)
        })?;
        let data_blocks = total_blocks - 2 - fat_blocks;
        // 0号条目保留，至少要剩下一个可用块
        if data_blocks < 2 {
            return None;
        }

        Some(Self {
            signature: SIGNATURE,
            total_blocks: total_blocks as u16,
            root_dir: (1 + fat_blocks) as u16,
            data_start: (2 + fat_blocks) as u16,
            data_blocks: data_blocks as u16,
            fat_blocks: fat_blocks as u8,
        })
    }

    /// `None`表示块首不是一个完整的超级块
    pub fn decode(block: &[u8]) -> Option<Self> {
        Self::read(&mut Cursor::new(block)).ok()
    }

    pub fn encode(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))
            .expect("a superblock always fits in one block");
        block
    }

    /// 签名与块总数都必须和设备吻合，
    /// 各个区域也不能越出设备。
    pub fn validate(&self, device_blocks: usize) -> Result<()> {
        if self.signature != SIGNATURE {
            log::debug!("bad signature {:?}", self.signature);
            return Err(Error::InvalidVolume);
        }
        if self.total_blocks() != device_blocks {
            log::debug!(
                "volume claims {} blocks but the device has {device_blocks}",
                self.total_blocks
            );
            return Err(Error::InvalidVolume);
        }

        let total = self.total_blocks();
        if self.fat_blocks == 0
            || self.fat_area().end > total
            || self.root_dir() == 0
            || self.root_dir() >= total
            || self.fat_area().contains(&self.root_dir())
            || self.data_start() <= self.root_dir()
            || self.fat_area().contains(&self.data_start())
            || self.data_start() > total
        {
            log::debug!("geometry out of device: {self:?}");
            return Err(Error::InvalidVolume);
        }

        Ok(())
    }

    pub const fn total_blocks(&self) -> usize {
        self.total_blocks as usize
    }

    pub const fn root_dir(&self) -> usize {
        self.root_dir as usize
    }

    pub const fn data_start(&self) -> usize {
        self.data_start as usize
    }

    pub const fn data_blocks(&self) -> usize {
        self.data_blocks as usize
    }

    pub const fn fat_blocks(&self) -> usize {
        self.fat_blocks as usize
    }

    /// FAT所在的块
    pub const fn fat_area(&self) -> Range<usize> {
        1..1 + self.fat_blocks as usize
    }

    /// 数据块编号对应的设备块号
    pub fn data_block(&self, id: BlockId) -> usize {
        self.data_start() + usize::from(id)
    }

    /// 可分配的最大数据块编号（含）
    ///
    /// 编号范围是`1..=data_blocks`，但还须落在FAT与设备之内，
    /// 且不能与[`BlockId::EOC`]重合。
    pub fn last_block(&self) -> BlockId {
        let fat_entries = self.fat_blocks() * BLOCK_SIZE / 2;
        let device_room = self.total_blocks().saturating_sub(self.data_start() + 1);
        let last = self
            .data_blocks()
            .min(fat_entries.saturating_sub(1))
            .min(device_room)
            .min(BlockId::EOC.get() as usize - 1);
        BlockId::new(last as u16)
    }
}
