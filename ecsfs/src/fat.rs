//! 文件分配表(FAT)
//!
//! 每个数据块对应一个16位条目，存放着链表上下一个块的编号，
//! 其中`0`表示块未分配，[`BlockId::EOC`]表示链表结尾，`0`号条目保留。

use alloc::vec;
use alloc::vec::Vec;
use core::mem;

use block_dev::BlockDevice;

use crate::layout::SuperBlock;
use crate::{BlockId, BLOCK_SIZE};

/// 一个块能容纳多少条FAT条目
const BLOCK_ENTRIES: usize = BLOCK_SIZE / mem::size_of::<u16>();

#[derive(Debug, PartialEq, Eq)]
pub enum ChainError {
    /// 链接指向了空闲块
    Free,
    /// 链接指向了保留的或越界的块
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTable {
    entries: Vec<BlockId>,
    /// 可分配的最大块编号（含）
    last: BlockId,
}

impl FatTable {
    /// 空白的FAT，仅`0`号条目被占用
    pub fn new(sb: &SuperBlock) -> Self {
        let mut entries = vec![BlockId::FREE; sb.fat_blocks() * BLOCK_ENTRIES];
        entries[0] = BlockId::EOC;
        Self {
            entries,
            last: sb.last_block(),
        }
    }

    /// 从紧随超级块的FAT区读入
    pub fn load(dev: &dyn BlockDevice, sb: &SuperBlock) -> Self {
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut entries = Vec::with_capacity(sb.fat_blocks() * BLOCK_ENTRIES);
        for block_id in sb.fat_area() {
            dev.read_block(block_id, &mut block);
            entries.extend(
                block
                    .chunks_exact(2)
                    .map(|raw| BlockId::new(u16::from_le_bytes([raw[0], raw[1]]))),
            );
        }

        Self {
            entries,
            last: sb.last_block(),
        }
    }

    pub fn store(&self, dev: &dyn BlockDevice, sb: &SuperBlock) {
        let mut block = vec![0u8; BLOCK_SIZE];
        for (block_id, entries) in sb.fat_area().zip(self.entries.chunks(BLOCK_ENTRIES)) {
            for (raw, entry) in block.chunks_exact_mut(2).zip(entries) {
                raw.copy_from_slice(&entry.get().to_le_bytes());
            }
            dev.write_block(block_id, &block);
        }
    }

    /// 可分配的最大块编号（含）
    pub const fn last(&self) -> BlockId {
        self.last
    }

    /// `id`是否为可分配范围内的块编号
    pub fn is_valid(&self, id: BlockId) -> bool {
        self.validate(id).is_ok()
    }

    /// 获取下一个块编号。
    /// 若`id`指向未分配块，则报错。
    /// `Ok(None)`表示`id`为链表上最后一个块。
    pub fn next(&self, id: BlockId) -> Result<Option<BlockId>, ChainError> {
        let id = self.validate(id)?;
        match self.entries[usize::from(id)] {
            BlockId::EOC => Ok(None),
            next => self.validate(next).map(Some),
        }
    }

    /// 寻找编号最小的空闲块。
    pub fn find_free(&self) -> Option<BlockId> {
        (BlockId::MIN.get()..=self.last.get())
            .map(BlockId::new)
            .find(|&id| self.entries[usize::from(id)] == BlockId::FREE)
    }

    /// 寻找空闲块并标记为链尾。
    pub fn alloc(&mut self) -> Option<BlockId> {
        let id = self.find_free()?;
        self.entries[usize::from(id)] = BlockId::EOC;
        Some(id)
    }

    /// 将`next`接到`prev`之后，`next`成为新的链尾。
    pub fn couple(&mut self, prev: BlockId, next: BlockId) {
        self.entries[usize::from(prev)] = next;
        self.entries[usize::from(next)] = BlockId::EOC;
    }

    /// 令`id`成为链尾，原先接在其后的块全部释放并返回。
    pub fn terminate(&mut self, id: BlockId) -> Vec<BlockId> {
        let tail = match self.next(id) {
            Ok(Some(next)) => self.remove(next),
            _ => Vec::new(),
        };
        self.entries[usize::from(id)] = BlockId::EOC;
        tail
    }

    /// 移除整个块链表，返回被释放的块。
    pub fn remove(&mut self, start: BlockId) -> Vec<BlockId> {
        let freed: Vec<_> = self.chain(start).collect();
        for &id in &freed {
            self.entries[usize::from(id)] = BlockId::FREE;
        }
        log::trace!("freed {} blocks from chain {start}", freed.len());
        freed
    }

    /// 空闲块的数量
    pub fn free_count(&self) -> usize {
        (BlockId::MIN.get()..=self.last.get())
            .filter(|&id| self.entries[id as usize] == BlockId::FREE)
            .count()
    }

    /// 从`start`开始遍历块链表
    pub fn chain(&self, start: BlockId) -> Chain<'_> {
        Chain {
            fat: self,
            cursor: self.validate(start).ok().map(ChainCursor::new),
            fresh: true,
        }
    }

    fn validate(&self, id: BlockId) -> Result<BlockId, ChainError> {
        match id {
            BlockId::FREE => Err(ChainError::Free),
            id if id > self.last || usize::from(id) >= self.entries.len() => {
                Err(ChainError::Reserved)
            }
            id => Ok(id),
        }
    }
}

/// 块链表上的游标
///
/// 读取时只沿已有的链接前进，写入时可在链尾按需接上新块。
/// 步数不超过可分配块的总数，成环的链表也能走完。
#[derive(Debug, Clone)]
pub struct ChainCursor {
    current: BlockId,
    hops: usize,
}

impl ChainCursor {
    pub const fn new(start: BlockId) -> Self {
        Self {
            current: start,
            hops: 0,
        }
    }

    pub const fn current(&self) -> BlockId {
        self.current
    }

    /// 沿已有的链接前进一步，到达链尾时返回`None`
    pub fn advance(&mut self, fat: &FatTable) -> Option<BlockId> {
        if self.hops >= usize::from(fat.last()) {
            log::warn!("chain through block {} never ends", self.current);
            return None;
        }

        match fat.next(self.current) {
            Ok(Some(next)) => {
                self.current = next;
                self.hops += 1;
                Some(next)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("broken link after block {}: {e:?}", self.current);
                None
            }
        }
    }

    /// 前进一步，链表到头时分配新块接上。
    ///
    /// 返回块编号，以及它是否为新分配的块；没有空闲块时返回`None`。
    pub fn advance_or_extend(&mut self, fat: &mut FatTable) -> Option<(BlockId, bool)> {
        if let Some(next) = self.advance(fat) {
            return Some((next, false));
        }

        let next = fat.find_free()?;
        fat.couple(self.current, next);
        self.current = next;
        self.hops += 1;
        Some((next, true))
    }
}

/// 块链表的迭代器，可经由[`FatTable::chain`]随时重新开始
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    fat: &'a FatTable,
    cursor: Option<ChainCursor>,
    /// 首块尚未产出
    fresh: bool,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        if mem::take(&mut self.fresh) {
            return Some(cursor.current());
        }
        cursor.advance(self.fat)
    }
}
