use alloc::string::String;
use core::fmt;

use crate::{BlockId, FILE_MAX_COUNT};

/// 卷的几何信息与空闲比例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: usize,
    pub fat_blocks: usize,
    pub root_dir: usize,
    pub data_start: usize,
    pub data_blocks: usize,
    /// 空闲的FAT条目数，分母为`data_blocks`
    pub fat_free: usize,
    /// 空闲的目录项数，分母为[`FILE_MAX_COUNT`]
    pub dir_free: usize,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_blocks)?;
        writeln!(f, "rdir_blk={}", self.root_dir)?;
        writeln!(f, "data_blk={}", self.data_start)?;
        writeln!(f, "data_blk_count={}", self.data_blocks)?;
        writeln!(f, "fat_free_ratio={}/{}", self.fat_free, self.data_blocks)?;
        write!(f, "rdir_free_ratio={}/{}", self.dir_free, FILE_MAX_COUNT)
    }
}

/// `ls`列出的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub size: usize,
    /// 尚未写入过的文件为[`BlockId::EOC`]
    pub first_block: BlockId,
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name, self.size, self.first_block
        )
    }
}
