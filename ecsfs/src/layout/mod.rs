//! 卷的布局
//!
//! 超级块 | FAT区 | 根目录 | 数据区

mod dir_entry;
mod super_block;

pub use self::{
    dir_entry::{validate_name, DirEntry},
    super_block::SuperBlock,
};
