#![no_std]

extern crate alloc;

/* ecsfs 的整体架构，自上而下 */

// 卷层：挂载、目录操作、会话与读写引擎
mod volume;

// 表层：目录表与打开会话表
mod dir;
mod session;

// 分配表层：FAT与簇链遍历
mod fat;

// 磁盘数据结构层：超级块与目录项的编解码
pub mod layout;

mod block;
mod error;

pub use block_dev::BLOCK_SIZE;

pub use self::{
    block::BlockId,
    error::{Error, Result},
    volume::{FileRecord, Volume, VolumeInfo},
};

pub const SIGNATURE: [u8; 8] = *b"ECS150FS";

/// 文件名字段的字节数，含结尾的`\0`
pub const FILENAME_LEN: usize = 16;
/// 根目录容纳的文件数
pub const FILE_MAX_COUNT: usize = 128;
/// 可同时打开的会话数
pub const OPEN_MAX_COUNT: usize = 32;

type DataBlock = [u8; BLOCK_SIZE];
