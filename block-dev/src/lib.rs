//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、镜像文件等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! `ecsfs` 只通过块设备驱动读写卷。

#![no_std]

extern crate alloc;

mod memory;

use core::any::Any;

pub use self::memory::MemoryDisk;

/// 块大小，读写皆以此为单位
pub const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 设备未打开，或已被关闭
    NotOpen,
    /// 底层存储写回失败
    Io,
}

/// 块设备驱动特质
///
/// `buf`的长度恒为[`BLOCK_SIZE`]。
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);

    /// 设备的块总数
    fn block_count(&self) -> usize;

    /// 关闭设备，写回尚未落盘的数据
    fn close(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}
