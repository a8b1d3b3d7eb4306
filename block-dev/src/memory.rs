use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::{BlockDevice, DeviceError, BLOCK_SIZE};

/// 内存盘，镜像整个放在内存中。
#[derive(Debug)]
pub struct MemoryDisk {
    data: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl MemoryDisk {
    /// 创建`block_count`个全零块
    pub fn new(block_count: usize) -> Self {
        Self::from_image(vec![0; block_count * BLOCK_SIZE])
    }

    /// 不足一块的尾部会被补零
    pub fn from_image(mut image: Vec<u8>) -> Self {
        let len = image.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        image.resize(len, 0);
        Self {
            data: Mutex::new(image),
            closed: AtomicBool::new(false),
        }
    }

    /// 当前镜像的拷贝
    pub fn image(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 重新打开已关闭的盘，数据保持不变
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }

    fn range(block_id: usize) -> core::ops::Range<usize> {
        let start = block_id * BLOCK_SIZE;
        start..start + BLOCK_SIZE
    }
}

impl BlockDevice for MemoryDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let data = self.data.lock();
        assert!(block_id < data.len() / BLOCK_SIZE, "block {block_id} out of range");
        buf.copy_from_slice(&data[Self::range(block_id)]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut data = self.data.lock();
        assert!(block_id < data.len() / BLOCK_SIZE, "block {block_id} out of range");
        data[Self::range(block_id)].copy_from_slice(buf);
    }

    fn block_count(&self) -> usize {
        self.data.lock().len() / BLOCK_SIZE
    }

    fn close(&self) -> Result<(), DeviceError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            Err(DeviceError::NotOpen)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_written_block() {
        let disk = MemoryDisk::new(4);
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;
        disk.write_block(2, &block);

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(2, &mut buf);
        assert_eq!(buf, block);
        disk.read_block(1, &mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn image_is_padded_to_whole_blocks() {
        let disk = MemoryDisk::from_image(vec![1; BLOCK_SIZE + 1]);
        assert_eq!(disk.block_count(), 2);
        assert_eq!(disk.image().len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn close_twice() {
        let disk = MemoryDisk::new(1);
        assert_eq!(disk.close(), Ok(()));
        assert!(disk.is_closed());
        assert_eq!(disk.close(), Err(DeviceError::NotOpen));
        disk.reopen();
        assert_eq!(disk.close(), Ok(()));
    }
}
