//! 读写引擎
//!
//! 把以字节计的游标区间映射为FAT链表上的一串块，
//! 块内的零碎访问经由暂存缓冲区中转。

use alloc::vec::Vec;

use crate::block::Staging;
use crate::fat::ChainCursor;
use crate::{BlockId, Result, Volume, BLOCK_SIZE};

impl Volume {
    /// 从游标处读取至多`buf.len()`字节，返回实际读到的字节数。
    ///
    /// 游标在文件末尾或之后时读不到任何字节。
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        self.check()?;

        let offset = self.sessions.get(fd)?.cursor();
        let index = self.resolve(fd)?;
        let dir_entry = self.dir.get(index);

        let want = dir_entry.size().saturating_sub(offset).min(buf.len());
        if want == 0 || !self.fat.is_valid(dir_entry.first_block()) {
            return Ok(0);
        }

        let dev = self.dev.as_ref();
        let mut chain = ChainCursor::new(dir_entry.first_block());
        for _ in 0..offset / BLOCK_SIZE {
            if chain.advance(&self.fat).is_none() {
                return Ok(0);
            }
        }

        let mut staging = Staging::new();
        staging.load(dev, self.sb.data_block(chain.current()));

        let mut pos = offset % BLOCK_SIZE;
        let mut read_size = 0;
        while read_size < want {
            if pos == BLOCK_SIZE {
                // 读取从不分配新块
                let Some(next) = chain.advance(&self.fat) else {
                    break;
                };
                staging.load(dev, self.sb.data_block(next));
                pos = 0;
            }

            let block_read_size = (BLOCK_SIZE - pos).min(want - read_size);
            buf[read_size..read_size + block_read_size]
                .copy_from_slice(&staging.as_slice()[pos..pos + block_read_size]);
            pos += block_read_size;
            read_size += block_read_size;
        }

        self.sessions.get_mut(fd)?.advance(read_size);
        log::trace!("fd {fd}: read {read_size}/{} bytes at {offset}", buf.len());

        Ok(read_size)
    }

    /// 从游标处写入`data`，返回实际写入的字节数。
    ///
    /// 空闲块耗尽时提前停止，返回值小于`data.len()`并不算错误。
    /// 链表总是终止于最后写入的块。
    pub fn write(&mut self, fd: usize, data: &[u8]) -> Result<usize> {
        self.check()?;

        let offset = self.sessions.get(fd)?.cursor();
        let index = self.resolve(fd)?;
        if data.is_empty() {
            return Ok(0);
        }

        let dev = self.dev.as_ref();
        let dir_entry = self.dir.get_mut(index);

        // 空文件：分配首块
        let mut is_new = false;
        let mut claimed_first = false;
        if !self.fat.is_valid(dir_entry.first_block()) {
            let Some(first) = self.fat.alloc() else {
                log::warn!("fd {fd}: no free block for the first block");
                return Ok(0);
            };
            dir_entry.set_first_block(first);
            is_new = true;
            claimed_first = true;
        }

        let mut staging = Staging::new();
        let mut chain = ChainCursor::new(dir_entry.first_block());
        // 原链尾，之后的块都是为越过链尾而新接上的
        let mut old_tail = None;

        // 游标可能越过了链尾，途经的新块一律清零
        for _ in 0..offset / BLOCK_SIZE {
            if is_new {
                staging.fresh(dev, self.sb.data_block(chain.current()));
            }
            let prev = chain.current();
            match chain.advance_or_extend(&mut self.fat) {
                Some((_, new)) => {
                    if new && old_tail.is_none() {
                        old_tail = Some(prev);
                    }
                    is_new = new;
                }
                None => {
                    log::warn!("fd {fd}: volume full before reaching offset {offset}");
                    // 一个字节也没写，本次接上的块全部退还
                    let freed = if claimed_first {
                        let first = dir_entry.first_block();
                        dir_entry.set_first_block(BlockId::EOC);
                        self.fat.remove(first)
                    } else if let Some(tail) = old_tail {
                        self.fat.terminate(tail)
                    } else {
                        Vec::new()
                    };
                    self.zeroize(&freed);
                    return Ok(0);
                }
            }
        }

        let block_id = self.sb.data_block(chain.current());
        if is_new {
            staging.fresh(dev, block_id);
        } else {
            staging.load(dev, block_id);
        }

        let mut pos = offset % BLOCK_SIZE;
        let mut wrote_size = 0;
        while wrote_size < data.len() {
            if pos == BLOCK_SIZE {
                let Some((next, new)) = chain.advance_or_extend(&mut self.fat) else {
                    log::warn!(
                        "fd {fd}: volume full, wrote {wrote_size}/{} bytes",
                        data.len()
                    );
                    break;
                };
                let block_id = self.sb.data_block(next);
                if new {
                    staging.fresh(dev, block_id);
                } else {
                    staging.load(dev, block_id);
                }
                pos = 0;
            }

            let block_write_size = (BLOCK_SIZE - pos).min(data.len() - wrote_size);
            staging.as_mut_slice()[pos..pos + block_write_size]
                .copy_from_slice(&data[wrote_size..wrote_size + block_write_size]);
            pos += block_write_size;
            wrote_size += block_write_size;
        }
        staging.sync(dev);

        // 旧链表在此之后的块不再可达
        let orphans = self.fat.terminate(chain.current());

        let size = if dir_entry.size() == 0 {
            wrote_size
        } else {
            dir_entry.size().max(offset + wrote_size)
        };
        dir_entry.resize(size);

        self.zeroize(&orphans);
        self.sessions.get_mut(fd)?.advance(wrote_size);
        log::trace!("fd {fd}: wrote {wrote_size} bytes at {offset}, size {size}");

        Ok(wrote_size)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    use block_dev::MemoryDisk;

    use super::*;
    use crate::{Error, OPEN_MAX_COUNT};

    fn mounted(blocks: usize) -> Volume {
        let disk = Arc::new(MemoryDisk::new(blocks));
        Volume::format(&*disk).unwrap();
        Volume::mount(disk).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn chain_len(volume: &Volume, name: &str) -> usize {
        let index = volume.dir.find(name).unwrap();
        volume.fat.chain(volume.dir.get(index).first_block()).count()
    }

    #[test]
    fn write_then_read_back() {
        let mut volume = mounted(40);
        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();
        assert_eq!(volume.stat(fd), Ok(0));

        assert_eq!(volume.write(fd, b"hello world"), Ok(11));
        assert_eq!(volume.stat(fd), Ok(11));

        volume.seek(fd, 0).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(volume.read(fd, &mut buf), Ok(11));
        assert_eq!(&buf[..11], b"hello world");
        // 游标已在末尾
        assert_eq!(volume.read(fd, &mut buf), Ok(0));
    }

    #[test]
    fn read_across_block_boundary() {
        let mut volume = mounted(40);
        let free = volume.fat.free_count();
        let data = pattern(5000);

        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();
        assert_eq!(volume.write(fd, &data), Ok(5000));
        assert_eq!(volume.stat(fd), Ok(5000));
        assert_eq!(volume.fat.free_count(), free - 2);
        assert_eq!(chain_len(&volume, "f"), 2);

        volume.seek(fd, 4090).unwrap();
        let mut buf = [0u8; 20];
        assert_eq!(volume.read(fd, &mut buf), Ok(20));
        assert_eq!(&buf[..], &data[4090..4110]);

        // 只剩10字节时读不满
        volume.seek(fd, 4990).unwrap();
        assert_eq!(volume.read(fd, &mut buf), Ok(10));
        assert_eq!(&buf[..10], &data[4990..]);
    }

    #[test]
    fn cursor_past_end_reads_nothing() {
        let mut volume = mounted(40);
        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();
        volume.write(fd, b"abc").unwrap();

        volume.seek(fd, 3 * BLOCK_SIZE).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(volume.read(fd, &mut buf), Ok(0));
    }

    #[test]
    fn cursors_are_independent() {
        let mut volume = mounted(40);
        volume.create("f").unwrap();
        let a = volume.open("f").unwrap();
        let b = volume.open("f").unwrap();
        volume.write(a, b"abcdef").unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(volume.read(b, &mut buf), Ok(3));
        assert_eq!(&buf, b"abc");
        assert_eq!(volume.read(a, &mut buf), Ok(0));
        assert_eq!(volume.read(b, &mut buf), Ok(3));
        assert_eq!(&buf, b"def");
    }

    #[test]
    fn empty_write_allocates_nothing() {
        let mut volume = mounted(40);
        let free = volume.fat.free_count();
        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();

        assert_eq!(volume.write(fd, &[]), Ok(0));
        assert_eq!(volume.fat.free_count(), free);
        assert_eq!(volume.ls().unwrap()[0].first_block, BlockId::EOC);
    }

    #[test]
    fn gap_after_seek_reads_as_zeros() {
        let mut volume = mounted(40);
        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();
        volume.write(fd, b"ab").unwrap();

        volume.seek(fd, 5000).unwrap();
        assert_eq!(volume.write(fd, b"xy"), Ok(2));
        assert_eq!(volume.stat(fd), Ok(5002));
        assert_eq!(chain_len(&volume, "f"), 2);

        volume.seek(fd, 0).unwrap();
        let mut buf = vec![0xffu8; 5002];
        assert_eq!(volume.read(fd, &mut buf), Ok(5002));
        assert_eq!(&buf[..2], b"ab");
        assert!(buf[2..5000].iter().all(|&b| b == 0));
        assert_eq!(&buf[5000..], b"xy");
    }

    #[test]
    fn overwrite_ends_chain_at_last_written_block() {
        let mut volume = mounted(40);
        let free = volume.fat.free_count();
        volume.create("f").unwrap();
        let fd = volume.open("f").unwrap();
        volume.write(fd, &pattern(3 * BLOCK_SIZE)).unwrap();
        assert_eq!(volume.fat.free_count(), free - 3);

        volume.seek(fd, 100).unwrap();
        assert_eq!(volume.write(fd, &[7; 10]), Ok(10));
        assert_eq!(chain_len(&volume, "f"), 1);
        assert_eq!(volume.fat.free_count(), free - 1);
        assert_eq!(volume.stat(fd), Ok(3 * BLOCK_SIZE));

        volume.seek(fd, 95).unwrap();
        let mut buf = [0u8; 20];
        assert_eq!(volume.read(fd, &mut buf), Ok(20));
        assert_eq!(&buf[..5], &pattern(100)[95..]);
        assert_eq!(&buf[5..15], &[7; 10]);
    }

    #[test]
    fn short_write_when_volume_fills() {
        // 10 - 3 = 7个数据块，可分配的只有1..=6
        let mut volume = mounted(10);
        assert_eq!(volume.fat.free_count(), 6);

        let big = pattern(5 * BLOCK_SIZE);
        volume.create("big").unwrap();
        let fd_big = volume.open("big").unwrap();
        assert_eq!(volume.write(fd_big, &big), Ok(big.len()));

        volume.create("small").unwrap();
        let fd_small = volume.open("small").unwrap();
        assert_eq!(volume.write(fd_small, &[1; 2 * BLOCK_SIZE]), Ok(BLOCK_SIZE));
        assert_eq!(volume.stat(fd_small), Ok(BLOCK_SIZE));
        assert_eq!(chain_len(&volume, "small"), 1);
        assert_eq!(volume.fat.free_count(), 0);
        assert_eq!(volume.write(fd_small, b"more"), Ok(0));

        // 其他文件的内容不受影响
        volume.seek(fd_big, 0).unwrap();
        let mut buf = vec![0u8; big.len()];
        assert_eq!(volume.read(fd_big, &mut buf), Ok(big.len()));
        assert_eq!(buf, big);

        // 删除后空间可以再用
        volume.close(fd_big).unwrap();
        volume.delete("big").unwrap();
        assert_eq!(volume.fat.free_count(), 5);
        assert_eq!(volume.write(fd_small, b"more"), Ok(4));
        assert_eq!(volume.stat(fd_small), Ok(BLOCK_SIZE + 4));
    }

    #[test]
    fn failed_gap_fill_gives_blocks_back() {
        let mut volume = mounted(10);
        assert_eq!(volume.fat.free_count(), 6);

        // 空文件：首块也一并退还
        volume.create("a").unwrap();
        let fd_a = volume.open("a").unwrap();
        volume.seek(fd_a, 100 * BLOCK_SIZE).unwrap();
        assert_eq!(volume.write(fd_a, b"x"), Ok(0));
        assert_eq!(volume.fat.free_count(), 6);
        assert_eq!(volume.stat(fd_a), Ok(0));
        assert_eq!(volume.ls().unwrap()[0].first_block, BlockId::EOC);

        // 已有数据的文件：保留原链表
        volume.seek(fd_a, 0).unwrap();
        assert_eq!(volume.write(fd_a, b"keep"), Ok(4));
        volume.seek(fd_a, 100 * BLOCK_SIZE).unwrap();
        assert_eq!(volume.write(fd_a, b"x"), Ok(0));
        assert_eq!(volume.fat.free_count(), 5);
        assert_eq!(chain_len(&volume, "a"), 1);
        assert_eq!(volume.stat(fd_a), Ok(4));

        volume.seek(fd_a, 0).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(volume.read(fd_a, &mut buf), Ok(4));
        assert_eq!(&buf, b"keep");

        volume.create("b").unwrap();
        let fd_b = volume.open("b").unwrap();
        assert_eq!(volume.write(fd_b, b"hello"), Ok(5));
    }

    #[test]
    fn io_on_bad_descriptor() {
        let mut volume = mounted(40);
        let mut buf = [0u8; 4];
        assert_eq!(volume.read(0, &mut buf), Err(Error::NotFound));
        assert_eq!(volume.write(OPEN_MAX_COUNT, b"x"), Err(Error::InvalidArgument));
    }
}
