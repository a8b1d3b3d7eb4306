//! 打开会话表
//!
//! 描述符即会话在表中的下标。同一文件可被多次打开，各会话的游标互不影响。

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::layout::validate_name;
use crate::{Error, Result, OPEN_MAX_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 所引用的文件名
    name: String,
    /// 字节游标
    cursor: usize,
}

impl Session {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    pub fn advance(&mut self, n: usize) {
        self.cursor += n;
    }
}

#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            slots: alloc::vec![None; OPEN_MAX_COUNT],
        }
    }

    /// 占用首个空闲槽位，游标置0
    pub fn open(&mut self, name: &str) -> Result<usize> {
        validate_name(name)?;
        let fd = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CapacityExhausted)?;
        self.slots[fd] = Some(Session {
            name: name.to_string(),
            cursor: 0,
        });
        Ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> Result<Session> {
        self.get(fd)?;
        self.slots[fd].take().ok_or(Error::NotFound)
    }

    /// 描述符的有效范围是`0..OPEN_MAX_COUNT`
    pub fn get(&self, fd: usize) -> Result<&Session> {
        self.slots
            .get(fd)
            .ok_or(Error::InvalidArgument)?
            .as_ref()
            .ok_or(Error::NotFound)
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut Session> {
        self.slots
            .get_mut(fd)
            .ok_or(Error::InvalidArgument)?
            .as_mut()
            .ok_or(Error::NotFound)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// 打开中的会话数
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_reuses_freed_slot() {
        let mut table = SessionTable::new();
        assert_eq!(table.open("a"), Ok(0));
        assert_eq!(table.open("a"), Ok(1));
        assert_eq!(table.open("b"), Ok(2));
        assert_eq!(table.len(), 3);

        assert_eq!(table.close(1).map(|s| s.name), Ok("a".into()));
        assert_eq!(table.open("c"), Ok(1));
        assert_eq!(table.get(1).unwrap().name(), "c");
    }

    #[test]
    fn descriptor_range_is_half_open() {
        let mut table = SessionTable::new();
        assert_eq!(table.get(0), Err(Error::NotFound));
        assert_eq!(table.get(OPEN_MAX_COUNT - 1), Err(Error::NotFound));
        assert_eq!(table.get(OPEN_MAX_COUNT), Err(Error::InvalidArgument));
        assert_eq!(table.close(OPEN_MAX_COUNT), Err(Error::InvalidArgument));
        assert_eq!(table.close(3), Err(Error::NotFound));
    }

    #[test]
    fn table_fills_up() {
        let mut table = SessionTable::new();
        for fd in 0..OPEN_MAX_COUNT {
            assert_eq!(table.open("f"), Ok(fd));
        }
        assert!(table.is_full());
        assert_eq!(table.open("f"), Err(Error::CapacityExhausted));
    }

    #[test]
    fn cursors_are_independent() {
        let mut table = SessionTable::new();
        let a = table.open("f").unwrap();
        let b = table.open("f").unwrap();
        table.get_mut(a).unwrap().advance(10);
        table.get_mut(b).unwrap().seek(3);

        assert_eq!(table.get(a).unwrap().cursor(), 10);
        assert_eq!(table.get(b).unwrap().cursor(), 3);
    }
}
