use alloc::borrow::Cow;
use alloc::string::String;

use binrw::binrw;

use crate::{BlockId, Error, Result, FILENAME_LEN};

/// 根目录中的一项，共32字节。
///
/// 文件名首字节为`\0`即为空闲项。
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// `\0`结尾的文件名
    name: [u8; FILENAME_LEN],

    /// 文件的字节数
    file_size: u32,

    /// 首个数据块的编号，尚未分配时为[`BlockId::EOC`]
    first_block: u16,

    _reserved: [u8; 10],
}

impl DirEntry {
    pub const SIZE: usize = 32;

    /// 一个不占数据块的空文件
    pub fn new(name: &str) -> Result<Self> {
        let bytes = validate_name(name)?;

        let mut dir_entry = Self::default();
        dir_entry.name[..bytes.len()].copy_from_slice(bytes);
        dir_entry.set_first_block(BlockId::EOC);

        Ok(dir_entry)
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_LEN);
        &self.name[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn is_named(&self, name: &str) -> bool {
        !self.is_free() && self.name_bytes() == name.as_bytes()
    }

    pub const fn size(&self) -> usize {
        self.file_size as usize
    }

    pub fn resize(&mut self, size: usize) {
        self.file_size = size as u32;
    }

    pub const fn first_block(&self) -> BlockId {
        BlockId::new(self.first_block)
    }

    pub fn set_first_block(&mut self, id: BlockId) {
        self.first_block = id.get();
    }

    /// 是否已占有数据块
    pub fn has_blocks(&self) -> bool {
        self.first_block() != BlockId::EOC
    }
}

/// 文件名须非空、不含`\0`，且连同结尾的`\0`能放进[`FILENAME_LEN`]字节。
pub fn validate_name(name: &str) -> Result<&[u8]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= FILENAME_LEN || bytes.contains(&0) {
        return Err(Error::InvalidArgument);
    }
    Ok(bytes)
}
