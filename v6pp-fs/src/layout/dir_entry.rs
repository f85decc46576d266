use std::borrow::Cow;

use binrw::{BinRead, BinWrite};

use crate::{Error, Result};

const NAME_FIELD_LEN: usize = 28;

/// 目录项：子项的索引节点编号 + 定长名字
#[derive(Debug, Default, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct DirEntry {
    inode: u32,
    // 最后一字节留给 \0
    name: [u8; NAME_FIELD_LEN],
}

impl DirEntry {
    /// 名字的最大字节数
    pub const NAME_MAX: usize = NAME_FIELD_LEN - 1;

    pub fn new(name: &str, inode: u32) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > Self::NAME_MAX {
            return Err(Error::NameTooLong(name.to_owned()));
        }
        if bytes.is_empty() || bytes.contains(&0) || bytes.contains(&b'/') {
            return Err(Error::invalid(format!("bad entry name {name:?}")));
        }

        let mut field = [0; NAME_FIELD_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { inode, name: field })
    }

    #[inline]
    pub fn inode(&self) -> u32 {
        self.inode
    }

    /// 去掉填充 \0 后的名字字节
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_FIELD_LEN);
        &self.name[..len]
    }

    #[inline]
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }
}
