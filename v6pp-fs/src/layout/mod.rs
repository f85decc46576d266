//! # 磁盘数据结构层
//!
//! V6++ 的磁盘布局：
//! 引导块 | 内核区 | 超级块 | 索引节点区 | 数据区 | 交换区
//!
//! 所有记录均按原生字节序紧密排列，除显式保留字段外没有填充。

/// 为定长记录生成 `SIZE` 与编解码方法
macro_rules! record_codec {
    ($($record:ty => $size:expr),* $(,)?) => {$(
        impl $record {
            /// 记录在磁盘上占据的字节数
            pub const SIZE: usize = $size;

            /// 从原生字节序的字节流中解码
            pub fn decode(bytes: &[u8]) -> $crate::Result<Self> {
                let mut reader = ::std::io::Cursor::new(bytes);
                Ok(<Self as ::binrw::BinRead>::read_ne(&mut reader)?)
            }

            /// 编码到 `out` 的开头，`out` 至少要有 `SIZE` 字节
            pub fn encode_into(&self, out: &mut [u8]) -> $crate::Result<()> {
                let mut writer = ::std::io::Cursor::new(out);
                ::binrw::BinWrite::write_options(self, &mut writer, ::binrw::Endian::NATIVE, ())?;
                Ok(())
            }

            pub fn to_bytes(&self) -> $crate::Result<Vec<u8>> {
                let mut bytes = vec![0; Self::SIZE];
                self.encode_into(&mut bytes)?;
                Ok(bytes)
            }
        }
    )*};
}

mod block;
pub use block::{BlockId, IndexBlock};

mod super_block;
pub use super_block::{FreeBlockCache, FreeInodeCache, SuperBlock};

mod inode;
pub use inode::{Access, DiskInode, FileType, InodeFlag};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::DirEntry;

record_codec! {
    SuperBlock => 1024,
    FreeBlockCache => 404,
    DiskInode => 64,
    DirEntry => 32,
    IndexBlock => crate::BLOCK_SIZE,
}
