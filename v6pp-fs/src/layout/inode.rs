//! 索引节点
//!
//! 文件的数据经由三级指针定位：
//! - 直接索引：6 个块编号，每个都指向一个**数据块**；
//! - 一级间接索引：2 个块编号，每个指向一个存满块编号的索引块；
//! - 二级间接索引：2 个块编号，每个指向一个存满一级索引块编号的索引块。
//!
//! 目录的空间用于存放目录项；文件的空间用于存放它的数据。

use binrw::{BinRead, BinWrite};
use enumflags2::{bitflags, BitFlags};

use super::{BlockId, IndexBlock};
use crate::BLOCK_SIZE;

/// 模式字中的标志位
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeFlag {
    Sticky = 0x0200,
    SetGid = 0x0400,
    SetUid = 0x0800,
    /// 使用了间接索引
    Large = 0x1000,
    Allocated = 0x8000,
}

/// 一组 rwx 权限
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Execute = 0b001,
    Write = 0b010,
    Read = 0b100,
}

/// 模式字第 13~14 位的文件类型
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    #[default]
    Regular,
    CharDevice,
    Directory,
    BlockDevice,
}

const DIRECT_COUNT: usize = 6;
const INDIRECT_COUNT: usize = 2;
const DOUBLE_INDIRECT_COUNT: usize = 2;

const TYPE_SHIFT: u32 = 13;
const TYPE_MASK: u32 = 0b11 << TYPE_SHIFT;
const OTHERS_SHIFT: u32 = 0;
const GROUP_SHIFT: u32 = 3;
const OWNER_SHIFT: u32 = 6;

#[derive(Debug, Default, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct DiskInode {
    /// 权限、标志与类型，高 16 位保留
    mode: u32,
    /// 硬链接个数
    pub nlink: u32,
    pub uid: u16,
    pub gid: u16,
    /// 文件字节数
    pub size: u32,
    pub direct: [BlockId; DIRECT_COUNT],
    pub indirect: [BlockId; INDIRECT_COUNT],
    pub double_indirect: [BlockId; DOUBLE_INDIRECT_COUNT],
    /// 最近访问时间
    pub atime: i32,
    /// 最近修改时间
    pub mtime: i32,
}

impl DiskInode {
    /// 直接索引个数
    pub const DIRECT: usize = DIRECT_COUNT;
    /// 一级间接索引个数
    pub const INDIRECT: usize = INDIRECT_COUNT;
    /// 二级间接索引个数
    pub const DOUBLE_INDIRECT: usize = DOUBLE_INDIRECT_COUNT;

    /// 只用直接索引时的容量
    pub const DIRECT_BYTES: usize = Self::DIRECT * BLOCK_SIZE;
    /// 文件的最大字节数
    pub const MAX_FILE_SIZE: usize = BLOCK_SIZE
        * (Self::DIRECT
            + Self::INDIRECT * IndexBlock::ENTRIES
            + Self::DOUBLE_INDIRECT * IndexBlock::ENTRIES * IndexBlock::ENTRIES);

    /// 全开放权限
    pub const FULL_ACCESS: u16 = 0o777;

    /// 置为刚分配的状态：权限全开放，大小为 0，单个链接
    pub fn allocate(&mut self, now: i32) {
        *self = Self {
            mode: InodeFlag::Allocated as u32 | Self::FULL_ACCESS as u32,
            nlink: 1,
            atime: now,
            mtime: now,
            ..Self::default()
        };
    }

    /// 清空为未分配状态
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    #[inline]
    pub fn flags(&self) -> BitFlags<InodeFlag> {
        BitFlags::from_bits_truncate(self.mode)
    }

    pub fn set_flag(&mut self, flag: InodeFlag, on: bool) {
        if on {
            self.mode |= flag as u32;
        } else {
            self.mode &= !(flag as u32);
        }
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.flags().contains(InodeFlag::Allocated)
    }

    #[inline]
    pub fn is_large(&self) -> bool {
        self.flags().contains(InodeFlag::Large)
    }

    pub fn file_type(&self) -> FileType {
        match (self.mode & TYPE_MASK) >> TYPE_SHIFT {
            0 => FileType::Regular,
            1 => FileType::CharDevice,
            2 => FileType::Directory,
            _ => FileType::BlockDevice,
        }
    }

    pub fn set_file_type(&mut self, kind: FileType) {
        let bits = match kind {
            FileType::Regular => 0,
            FileType::CharDevice => 1,
            FileType::Directory => 2,
            FileType::BlockDevice => 3,
        };
        self.mode = (self.mode & !TYPE_MASK) | (bits << TYPE_SHIFT);
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// 低 9 位权限
    #[inline]
    pub fn permissions(&self) -> u16 {
        (self.mode & 0o777) as u16
    }

    pub fn set_permissions(&mut self, permissions: u16) {
        self.mode = (self.mode & !0o777) | (permissions & 0o777) as u32;
    }

    #[inline]
    pub fn owner(&self) -> BitFlags<Access> {
        self.access(OWNER_SHIFT)
    }

    #[inline]
    pub fn group(&self) -> BitFlags<Access> {
        self.access(GROUP_SHIFT)
    }

    #[inline]
    pub fn others(&self) -> BitFlags<Access> {
        self.access(OTHERS_SHIFT)
    }

    fn access(&self, shift: u32) -> BitFlags<Access> {
        BitFlags::from_bits_truncate(((self.mode >> shift) & 0b111) as u8)
    }

    /// 清零全部 10 个块指针
    pub fn clear_pointers(&mut self) {
        self.direct = Default::default();
        self.indirect = Default::default();
        self.double_indirect = Default::default();
    }

    /// 所有块指针，依次为直接、一级、二级
    pub fn pointers(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.direct
            .iter()
            .chain(&self.indirect)
            .chain(&self.double_indirect)
            .copied()
    }
}
