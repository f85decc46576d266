use binrw::{BinRead, BinWrite};

use super::BlockId;
use crate::{Error, Geometry, Result, INODE_ZONE_BLOCKS, TOTAL_BLOCKS};

/// 空闲块缓存与空闲索引节点缓存的容量
const CACHE_LEN: usize = 100;

/// 空闲块缓存：计数 + 100 个块编号
///
/// 与写入空闲链表链块开头的 101 个字完全同构：
/// `blocks[0]` 指向下一组空闲块所在的链块，为 0 时表示链表到头。
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct FreeBlockCache {
    pub count: u32,
    pub blocks: [BlockId; CACHE_LEN],
}

impl FreeBlockCache {
    pub const CAPACITY: usize = CACHE_LEN;

    #[inline]
    pub fn new() -> Self {
        Self {
            count: 0,
            blocks: [BlockId::NULL; CACHE_LEN],
        }
    }

    /// 仅含一个链头的缓存
    #[inline]
    pub fn chained(head: BlockId) -> Self {
        let mut cache = Self::new();
        cache.blocks[0] = head;
        cache.count = 1;
        cache
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= CACHE_LEN
    }

    /// 缓存中实际可用的编号
    #[inline]
    pub fn entries(&self) -> &[BlockId] {
        &self.blocks[..self.len().min(CACHE_LEN)]
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.len() > CACHE_LEN {
            return Err(Error::corrupt(format!(
                "free block cache holds {} entries",
                self.count
            )));
        }
        Ok(())
    }
}

impl Default for FreeBlockCache {
    fn default() -> Self {
        Self::new()
    }
}

/// 空闲索引节点缓存：计数 + 100 个索引节点编号
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct FreeInodeCache {
    pub count: u32,
    pub inodes: [u32; CACHE_LEN],
}

impl FreeInodeCache {
    pub const CAPACITY: usize = CACHE_LEN;

    #[inline]
    pub fn new() -> Self {
        Self {
            count: 0,
            inodes: [0; CACHE_LEN],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= CACHE_LEN
    }

    #[inline]
    pub fn entries(&self) -> &[u32] {
        &self.inodes[..self.len().min(CACHE_LEN)]
    }

    /// 满时返回 `false`
    pub fn push(&mut self, inode: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.inodes[self.len()] = inode;
        self.count += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u32> {
        if self.is_empty() || self.len() > CACHE_LEN {
            return None;
        }
        self.count -= 1;
        Some(self.inodes[self.len()])
    }
}

impl Default for FreeInodeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// 超级块：
/// - 空闲块与空闲索引节点的分配信息；
/// - 区域划分的持久化副本
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct SuperBlock {
    /// 索引节点区占据的块数
    pub inode_blocks: u32,
    /// 磁盘总块数
    pub total_blocks: u32,
    pub free_blocks: FreeBlockCache,
    pub free_inodes: FreeInodeCache,
    /// 空闲块缓存锁
    pub flock: u32,
    /// 空闲索引节点缓存锁
    pub ilock: u32,
    /// 内存副本已修改
    pub fmod: u32,
    /// 只读挂载
    pub ronly: u32,
    /// 最近一次落盘的时间
    pub time: i32,
    pub geometry: Geometry,
    pub geometry_modified: u32,
    _reserved: [u32; 39],
}

impl SuperBlock {
    pub fn new() -> Self {
        Self {
            inode_blocks: INODE_ZONE_BLOCKS as u32,
            total_blocks: TOTAL_BLOCKS as u32,
            free_blocks: FreeBlockCache::new(),
            free_inodes: FreeInodeCache::new(),
            flock: 0,
            ilock: 0,
            fmod: 0,
            ronly: 0,
            time: 0,
            geometry: Geometry::STANDARD,
            geometry_modified: 0,
            _reserved: [0; 39],
        }
    }

    /// 校验加载进来的超级块
    ///
    /// 持久化的区域划分必须与编译期常量一致。
    pub fn validate(&self) -> Result<()> {
        if self.geometry != Geometry::STANDARD {
            return Err(Error::corrupt(format!(
                "persisted geometry {:?} differs from the standard layout",
                self.geometry
            )));
        }
        if self.inode_blocks as usize != INODE_ZONE_BLOCKS
            || self.total_blocks as usize != TOTAL_BLOCKS
        {
            return Err(Error::corrupt(format!(
                "superblock claims {} inode blocks of {} total",
                self.inode_blocks, self.total_blocks
            )));
        }
        self.free_blocks.check()?;
        if self.free_inodes.len() > CACHE_LEN {
            return Err(Error::corrupt(format!(
                "free inode cache holds {} entries",
                self.free_inodes.count
            )));
        }
        Ok(())
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new()
    }
}
