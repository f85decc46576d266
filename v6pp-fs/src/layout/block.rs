//! 块编号与间接索引块

use core::ops::{Index, IndexMut};

use binrw::{BinRead, BinWrite};
use derive_more::{Display, From, Into};

use crate::{DataBlock, Result, BLOCK_SIZE, DATA_ZONE_START, SWAP_ZONE_START, TOTAL_BLOCKS};

/// 磁盘块编号，0 号（引导块）同时作为空指针
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display,
    BinRead, BinWrite,
)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    pub const NULL: Self = Self(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// 是否落在磁盘范围内
    #[inline]
    pub fn in_bounds(self) -> bool {
        self.index() < TOTAL_BLOCKS
    }

    /// 是否属于数据区，只有数据区的块才进出空闲链表
    #[inline]
    pub fn in_data_zone(self) -> bool {
        (DATA_ZONE_START..SWAP_ZONE_START).contains(&self.index())
    }
}

impl From<usize> for BlockId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

/// 一个索引块能容纳的编号数量
const INDEX_ENTRIES: usize = BLOCK_SIZE / 4;

/// 间接索引块：整个块连续存储 128 个块编号
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct IndexBlock {
    entries: [BlockId; INDEX_ENTRIES],
}

impl IndexBlock {
    pub const ENTRIES: usize = INDEX_ENTRIES;

    /// 全空的索引块
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: [BlockId::NULL; Self::ENTRIES],
        }
    }

    #[inline]
    pub fn from_block(block: &DataBlock) -> Result<Self> {
        Self::decode(block)
    }

    pub fn to_block(&self) -> Result<DataBlock> {
        let mut block = [0; BLOCK_SIZE];
        self.encode_into(&mut block)?;
        Ok(block)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for IndexBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for IndexBlock {
    type Output = BlockId;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl IndexMut<usize> for IndexBlock {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entries[index]
    }
}
