//! 磁盘几何参数
//!
//! 20 柱面 × 16 磁头 × 63 扇区，每扇区即一个 512 字节的块。

use binrw::{BinRead, BinWrite};

use crate::BLOCK_SIZE;

pub const CYLINDERS: usize = 20;
pub const HEADS: usize = 16;
pub const SECTORS_PER_TRACK: usize = 63;

/// 磁盘总块数
pub const TOTAL_BLOCKS: usize = CYLINDERS * HEADS * SECTORS_PER_TRACK;
/// 磁盘镜像的字节数
pub const DISK_SIZE: u64 = (TOTAL_BLOCKS * BLOCK_SIZE) as u64;

pub const BOOT_ZONE_START: usize = 0;
pub const BOOT_ZONE_BLOCKS: usize = 1;

pub const KERNEL_ZONE_START: usize = BOOT_ZONE_START + BOOT_ZONE_BLOCKS;
pub const KERNEL_ZONE_BLOCKS: usize = 199;

pub const SUPER_BLOCK_START: usize = KERNEL_ZONE_START + KERNEL_ZONE_BLOCKS;
pub const SUPER_BLOCK_BLOCKS: usize = 2;

pub const INODE_ZONE_START: usize = SUPER_BLOCK_START + SUPER_BLOCK_BLOCKS;
pub const INODE_ZONE_BLOCKS: usize = 822;

/// 交换区占据磁盘末尾
pub const SWAP_ZONE_BLOCKS: usize = 2160;
pub const SWAP_ZONE_START: usize = TOTAL_BLOCKS - SWAP_ZONE_BLOCKS;

/// 数据区夹在索引节点区与交换区之间
pub const DATA_ZONE_START: usize = INODE_ZONE_START + INODE_ZONE_BLOCKS;
pub const DATA_ZONE_BLOCKS: usize = SWAP_ZONE_START - DATA_ZONE_START;

/// 持久化在超级块中的区域划分副本
///
/// 加载时必须与 [`Geometry::STANDARD`] 完全一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct Geometry {
    pub size_blocks: u32,
    pub inode_zone_start: u32,
    pub inode_zone_blocks: u32,
    pub data_zone_start: u32,
    pub data_zone_blocks: u32,
    pub swap_zone_start: u32,
    pub swap_zone_blocks: u32,
}

impl Geometry {
    pub const STANDARD: Self = Self {
        size_blocks: TOTAL_BLOCKS as u32,
        inode_zone_start: INODE_ZONE_START as u32,
        inode_zone_blocks: INODE_ZONE_BLOCKS as u32,
        data_zone_start: DATA_ZONE_START as u32,
        data_zone_blocks: DATA_ZONE_BLOCKS as u32,
        swap_zone_start: SWAP_ZONE_START as u32,
        swap_zone_blocks: SWAP_ZONE_BLOCKS as u32,
    };
}

impl Default for Geometry {
    fn default() -> Self {
        Self::STANDARD
    }
}
