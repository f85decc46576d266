//! 常驻内存的索引节点表
//!
//! 整个索引节点区在加载时一次读入，落盘时一次写回。

use log::trace;

use crate::{DiskInode, Error, Result, BLOCK_SIZE, INODE_ZONE_BLOCKS};

#[derive(Debug, Clone)]
pub struct InodeTable {
    inodes: Vec<DiskInode>,
}

impl InodeTable {
    /// 索引节点区能容纳的索引节点个数
    pub const COUNT: usize = INODE_ZONE_BLOCKS * BLOCK_SIZE / DiskInode::SIZE;
    /// 根目录的索引节点编号，永不释放
    pub const ROOT: u32 = 1;
    /// 索引区字节数
    pub const ZONE_BYTES: usize = INODE_ZONE_BLOCKS * BLOCK_SIZE;

    /// 全部未分配的新表
    pub fn new() -> Self {
        Self {
            inodes: vec![DiskInode::default(); Self::COUNT],
        }
    }

    pub fn decode(zone: &[u8]) -> Result<Self> {
        if zone.len() != Self::ZONE_BYTES {
            return Err(Error::invalid(format!(
                "inode zone is {} bytes, expected {}",
                zone.len(),
                Self::ZONE_BYTES
            )));
        }
        let inodes = zone
            .chunks_exact(DiskInode::SIZE)
            .map(DiskInode::decode)
            .collect::<Result<Vec<_>>>()?;
        trace!("decoded {} inodes", inodes.len());

        Ok(Self { inodes })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut zone = vec![0; Self::ZONE_BYTES];
        for (inode, out) in self.inodes.iter().zip(zone.chunks_exact_mut(DiskInode::SIZE)) {
            inode.encode_into(out)?;
        }
        Ok(zone)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    pub fn get(&self, id: u32) -> Result<&DiskInode> {
        self.inodes
            .get(id as usize)
            .ok_or_else(|| Error::invalid(format!("inode {id} out of range")))
    }

    pub fn get_mut(&mut self, id: u32) -> Result<&mut DiskInode> {
        self.inodes
            .get_mut(id as usize)
            .ok_or_else(|| Error::invalid(format!("inode {id} out of range")))
    }

    /// 按编号遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, &DiskInode)> {
        self.inodes.iter().enumerate().map(|(id, inode)| (id as u32, inode))
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
