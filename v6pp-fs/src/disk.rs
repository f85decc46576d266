//! # 会话层
//!
//! 一个 [`Disk`] 独占一个磁盘镜像，超级块与索引节点表在会话期间常驻内存，
//! 直到 [`Disk::update`] 时才写回。

use log::{debug, warn};

use crate::{
    unix_time, BlockId, BlockStore, ByteStore, DiskInode, FileType, InodeTable, Result,
    SuperBlock, BLOCK_SIZE, BOOT_ZONE_BLOCKS, BOOT_ZONE_START, DATA_ZONE_START, INODE_ZONE_BLOCKS,
    INODE_ZONE_START, KERNEL_ZONE_BLOCKS, KERNEL_ZONE_START, SUPER_BLOCK_BLOCKS,
    SUPER_BLOCK_START, SWAP_ZONE_START,
};

/// 打开的磁盘镜像
///
/// 未显式 [`close`](Disk::close) 就被丢弃时会尽力落盘一次。
#[derive(Debug)]
pub struct Disk<S: ByteStore> {
    pub(crate) store: BlockStore<S>,
    pub(crate) super_block: SuperBlock,
    pub(crate) inodes: InodeTable,
    /// 只有成功加载或格式化后，内存中的状态才值得写回
    flush_on_drop: bool,
}

impl<S: ByteStore> Disk<S> {
    fn detached(store: BlockStore<S>) -> Self {
        Self {
            store,
            super_block: SuperBlock::new(),
            inodes: InodeTable::new(),
            flush_on_drop: false,
        }
    }

    /// 打开已格式化的镜像
    pub fn open(store: S) -> Result<Self> {
        let mut disk = Self::detached(BlockStore::new(store)?);
        disk.load()?;
        Ok(disk)
    }

    /// 格式化镜像并立即落盘
    pub fn create(store: S) -> Result<Self> {
        let mut disk = Self::detached(BlockStore::new(store)?);
        disk.format()?;
        disk.update()?;
        Ok(disk)
    }

    /// 从镜像读入超级块与整个索引节点区
    pub fn load(&mut self) -> Result<()> {
        let mut raw = vec![0; SUPER_BLOCK_BLOCKS * BLOCK_SIZE];
        self.store
            .read_blocks(&mut raw, SUPER_BLOCK_START, SUPER_BLOCK_BLOCKS)?;
        let super_block = SuperBlock::decode(&raw)?;
        super_block.validate()?;

        let mut zone = vec![0; InodeTable::ZONE_BYTES];
        self.store
            .read_blocks(&mut zone, INODE_ZONE_START, INODE_ZONE_BLOCKS)?;
        let inodes = InodeTable::decode(&zone)?;

        self.super_block = super_block;
        self.inodes = inodes;
        self.flush_on_drop = true;
        debug!(
            "loaded: {} cached free blocks, {} cached free inodes",
            self.super_block.free_blocks.len(),
            self.super_block.free_inodes.len()
        );

        Ok(())
    }

    /// 重建超级块与索引节点表，把整个数据区放入空闲链表
    ///
    /// 引导区与内核区保持不动；结果只在内存中，需要 [`update`](Disk::update) 落盘。
    pub fn format(&mut self) -> Result<()> {
        debug!("formatting");
        self.super_block = SuperBlock::new();
        self.inodes = InodeTable::new();

        for id in InodeTable::ROOT + 1..InodeTable::COUNT as u32 {
            self.free_inode(id, false)?;
        }
        for block in DATA_ZONE_START..SWAP_ZONE_START {
            self.free_block(BlockId::from(block))?;
        }

        let root = self.inodes.get_mut(InodeTable::ROOT)?;
        root.allocate(unix_time());
        root.set_file_type(FileType::Directory);
        self.flush_on_drop = true;
        debug!(
            "formatted: free block cache holds {} entries",
            self.super_block.free_blocks.len()
        );

        Ok(())
    }

    /// 把超级块与整个索引节点区写回镜像
    pub fn update(&mut self) -> Result<()> {
        self.super_block.time = unix_time();
        self.super_block.fmod = 0;
        let raw = self.super_block.to_bytes()?;
        self.store
            .write_blocks(&raw, SUPER_BLOCK_START, SUPER_BLOCK_BLOCKS)?;

        let zone = self.inodes.encode()?;
        self.store
            .write_blocks(&zone, INODE_ZONE_START, INODE_ZONE_BLOCKS)?;
        self.store.flush()?;
        debug!("flushed superblock and inode zone");

        Ok(())
    }

    /// 落盘并结束会话
    pub fn close(mut self) -> Result<()> {
        self.flush_on_drop = false;
        self.update()?;
        debug!("closed");
        Ok(())
    }

    /// 写入引导块，超长截断，不足补零
    pub fn write_bootloader(&mut self, image: &[u8]) -> Result<()> {
        self.write_zone(image, BOOT_ZONE_START, BOOT_ZONE_BLOCKS)
    }

    /// 写入内核区，超长截断，不足补零
    pub fn write_kernel(&mut self, image: &[u8]) -> Result<()> {
        self.write_zone(image, KERNEL_ZONE_START, KERNEL_ZONE_BLOCKS)
    }

    fn write_zone(&mut self, image: &[u8], first: usize, count: usize) -> Result<()> {
        let mut zone = vec![0; count * BLOCK_SIZE];
        let len = image.len().min(zone.len());
        if len < image.len() {
            debug!(
                "truncating {} byte image to {} blocks at {first}",
                image.len(),
                count
            );
        }
        zone[..len].copy_from_slice(&image[..len]);
        self.store.write_blocks(&zone, first, count)
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    #[inline]
    pub fn inode(&self, id: u32) -> Result<&DiskInode> {
        self.inodes.get(id)
    }

    #[inline]
    pub fn inode_mut(&mut self, id: u32) -> Result<&mut DiskInode> {
        self.inodes.get_mut(id)
    }

    #[inline]
    pub fn store(&mut self) -> &mut BlockStore<S> {
        &mut self.store
    }
}

impl<S: ByteStore> Drop for Disk<S> {
    fn drop(&mut self) {
        if self.flush_on_drop {
            if let Err(e) = self.update() {
                warn!("failed to flush on drop: {e}");
            }
        }
    }
}
