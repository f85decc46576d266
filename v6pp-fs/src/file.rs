//! 文件读写与数据块释放，均由块遍历引擎派生

use log::debug;

use crate::{
    unix_time, BlockId, BlockVisitor, ByteStore, Disk, DiskInode, Error, IndexBlock, InodeFlag,
    Result, BLOCK_SIZE,
};

/// 把数据块依次拷入缓冲区，空指针读作全零
struct Reader<'a> {
    buf: &'a mut [u8],
}

impl<S: ByteStore> BlockVisitor<S> for Reader<'_> {
    fn leaf_process(&mut self, disk: &mut Disk<S>, offset: usize, block: BlockId) -> Result<()> {
        let dest = &mut self.buf[offset..offset + BLOCK_SIZE];
        if block.is_null() {
            dest.fill(0);
            Ok(())
        } else {
            disk.store.read_block_into(block, dest)
        }
    }
}

/// 为每个指针分配新块，写入数据并持久化索引块
///
/// 新索引块一拿到就先写成全空，中途失败时撕裂的索引节点只会指向空项。
struct Writer<'a> {
    data: &'a [u8],
}

impl<S: ByteStore> BlockVisitor<S> for Writer<'_> {
    fn allocate(&mut self, disk: &mut Disk<S>, _old: BlockId) -> Result<BlockId> {
        disk.alloc_block()
    }

    fn index_setup(&mut self, disk: &mut Disk<S>, index: &IndexBlock, block: BlockId) -> Result<()> {
        disk.store.write_block(block, &index.to_block()?)
    }

    fn leaf_process(&mut self, disk: &mut Disk<S>, offset: usize, block: BlockId) -> Result<()> {
        let mut buf = [0; BLOCK_SIZE];
        let end = self.data.len().min(offset + BLOCK_SIZE);
        buf[..end - offset].copy_from_slice(&self.data[offset..end]);
        disk.store.write_block(block, &buf)
    }

    fn index_teardown(
        &mut self,
        disk: &mut Disk<S>,
        index: &IndexBlock,
        block: BlockId,
    ) -> Result<()> {
        disk.store.write_block(block, &index.to_block()?)
    }
}

/// 释放所有非空的数据块与索引块
struct Releaser;

impl<S: ByteStore> BlockVisitor<S> for Releaser {
    fn leaf_teardown(&mut self, disk: &mut Disk<S>, _offset: usize, block: BlockId) -> Result<()> {
        if block.is_null() {
            return Ok(());
        }
        disk.free_block(block)
    }

    fn index_teardown(
        &mut self,
        disk: &mut Disk<S>,
        _index: &IndexBlock,
        block: BlockId,
    ) -> Result<()> {
        if block.is_null() {
            return Ok(());
        }
        disk.free_block(block)
    }
}

impl<S: ByteStore> Disk<S> {
    /// 读出文件的全部内容
    pub fn read_file(&mut self, id: u32) -> Result<Vec<u8>> {
        let size = self.inode(id)?.size as usize;
        let mut buf = vec![0; size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE];
        self.traverse_blocks(id, &mut Reader { buf: &mut buf })?;
        buf.truncate(size);
        Ok(buf)
    }

    /// 以 `data` 覆盖文件的全部内容
    ///
    /// 先释放旧数据块再重新分配；中途失败时索引节点可能只写了一部分。
    pub fn write_file(&mut self, id: u32, data: &[u8]) -> Result<()> {
        if data.len() > DiskInode::MAX_FILE_SIZE {
            return Err(Error::invalid(format!(
                "{} bytes exceed the maximum file size of {}",
                data.len(),
                DiskInode::MAX_FILE_SIZE
            )));
        }
        self.free_inode_blocks(id)?;

        let inode = self.inode_mut(id)?;
        inode.size = data.len() as u32;
        inode.set_flag(InodeFlag::Large, data.len() > DiskInode::DIRECT_BYTES);
        inode.set_permissions(DiskInode::FULL_ACCESS);
        inode.mtime = unix_time();

        self.traverse_blocks(id, &mut Writer { data })?;
        debug!("wrote {} bytes to inode {id}", data.len());
        Ok(())
    }

    /// 释放文件占用的全部块，并清零大小与块指针
    pub fn free_inode_blocks(&mut self, id: u32) -> Result<()> {
        self.traverse_blocks(id, &mut Releaser)?;

        let inode = self.inode_mut(id)?;
        inode.size = 0;
        inode.clear_pointers();
        inode.set_flag(InodeFlag::Large, false);
        Ok(())
    }
}
