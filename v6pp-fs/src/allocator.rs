//! # 超级块分配器
//!
//! ## 空闲块
//!
//! 空闲块组织成嵌在块内容里的单向链表：超级块缓存最多 100 个空闲块编号，
//! 其中 `blocks[0]` 是链头，该块开头保存着下一组缓存（计数 + 100 个编号）。
//! 链头为 0 号块时表示链表到头。
//!
//! ## 空闲索引节点
//!
//! 超级块缓存最多 100 个空闲索引节点编号，取空时线性扫描索引节点表补充。

use log::trace;

use crate::{
    unix_time, BlockId, ByteStore, Disk, Error, FreeBlockCache, InodeTable, Resource, Result,
    BLOCK_SIZE, TOTAL_BLOCKS,
};

impl<S: ByteStore> Disk<S> {
    /// 分配一个空闲块
    pub fn alloc_block(&mut self) -> Result<BlockId> {
        let cache = &mut self.super_block.free_blocks;
        cache.check()?;
        if cache.is_empty() {
            return Err(Error::ResourceExhausted(Resource::Block));
        }

        // 先校验再出栈，出错时缓存保持原样
        let top = cache.len() - 1;
        let id = cache.blocks[top];
        if top == 0 && id.is_null() {
            trace!("free block chain exhausted");
            cache.count = 0;
            return Err(Error::ResourceExhausted(Resource::Block));
        }
        if !id.in_data_zone() {
            return Err(Error::corrupt(format!("free list holds block {id}")));
        }

        if top == 0 {
            // 取到的是链头：先把下一组编号装入缓存，链头自身再分配出去
            let block = self.store.read_block(id)?;
            let next = FreeBlockCache::decode(&block[..FreeBlockCache::SIZE])?;
            next.check()?;
            trace!("free block chain advanced past {id}, {} entries", next.len());
            self.super_block.free_blocks = next;
        } else {
            cache.count -= 1;
        }
        self.super_block.fmod = 1;
        Ok(id)
    }

    /// 释放一个块
    pub fn free_block(&mut self, id: BlockId) -> Result<()> {
        if !id.in_bounds() {
            return Err(Error::invalid(format!(
                "block {id} beyond disk of {TOTAL_BLOCKS} blocks"
            )));
        }
        if id.is_null() {
            return Err(Error::invalid("block 0 is the end-of-chain marker"));
        }
        if !id.in_data_zone() {
            return Err(Error::invalid(format!("block {id} lies outside the data zone")));
        }

        let cache = &mut self.super_block.free_blocks;
        cache.check()?;
        if cache.is_empty() {
            *cache = FreeBlockCache::chained(BlockId::NULL);
        }

        if cache.is_full() {
            // 缓存写入被释放的块，该块成为新的链头
            let mut block = [0; BLOCK_SIZE];
            cache.encode_into(&mut block)?;
            self.store.write_block(id, &block)?;
            self.super_block.free_blocks = FreeBlockCache::chained(id);
            trace!("block {id} became the free list head");
        } else {
            let len = cache.len();
            cache.blocks[len] = id;
            cache.count += 1;
        }
        self.super_block.fmod = 1;

        Ok(())
    }

    /// 沿空闲链表统计空闲块总数
    pub fn count_free_blocks(&mut self) -> Result<usize> {
        let mut cache = self.super_block.free_blocks.clone();
        let mut total = 0;
        let mut hops = 0;
        loop {
            cache.check()?;
            if cache.is_empty() {
                break;
            }
            total += cache.len() - 1;
            let head = cache.blocks[0];
            if head.is_null() {
                break;
            }
            total += 1;

            hops += 1;
            if hops > TOTAL_BLOCKS || !head.in_bounds() {
                return Err(Error::corrupt(format!(
                    "free list is cyclic or broken at block {head}"
                )));
            }
            let block = self.store.read_block(head)?;
            cache = FreeBlockCache::decode(&block[..FreeBlockCache::SIZE])?;
        }

        Ok(total)
    }

    /// 分配一个索引节点，返回它的编号
    pub fn alloc_inode(&mut self) -> Result<u32> {
        loop {
            if self.super_block.free_inodes.is_empty() {
                self.refill_inode_cache();
            }
            let Some(id) = self.super_block.free_inodes.pop() else {
                return Err(Error::ResourceExhausted(Resource::Inode));
            };

            // 跳过保留编号与已分配的陈旧缓存项
            let stale = id <= InodeTable::ROOT
                || self.inodes.get(id).map_or(true, |inode| inode.is_allocated());
            if stale {
                trace!("skipping stale cached inode {id}");
                continue;
            }

            self.inodes.get_mut(id)?.allocate(unix_time());
            if self.super_block.free_inodes.is_empty() {
                self.refill_inode_cache();
            }
            self.super_block.fmod = 1;
            return Ok(id);
        }
    }

    /// 释放索引节点，`release_blocks` 时先释放它的全部数据块
    ///
    /// 缓存已满时该编号不入缓存，留待下一次扫描补充。
    pub fn free_inode(&mut self, id: u32, release_blocks: bool) -> Result<()> {
        if id <= InodeTable::ROOT || id as usize >= InodeTable::COUNT {
            return Err(Error::invalid(format!("inode {id} cannot be freed")));
        }
        if release_blocks {
            self.free_inode_blocks(id)?;
        }

        self.inodes.get_mut(id)?.clear();
        if !self.super_block.free_inodes.push(id) {
            trace!("free inode cache full, dropping {id}");
        }
        self.super_block.fmod = 1;

        Ok(())
    }

    /// 从 2 号起扫描索引节点表，补满空闲索引节点缓存
    fn refill_inode_cache(&mut self) {
        let cache = &mut self.super_block.free_inodes;
        for (id, inode) in self.inodes.iter().skip(InodeTable::ROOT as usize + 1) {
            if cache.is_full() {
                break;
            }
            if !inode.is_allocated() {
                cache.push(id);
            }
        }
        trace!("refilled free inode cache with {} entries", cache.len());
    }
}
