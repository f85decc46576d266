//! # 三级块遍历引擎
//!
//! 按直接、一级间接、二级间接的顺序走遍索引节点覆盖的字节范围。
//! 读文件、写文件（带重新分配）与释放数据块都是同一次遍历，
//! 区别仅在于传入的 [`BlockVisitor`]。
//!
//! 每访问一个数据块，剩余字节数减少一整块，最后一块是否写满由调用者裁剪。
//! 遍历中途出错时，已改写的指针不会回滚，索引节点可能处于撕裂状态。
//! 被换成新块的索引块一律从全空开始，不读取新块上残留的旧内容。

use log::trace;

use crate::{BlockId, ByteStore, Disk, DiskInode, Error, IndexBlock, Result, BLOCK_SIZE};

/// 遍历过程中各个时机的回调，默认全部为空操作
#[allow(unused_variables)]
pub trait BlockVisitor<S: ByteStore> {
    /// 访问某个指针前调用，返回值写回该指针；默认原样返回
    fn allocate(&mut self, disk: &mut Disk<S>, old: BlockId) -> Result<BlockId> {
        Ok(old)
    }

    fn leaf_setup(&mut self, disk: &mut Disk<S>, offset: usize, block: BlockId) -> Result<()> {
        Ok(())
    }

    fn leaf_process(&mut self, disk: &mut Disk<S>, offset: usize, block: BlockId) -> Result<()> {
        Ok(())
    }

    fn leaf_teardown(&mut self, disk: &mut Disk<S>, offset: usize, block: BlockId) -> Result<()> {
        Ok(())
    }

    /// 索引块读入内存后调用
    fn index_setup(&mut self, disk: &mut Disk<S>, index: &IndexBlock, block: BlockId) -> Result<()> {
        Ok(())
    }

    /// 索引块即将丢弃前调用，默认不写回
    fn index_teardown(
        &mut self,
        disk: &mut Disk<S>,
        index: &IndexBlock,
        block: BlockId,
    ) -> Result<()> {
        Ok(())
    }

    /// 遍历出错时调用；返回 `Ok` 则遍历以 `false` 结束，默认继续上抛
    fn on_failure(&mut self, inode: &DiskInode, remaining: usize, error: Error) -> Result<()> {
        Err(error)
    }
}

/// 遍历进度
struct Progress {
    /// 下一个数据块在文件中的偏移
    offset: usize,
    /// 尚未覆盖的字节数
    remaining: usize,
}

impl Progress {
    #[inline]
    fn done(&self) -> bool {
        self.remaining == 0
    }

    #[inline]
    fn advance(&mut self) {
        self.offset += BLOCK_SIZE;
        self.remaining = self.remaining.saturating_sub(BLOCK_SIZE);
    }
}

impl<S: ByteStore> Disk<S> {
    /// 以 `visitor` 遍历索引节点 `id` 的全部数据块
    ///
    /// 成功返回 `true`；出错且 `on_failure` 吞下了错误时返回 `false`。
    /// 无论成败，遍历中改写过的块指针都会写回索引节点。
    pub fn traverse_blocks<V: BlockVisitor<S>>(&mut self, id: u32, visitor: &mut V) -> Result<bool> {
        let mut working = self.inode(id)?.clone();
        let mut cursor = Progress {
            offset: 0,
            remaining: working.size as usize,
        };
        let result = self.walk_tiers(&mut working, &mut cursor, visitor);

        let inode = self.inode_mut(id)?;
        inode.direct = working.direct;
        inode.indirect = working.indirect;
        inode.double_indirect = working.double_indirect;

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                trace!("traversal of inode {id} failed with {} bytes left", cursor.remaining);
                visitor.on_failure(&working, cursor.remaining, e)?;
                Ok(false)
            }
        }
    }

    fn walk_tiers<V: BlockVisitor<S>>(
        &mut self,
        inode: &mut DiskInode,
        cursor: &mut Progress,
        visitor: &mut V,
    ) -> Result<()> {
        /******************** 直接索引 ********************/
        for slot in inode.direct.iter_mut() {
            if cursor.done() {
                return Ok(());
            }
            *slot = self.reassign(visitor, *slot)?;
            self.visit_leaf(visitor, cursor, *slot)?;
        }

        /******************** 一级间接索引 ********************/
        for slot in inode.indirect.iter_mut() {
            if cursor.done() {
                return Ok(());
            }
            trace!("entering single indirect block at offset {}", cursor.offset);
            let old = *slot;
            *slot = self.reassign(visitor, old)?;
            self.walk_index(visitor, cursor, *slot, *slot != old, 1)?;
        }

        /******************** 二级间接索引 ********************/
        for slot in inode.double_indirect.iter_mut() {
            if cursor.done() {
                return Ok(());
            }
            trace!("entering double indirect block at offset {}", cursor.offset);
            let old = *slot;
            *slot = self.reassign(visitor, old)?;
            self.walk_index(visitor, cursor, *slot, *slot != old, 2)?;
        }

        Ok(())
    }

    /// 遍历一个索引块，`depth` 为 1 时其中的编号直接指向数据块
    ///
    /// `fresh` 表示该指针刚被换成新块。
    fn walk_index<V: BlockVisitor<S>>(
        &mut self,
        visitor: &mut V,
        cursor: &mut Progress,
        block: BlockId,
        fresh: bool,
        depth: usize,
    ) -> Result<()> {
        // 空指针与新块都按全空的索引块处理，不读磁盘
        let mut index = if block.is_null() || fresh {
            IndexBlock::new()
        } else {
            IndexBlock::from_block(&self.store.read_block(block)?)?
        };
        visitor.index_setup(self, &index, block)?;

        for i in 0..IndexBlock::ENTRIES {
            if cursor.done() {
                break;
            }
            let old = index[i];
            index[i] = self.reassign(visitor, old)?;
            if depth == 1 {
                self.visit_leaf(visitor, cursor, index[i])?;
            } else {
                self.walk_index(visitor, cursor, index[i], index[i] != old, depth - 1)?;
            }
        }

        visitor.index_teardown(self, &index, block)
    }

    fn visit_leaf<V: BlockVisitor<S>>(
        &mut self,
        visitor: &mut V,
        cursor: &mut Progress,
        block: BlockId,
    ) -> Result<()> {
        visitor.leaf_setup(self, cursor.offset, block)?;
        visitor.leaf_process(self, cursor.offset, block)?;
        visitor.leaf_teardown(self, cursor.offset, block)?;
        cursor.advance();
        Ok(())
    }

    /// 询问访问者该指针应指向哪个块
    fn reassign<V: BlockVisitor<S>>(&mut self, visitor: &mut V, old: BlockId) -> Result<BlockId> {
        let new = visitor.allocate(self, old)?;
        if !new.in_bounds() {
            return Err(Error::invalid(format!("block {new} handed out for traversal")));
        }
        Ok(new)
    }
}
