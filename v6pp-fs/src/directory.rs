//! # 目录编解码
//!
//! 目录的内容是紧密排列、按插入顺序保存的目录项数组，
//! 字节数恒为目录项大小的整数倍。删除时后续目录项整体前移。

use log::debug;

use crate::{ByteStore, DirEntry, Disk, Error, FileType, Result, BLOCK_SIZE};

/// 目录内容在内存中的临时视图，修改后需显式写回
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InodeDirectory {
    entries: Vec<DirEntry>,
    /// 按整块向上取整并预留追加空间后的槽位数
    capacity: usize,
}

impl InodeDirectory {
    /// 已占用的目录项个数
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 可容纳的槽位数
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.max(self.entries.len())
    }

    #[inline]
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter()
    }

    pub fn find(&self, name: &str) -> Option<&DirEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name_bytes() == name.as_bytes())
    }

    /// 追加到末尾
    pub fn push(&mut self, entry: DirEntry) {
        self.entries.push(entry);
    }

    /// 删除同名目录项，后续目录项前移补齐
    pub fn remove(&mut self, name: &str) -> Option<DirEntry> {
        let pos = self
            .entries
            .iter()
            .position(|entry| entry.name_bytes() == name.as_bytes())?;
        Some(self.entries.remove(pos))
    }

    /// 按磁盘格式序列化已占用的目录项
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0; self.entries.len() * DirEntry::SIZE];
        for (entry, out) in self.entries.iter().zip(bytes.chunks_exact_mut(DirEntry::SIZE)) {
            entry.encode_into(out)?;
        }
        Ok(bytes)
    }
}

impl<S: ByteStore> Disk<S> {
    /// 读出目录内容，预留 `stride_extra` 个追加槽位
    pub fn read_inode_directory(&mut self, id: u32, stride_extra: usize) -> Result<InodeDirectory> {
        if !self.inode(id)?.is_dir() {
            return Err(Error::NotADirectory(id));
        }
        self.read_raw_directory(id, stride_extra)
    }

    /// 同 [`read_inode_directory`](Disk::read_inode_directory)，但不检查文件类型
    pub fn read_raw_directory(&mut self, id: u32, stride_extra: usize) -> Result<InodeDirectory> {
        let size = self.inode(id)?.size as usize;
        if size % DirEntry::SIZE != 0 {
            return Err(Error::corrupt(format!(
                "directory inode {id} holds {size} bytes, not a multiple of {}",
                DirEntry::SIZE
            )));
        }
        let capacity =
            (size + stride_extra * DirEntry::SIZE).div_ceil(BLOCK_SIZE) * BLOCK_SIZE / DirEntry::SIZE;

        let content = self.read_file(id)?;
        let mut entries = Vec::with_capacity(capacity);
        for raw in content.chunks_exact(DirEntry::SIZE) {
            entries.push(DirEntry::decode(raw)?);
        }

        Ok(InodeDirectory { entries, capacity })
    }

    /// 把目录视图写回目录的索引节点
    pub fn write_inode_directory(&mut self, id: u32, dir: &InodeDirectory) -> Result<()> {
        self.write_file(id, &dir.to_bytes()?)
    }

    /// 在目录 `parent` 中按名字查找子项的索引节点编号
    pub fn lookup(&mut self, parent: u32, name: &str) -> Result<u32> {
        self.read_inode_directory(parent, 0)?
            .find(name)
            .map(DirEntry::inode)
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }

    /// 在目录 `parent` 中新建一个子项，返回新索引节点的编号
    pub fn create_child(&mut self, parent: u32, name: &str, kind: FileType) -> Result<u32> {
        let mut dir = self.read_inode_directory(parent, 1)?;
        if dir.find(name).is_some() {
            return Err(Error::AlreadyExists(name.to_owned()));
        }
        // 先校验名字，避免白白分配索引节点
        DirEntry::new(name, 0)?;

        let child = self.alloc_inode()?;
        self.inode_mut(child)?.set_file_type(kind);
        dir.push(DirEntry::new(name, child)?);
        if let Err(e) = self.write_inode_directory(parent, &dir) {
            self.free_inode(child, false)?;
            return Err(e);
        }
        debug!("created {name:?} as inode {child} in directory {parent}");

        Ok(child)
    }

    /// 从目录 `parent` 中删除子项，并释放它的索引节点与数据块
    ///
    /// 非空目录不能删除。
    pub fn unlink_child(&mut self, parent: u32, name: &str) -> Result<()> {
        let mut dir = self.read_inode_directory(parent, 0)?;
        let child = dir
            .find(name)
            .map(DirEntry::inode)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        let inode = self.inode(child)?;
        if inode.is_dir() && inode.size > 0 {
            return Err(Error::invalid(format!("directory {name:?} is not empty")));
        }

        dir.remove(name);
        self.write_inode_directory(parent, &dir)?;
        self.free_inode(child, true)?;
        debug!("unlinked {name:?} (inode {child}) from directory {parent}");

        Ok(())
    }
}
