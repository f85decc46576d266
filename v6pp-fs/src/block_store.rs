//! # 块存储层
//!
//! 直接在后备字节流上做定位读写，不做任何缓冲。

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{BlockId, DataBlock, Error, Result, BLOCK_SIZE, DISK_SIZE, TOTAL_BLOCKS};

/// 可随机读写的后备字节流，文件或内存中的 `Cursor` 均可
pub trait ByteStore: Read + Write + Seek {}

impl<T: Read + Write + Seek + ?Sized> ByteStore for T {}

/// 以块为单位访问磁盘镜像
#[derive(Debug)]
pub struct BlockStore<S> {
    inner: S,
}

impl<S: ByteStore> BlockStore<S> {
    /// 接管后备字节流，其长度必须恰为磁盘镜像大小
    pub fn new(mut inner: S) -> Result<Self> {
        let actual = inner.seek(SeekFrom::End(0))?;
        if actual != DISK_SIZE {
            return Err(Error::SizeMismatch {
                actual,
                expected: DISK_SIZE,
            });
        }
        inner.rewind()?;

        Ok(Self { inner })
    }

    #[inline]
    pub fn seek(&mut self, offset: u64) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::Start(offset))?)
    }

    #[inline]
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// 从 `offset` 处读满 `buf`
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(offset)?;
        let mut done = 0;
        while done < buf.len() {
            match self.inner.read(&mut buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if done < buf.len() {
            return Err(Error::IoFailure {
                requested: buf.len(),
                actual: done,
            });
        }

        Ok(())
    }

    /// 把 `buf` 整个写到 `offset` 处
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.seek(offset)?;
        let mut done = 0;
        while done < buf.len() {
            match self.inner.write(&buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if done < buf.len() {
            return Err(Error::IoFailure {
                requested: buf.len(),
                actual: done,
            });
        }

        Ok(())
    }

    /// 读取从 `first` 起的 `count` 个块
    pub fn read_blocks(&mut self, dest: &mut [u8], first: usize, count: usize) -> Result<()> {
        let len = Self::check_range(first, count, dest.len())?;
        self.read_at((first * BLOCK_SIZE) as u64, &mut dest[..len])
    }

    /// 写入从 `first` 起的 `count` 个块
    pub fn write_blocks(&mut self, src: &[u8], first: usize, count: usize) -> Result<()> {
        let len = Self::check_range(first, count, src.len())?;
        self.write_at((first * BLOCK_SIZE) as u64, &src[..len])
    }

    pub fn read_block(&mut self, id: BlockId) -> Result<DataBlock> {
        let mut block = [0; BLOCK_SIZE];
        self.read_blocks(&mut block, id.index(), 1)?;
        Ok(block)
    }

    /// `dest` 至少要有一个块长
    #[inline]
    pub fn read_block_into(&mut self, id: BlockId, dest: &mut [u8]) -> Result<()> {
        self.read_blocks(dest, id.index(), 1)
    }

    #[inline]
    pub fn write_block(&mut self, id: BlockId, block: &[u8]) -> Result<()> {
        self.write_blocks(block, id.index(), 1)
    }

    #[inline]
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    #[inline]
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// 检查块区间并返回涉及的字节数
    fn check_range(first: usize, count: usize, buf_len: usize) -> Result<usize> {
        if count == 0 || first.checked_add(count).map_or(true, |end| end > TOTAL_BLOCKS) {
            return Err(Error::InvalidRange { first, count });
        }
        let len = count * BLOCK_SIZE;
        if buf_len < len {
            return Err(Error::invalid(format!(
                "buffer of {buf_len} bytes cannot hold {count} blocks"
            )));
        }
        Ok(len)
    }
}
