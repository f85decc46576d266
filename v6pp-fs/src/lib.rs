//! # V6++ 磁盘镜像文件系统
//!
//! 磁盘布局（以块为单位）：
//! 引导块 | 内核区 | 超级块 | 索引节点区 | 数据区 | 交换区
//!
//! 整个超级块与索引节点区在会话期间常驻内存，
//! 其余数据均直接经由块存储层读写，不做缓存。

/* 自下而上的整体架构 */

// 磁盘几何参数：各区域的起止位置
mod geometry;
pub use geometry::*;

// 错误类型
mod error;
pub use error::{Error, Resource, Result};

// 磁盘数据结构层：超级块、索引节点、目录项、索引块的二进制布局
pub mod layout;
pub use layout::{
    Access, BlockId, DirEntry, DiskInode, FileType, FreeBlockCache, FreeInodeCache, IndexBlock,
    InodeFlag, SuperBlock,
};

// 块存储层：按偏移或按块直接读写后备字节流
mod block_store;
pub use block_store::{BlockStore, ByteStore};

// 常驻内存的索引节点表
mod inode_table;
pub use inode_table::InodeTable;

// 会话：持有超级块与索引节点表，负责加载、格式化、落盘
mod disk;
pub use disk::Disk;

// 超级块分配器：空闲块链表与空闲索引节点缓存
mod allocator;

// 三级块遍历引擎
mod traverse;
pub use traverse::BlockVisitor;

// 文件读写与数据块释放
mod file;

// 目录编解码
mod directory;
pub use directory::InodeDirectory;

pub const BLOCK_SIZE: usize = 512;

/// 一个磁盘块的原始数据
pub type DataBlock = [u8; BLOCK_SIZE];

/// 当前 Unix 时间（秒），超出 i32 时截断到上限
pub(crate) fn unix_time() -> i32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX))
        .unwrap_or(0)
}
