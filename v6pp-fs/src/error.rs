use std::io;

use derive_more::Display;
use thiserror::Error;

use crate::layout::DirEntry;

pub type Result<T> = core::result::Result<T, Error>;

/// 可耗尽的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Resource {
    #[display(fmt = "free block")]
    Block,
    #[display(fmt = "free inode")]
    Inode,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("disk image is {actual} bytes, expected {expected}")]
    SizeMismatch { actual: u64, expected: u64 },

    #[error("block range [{first}, {first} + {count}) is out of bounds")]
    InvalidRange { first: usize, count: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no {0} left")]
    ResourceExhausted(Resource),

    #[error("corrupt file system state: {0}")]
    CorruptState(String),

    #[error("inode {0} is not a directory")]
    NotADirectory(u32),

    #[error("incomplete i/o: requested {requested} bytes, transferred {actual}")]
    IoFailure { requested: usize, actual: usize },

    #[error("entry {0:?} already exists")]
    AlreadyExists(String),

    #[error("entry {0:?} not found")]
    NotFound(String),

    #[error("name exceeds {} bytes: {0:?}", DirEntry::NAME_MAX)]
    NameTooLong(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("record codec: {0}")]
    Codec(#[from] binrw::Error),
}

impl Error {
    #[inline]
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptState(message.into())
    }

    #[inline]
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
