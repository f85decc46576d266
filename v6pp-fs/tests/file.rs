mod common;

use v6pp_fs::{
    BlockId, BlockVisitor, ByteStore, Disk, DiskInode, Error, IndexBlock, Resource, Result,
    BLOCK_SIZE,
};

use common::{formatted, payload, MemDisk};

/// 单个直接块、首个一级间接块、首个二级间接块的边界
const SIZES: [usize; 6] = [
    0,
    1,
    DiskInode::DIRECT_BYTES,
    DiskInode::DIRECT_BYTES + 1,
    DiskInode::DIRECT_BYTES + 2 * IndexBlock::ENTRIES * BLOCK_SIZE,
    DiskInode::DIRECT_BYTES + 2 * IndexBlock::ENTRIES * BLOCK_SIZE + 1,
];

#[test]
fn write_then_read() {
    let mut disk = formatted();
    for (seed, size) in SIZES.into_iter().enumerate() {
        let id = disk.alloc_inode().unwrap();
        let data = payload(size, seed as u64);
        disk.write_file(id, &data).unwrap();

        let inode = disk.inode(id).unwrap();
        assert_eq!(inode.size as usize, size);
        assert_eq!(inode.is_large(), size > DiskInode::DIRECT_BYTES);
        assert_eq!(disk.read_file(id).unwrap(), data, "size {size}");
    }
}

#[test]
fn block_accounting() {
    let mut disk = formatted();
    let initial = disk.count_free_blocks().unwrap();
    let id = disk.alloc_inode().unwrap();

    // 7 个数据块 + 1 个一级索引块
    disk.write_file(id, &payload(DiskInode::DIRECT_BYTES + 1, 1))
        .unwrap();
    assert_eq!(disk.count_free_blocks().unwrap(), initial - 8);
    assert!(!disk.inode(id).unwrap().indirect[0].is_null());
    assert!(disk.inode(id).unwrap().indirect[1].is_null());

    // 263 个数据块 + 两个一级索引块 + 二级索引块及其下的一个一级索引块
    let size = SIZES[5];
    disk.write_file(id, &payload(size, 2)).unwrap();
    assert_eq!(disk.count_free_blocks().unwrap(), initial - 263 - 4);

    disk.free_inode(id, true).unwrap();
    assert_eq!(disk.count_free_blocks().unwrap(), initial);
}

#[test]
fn shrinking_returns_blocks() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.write_file(id, &payload(100 * 1024, 3)).unwrap();
    let before = disk.count_free_blocks().unwrap();

    let short = payload(1024, 4);
    disk.write_file(id, &short).unwrap();
    let after = disk.count_free_blocks().unwrap();
    assert!(after >= before);
    // 200 个数据块：6 个直接 + 128 个挂在第一个一级索引块 + 66 个挂在第二个
    assert_eq!(after - before, 200 + 2 - 2);
    assert_eq!(disk.read_file(id).unwrap(), short);
    assert!(!disk.inode(id).unwrap().is_large());
}

#[test]
fn too_large() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    let data = vec![0; DiskInode::MAX_FILE_SIZE + 1];
    assert!(matches!(
        disk.write_file(id, &data),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(disk.inode(id).unwrap().size, 0);
}

#[test]
fn free_inode_blocks_clears_pointers() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.write_file(id, &payload(SIZES[5], 5)).unwrap();
    disk.free_inode_blocks(id).unwrap();

    let inode = disk.inode(id).unwrap();
    assert_eq!(inode.size, 0);
    assert!(inode.pointers().all(BlockId::is_null));
    assert!(!inode.is_large());
    assert!(inode.is_allocated());
}

#[test]
fn sparse_reads_as_zeros() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.inode_mut(id).unwrap().size = 5000;
    assert_eq!(disk.read_file(id).unwrap(), vec![0; 5000]);
}

#[test]
fn failed_write_leaves_torn_inode() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    // 只留 3 个空闲块
    let free = disk.count_free_blocks().unwrap();
    for _ in 0..free - 3 {
        disk.alloc_block().unwrap();
    }

    let err = disk.write_file(id, &payload(10 * BLOCK_SIZE, 6)).unwrap_err();
    assert!(matches!(err, Error::ResourceExhausted(Resource::Block)));

    let inode = disk.inode(id).unwrap();
    assert_eq!(inode.size as usize, 10 * BLOCK_SIZE);
    assert!(inode.direct[..3].iter().all(|id| !id.is_null()));
    assert!(inode.direct[3..].iter().all(|id| id.is_null()));
    assert_eq!(disk.count_free_blocks().unwrap(), 0);

    // 撕裂的索引节点仍可释放
    disk.free_inode_blocks(id).unwrap();
    assert_eq!(disk.count_free_blocks().unwrap(), 3);
}

/// 取空分配器后只归还 `spare` 个块，外加最后才会被分配的 `stale`
///
/// `stale` 上预先写入一个指向 `live` 的索引块。
fn leave_stale_index(disk: &mut MemDisk, live: BlockId, spare: usize) -> BlockId {
    let mut held = Vec::new();
    while let Ok(id) = disk.alloc_block() {
        held.push(id);
    }

    let stale = held.pop().unwrap();
    let mut index = IndexBlock::new();
    index[0] = live;
    disk.store().write_block(stale, &index.to_block().unwrap()).unwrap();

    disk.free_block(stale).unwrap();
    for id in held.drain(held.len() - spare..) {
        disk.free_block(id).unwrap();
    }
    stale
}

/// 在新分配的索引块处写失败，随后释放撕裂的索引节点，其它文件的块不受影响
fn torn_index_is_released_cleanly(size: usize, spare: usize, tier: fn(&DiskInode) -> BlockId) {
    let mut disk = formatted();
    let owner = disk.alloc_inode().unwrap();
    let kept = payload(BLOCK_SIZE, 9);
    disk.write_file(owner, &kept).unwrap();
    let live = disk.inode(owner).unwrap().direct[0];

    let torn = disk.alloc_inode().unwrap();
    let stale = leave_stale_index(&mut disk, live, spare);
    assert!(matches!(
        disk.write_file(torn, &payload(size, 10)),
        Err(Error::ResourceExhausted(Resource::Block))
    ));
    assert_eq!(tier(disk.inode(torn).unwrap()), stale);

    disk.free_inode(torn, true).unwrap();
    assert_eq!(disk.count_free_blocks().unwrap(), spare + 1);
    while let Ok(id) = disk.alloc_block() {
        assert_ne!(id, live);
    }
    assert_eq!(disk.read_file(owner).unwrap(), kept);
}

#[test]
fn torn_single_indirect_release() {
    torn_index_is_released_cleanly(8 * BLOCK_SIZE, DiskInode::DIRECT, |inode| {
        inode.indirect[0]
    });
}

#[test]
fn torn_double_indirect_release() {
    // 直接块、两个一级索引块下的全部数据块以及这两个索引块
    let spare = DiskInode::DIRECT + 2 * IndexBlock::ENTRIES + 2;
    torn_index_is_released_cleanly(SIZES[5], spare, |inode| inode.double_indirect[0]);
}

/// 统计遍历经过的块
#[derive(Default)]
struct Census {
    leaves: usize,
    indexes: usize,
    offsets: Vec<usize>,
}

impl<S: ByteStore> BlockVisitor<S> for Census {
    fn leaf_setup(&mut self, _: &mut Disk<S>, offset: usize, _: BlockId) -> Result<()> {
        self.leaves += 1;
        self.offsets.push(offset);
        Ok(())
    }

    fn index_setup(&mut self, _: &mut Disk<S>, _: &IndexBlock, _: BlockId) -> Result<()> {
        self.indexes += 1;
        Ok(())
    }
}

#[test]
fn visitor_hooks() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.write_file(id, &payload(SIZES[5], 7)).unwrap();

    let mut census = Census::default();
    assert!(disk.traverse_blocks(id, &mut census).unwrap());
    assert_eq!(census.leaves, 263);
    assert_eq!(census.indexes, 4);
    assert!(census
        .offsets
        .iter()
        .enumerate()
        .all(|(i, &offset)| offset == i * BLOCK_SIZE));
}

/// 在第二个数据块处失败，并吞下错误
#[derive(Default)]
struct FailSecond {
    visited: usize,
    remaining: Option<usize>,
}

impl<S: ByteStore> BlockVisitor<S> for FailSecond {
    fn leaf_process(&mut self, _: &mut Disk<S>, _: usize, _: BlockId) -> Result<()> {
        self.visited += 1;
        if self.visited == 2 {
            return Err(Error::CorruptState("injected".into()));
        }
        Ok(())
    }

    fn on_failure(&mut self, _: &DiskInode, remaining: usize, error: Error) -> Result<()> {
        assert!(matches!(error, Error::CorruptState(_)));
        self.remaining = Some(remaining);
        Ok(())
    }
}

#[test]
fn failure_handler_converts_to_false() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.write_file(id, &payload(1500, 8)).unwrap();

    let mut visitor = FailSecond::default();
    assert!(!disk.traverse_blocks(id, &mut visitor).unwrap());
    assert_eq!(visitor.remaining, Some(1500 - BLOCK_SIZE));
}

/// 非法的块编号会中止遍历
struct OutOfRange;

impl<S: ByteStore> BlockVisitor<S> for OutOfRange {
    fn allocate(&mut self, _: &mut Disk<S>, _: BlockId) -> Result<BlockId> {
        Ok(BlockId::from(u32::MAX))
    }
}

#[test]
fn invalid_allocation_aborts() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    disk.write_file(id, b"x").unwrap();
    let before = disk.inode(id).unwrap().direct[0];

    assert!(matches!(
        disk.traverse_blocks(id, &mut OutOfRange),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(disk.inode(id).unwrap().direct[0], before);
}
