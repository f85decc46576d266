mod common;

use std::collections::HashSet;

use v6pp_fs::{
    BlockId, Error, InodeTable, Resource, BLOCK_SIZE, DATA_ZONE_BLOCKS, DATA_ZONE_START,
    SWAP_ZONE_START, TOTAL_BLOCKS,
};

use common::formatted;

#[test]
fn format_fills_free_list() {
    let mut disk = formatted();
    let cache = &disk.super_block().free_blocks;
    // 升序释放整个数据区，最后一个链头是 17923
    assert_eq!(cache.len(), 77);
    assert_eq!(cache.blocks[0], BlockId::from(17923usize));
    assert_eq!(cache.blocks[76], BlockId::from(SWAP_ZONE_START - 1));
    assert_eq!(disk.count_free_blocks().unwrap(), DATA_ZONE_BLOCKS);
}

#[test]
fn exhaust_and_refill() {
    let mut disk = formatted();

    let mut first = Vec::new();
    loop {
        match disk.alloc_block() {
            Ok(id) => first.push(id),
            Err(Error::ResourceExhausted(Resource::Block)) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(first.len(), DATA_ZONE_BLOCKS);
    let unique: HashSet<_> = first.iter().copied().collect();
    assert_eq!(unique.len(), first.len());
    assert!(first
        .iter()
        .all(|id| (DATA_ZONE_START..SWAP_ZONE_START).contains(&id.index())));
    assert_eq!(disk.count_free_blocks().unwrap(), 0);
    assert!(matches!(
        disk.alloc_block(),
        Err(Error::ResourceExhausted(Resource::Block))
    ));

    for &id in &first {
        disk.free_block(id).unwrap();
    }
    assert_eq!(disk.count_free_blocks().unwrap(), DATA_ZONE_BLOCKS);

    let mut second = 0;
    while disk.alloc_block().is_ok() {
        second += 1;
    }
    assert_eq!(second, first.len());
}

#[test]
fn free_block_bounds() {
    let mut disk = formatted();
    assert!(matches!(
        disk.free_block(BlockId::from(TOTAL_BLOCKS)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        disk.free_block(BlockId::NULL),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn alloc_block_is_lifo() {
    let mut disk = formatted();
    let a = disk.alloc_block().unwrap();
    let b = disk.alloc_block().unwrap();
    disk.free_block(b).unwrap();
    disk.free_block(a).unwrap();
    assert_eq!(disk.alloc_block().unwrap(), a);
    assert_eq!(disk.alloc_block().unwrap(), b);
}

#[test]
fn corrupt_chain_block() {
    let mut disk = formatted();
    // 取到只剩链头
    for _ in 0..76 {
        disk.alloc_block().unwrap();
    }
    assert_eq!(disk.super_block().free_blocks.len(), 1);

    let head = disk.super_block().free_blocks.blocks[0];
    let mut block = [0; BLOCK_SIZE];
    block[..4].copy_from_slice(&500u32.to_ne_bytes());
    disk.store().write_block(head, &block).unwrap();
    assert!(matches!(disk.alloc_block(), Err(Error::CorruptState(_))));
}

#[test]
fn chain_block_out_of_range() {
    let mut disk = formatted();
    for _ in 0..76 {
        disk.alloc_block().unwrap();
    }
    let head = disk.super_block().free_blocks.blocks[0];
    let mut block = [0; BLOCK_SIZE];
    block[..4].copy_from_slice(&2u32.to_ne_bytes());
    block[8..12].copy_from_slice(&(TOTAL_BLOCKS as u32 + 5).to_ne_bytes());
    disk.store().write_block(head, &block).unwrap();

    // 链头本身仍可分配，下一个编号越界
    assert_eq!(disk.alloc_block().unwrap(), head);
    assert!(matches!(disk.alloc_block(), Err(Error::CorruptState(_))));
}

#[test]
fn alloc_inode_skips_reserved() {
    let mut disk = formatted();
    let mut seen = HashSet::new();
    for _ in 0..300 {
        let id = disk.alloc_inode().unwrap();
        assert!(id > InodeTable::ROOT);
        assert!(seen.insert(id));
        let inode = disk.inode(id).unwrap();
        assert!(inode.is_allocated());
        assert_eq!(inode.size, 0);
        assert_eq!(inode.nlink, 1);
        assert_eq!(inode.permissions(), 0o777);
    }
}

#[test]
fn inode_exhaustion() {
    let mut disk = formatted();
    let available = InodeTable::COUNT - 2;
    for _ in 0..available {
        disk.alloc_inode().unwrap();
    }
    assert!(matches!(
        disk.alloc_inode(),
        Err(Error::ResourceExhausted(Resource::Inode))
    ));

    disk.free_inode(4000, true).unwrap();
    assert_eq!(disk.alloc_inode().unwrap(), 4000);
}

#[test]
fn free_inode_is_lifo() {
    let mut disk = formatted();
    let id = disk.alloc_inode().unwrap();
    let other = disk.alloc_inode().unwrap();
    disk.write_file(id, b"some bytes").unwrap();

    disk.free_inode(id, true).unwrap();
    assert!(!disk.inode(id).unwrap().is_allocated());
    assert_eq!(disk.alloc_inode().unwrap(), id);
    assert_ne!(id, other);
}

#[test]
fn free_inode_bounds() {
    let mut disk = formatted();
    for id in [0, InodeTable::ROOT, InodeTable::COUNT as u32] {
        assert!(matches!(
            disk.free_inode(id, false),
            Err(Error::InvalidArgument(_))
        ));
    }
    assert!(disk.inode(InodeTable::ROOT).unwrap().is_allocated());
}

#[test]
fn full_inode_cache_drops_frees() {
    let mut disk = formatted();
    assert!(disk.super_block().free_inodes.is_full());
    disk.free_inode(5000, false).unwrap();
    assert_eq!(disk.super_block().free_inodes.len(), 100);
    assert!(!disk.super_block().free_inodes.entries().contains(&5000));
}

#[test]
fn stale_cached_inode_is_skipped() {
    let mut disk = formatted();
    // 格式化后缓存栈顶是 101
    assert_eq!(disk.super_block().free_inodes.entries().last(), Some(&101));
    disk.inode_mut(101).unwrap().allocate(0);
    assert_eq!(disk.alloc_inode().unwrap(), 100);
}
