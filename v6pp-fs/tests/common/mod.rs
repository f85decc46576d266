#![allow(dead_code)]

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use v6pp_fs::{Disk, DISK_SIZE};

pub type MemDisk = Disk<Cursor<Vec<u8>>>;

pub fn blank_image() -> Cursor<Vec<u8>> {
    Cursor::new(vec![0; DISK_SIZE as usize])
}

/// 新格式化的内存镜像
pub fn formatted() -> MemDisk {
    Disk::create(blank_image()).unwrap()
}

/// 固定种子的随机数据
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}
