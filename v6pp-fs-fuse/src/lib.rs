//! 在宿主机上制作与查看 V6++ 磁盘镜像


use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use v6pp_fs::{ByteStore, Disk, FileType, InodeTable, DISK_SIZE};

/// 新建（或截断）镜像文件并格式化
pub fn create_image(path: &Path) -> Result<Disk<File>> {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    fd.set_len(DISK_SIZE)?;

    Ok(Disk::create(fd)?)
}

/// 打开已有镜像
///
/// 大小不符时，若 `format_on_mismatch` 则调整大小并重新格式化，否则报错。
pub fn open_image(path: &Path, format_on_mismatch: bool) -> Result<Disk<File>> {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let len = fd.metadata()?.len();
    if len != DISK_SIZE && format_on_mismatch {
        warn!(
            "{} is {len} bytes instead of {DISK_SIZE}, reformatting",
            path.display()
        );
        fd.set_len(DISK_SIZE)?;
        return Ok(Disk::create(fd)?);
    }

    Disk::open(fd).with_context(|| format!("cannot load {}", path.display()))
}

/// 把宿主机目录 `host` 递归打包进目录 `parent`，返回写入的文件数
pub fn pack_dir<S: ByteStore>(disk: &mut Disk<S>, parent: u32, host: &Path) -> Result<usize> {
    let mut entries = fs::read_dir(host)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut files = 0;
    for entry in entries {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            bail!("non UTF-8 file name {:?}", entry.path());
        };

        let kind = entry.file_type()?;
        if kind.is_dir() {
            let dir = disk.create_child(parent, name, FileType::Directory)?;
            files += pack_dir(disk, dir, &entry.path())?;
        } else if kind.is_file() {
            let data = fs::read(entry.path())?;
            let inode = disk.create_child(parent, name, FileType::Regular)?;
            disk.write_file(inode, &data)
                .with_context(|| format!("cannot store {:?}", entry.path()))?;
            info!("packed {name:?}: {} bytes as inode {inode}", data.len());
            files += 1;
        } else {
            warn!("skipping {:?}", entry.path());
        }
    }

    Ok(files)
}

/// 以缩进列出目录树
pub fn write_tree<S: ByteStore, W: Write>(disk: &mut Disk<S>, out: &mut W) -> Result<()> {
    writeln!(out, "/")?;
    write_subtree(disk, InodeTable::ROOT, 1, out)
}

fn write_subtree<S: ByteStore, W: Write>(
    disk: &mut Disk<S>,
    dir: u32,
    depth: usize,
    out: &mut W,
) -> Result<()> {
    let listing = disk.read_inode_directory(dir, 0)?;
    for entry in listing.iter() {
        let inode = disk.inode(entry.inode())?;
        let indent = "  ".repeat(depth);
        if inode.is_dir() {
            writeln!(out, "{indent}{}/", entry.name())?;
            write_subtree(disk, entry.inode(), depth + 1, out)?;
        } else {
            writeln!(out, "{indent}{} ({} bytes)", entry.name(), inode.size)?;
        }
    }
    Ok(())
}

/// 超级块计数的摘要
pub fn write_info<S: ByteStore, W: Write>(disk: &mut Disk<S>, out: &mut W) -> Result<()> {
    let free_blocks = disk.count_free_blocks()?;
    let used_inodes = disk
        .inodes()
        .iter()
        .filter(|(_, inode)| inode.is_allocated())
        .count();
    let sb = disk.super_block();

    writeln!(out, "total blocks:        {}", sb.total_blocks)?;
    writeln!(out, "inode zone blocks:   {}", sb.inode_blocks)?;
    writeln!(out, "free blocks:         {free_blocks}")?;
    writeln!(out, "cached free blocks:  {}", sb.free_blocks.len())?;
    writeln!(out, "cached free inodes:  {}", sb.free_inodes.len())?;
    writeln!(
        out,
        "allocated inodes:    {used_inodes} of {}",
        InodeTable::COUNT
    )?;
    writeln!(out, "last update:         {}", sb.time)?;
    Ok(())
}
