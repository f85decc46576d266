mod cli;

use std::fs;
use std::io;

use anyhow::Result;
use clap::Parser;
use v6pp_fs::InodeTable;
use v6pp_fs_fuse::{create_image, open_image, pack_dir, write_info, write_tree};

use self::cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("image={:?}", cli.image);

    match cli.command {
        Command::Make {
            boot,
            kernel,
            source,
        } => {
            let mut disk = create_image(&cli.image)?;
            if let Some(boot) = boot {
                disk.write_bootloader(&fs::read(boot)?)?;
            }
            if let Some(kernel) = kernel {
                disk.write_kernel(&fs::read(kernel)?)?;
            }
            if let Some(source) = source {
                let files = pack_dir(&mut disk, InodeTable::ROOT, &source)?;
                println!("packed {files} files from {source:?}");
            }
            disk.close()?;
        }
        Command::Pack {
            source,
            format_on_size_mismatch,
        } => {
            let mut disk = open_image(&cli.image, format_on_size_mismatch)?;
            let files = pack_dir(&mut disk, InodeTable::ROOT, &source)?;
            println!("packed {files} files from {source:?}");
            disk.close()?;
        }
        Command::Tree => {
            let mut disk = open_image(&cli.image, false)?;
            write_tree(&mut disk, &mut io::stdout().lock())?;
            disk.close()?;
        }
        Command::Info => {
            let mut disk = open_image(&cli.image, false)?;
            write_info(&mut disk, &mut io::stdout().lock())?;
            disk.close()?;
        }
    }

    Ok(())
}
