use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Build and inspect V6++ disk images")]
pub struct Cli {
    /// Disk image file
    #[arg(long, short, default_value = "c.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create and format a fresh image
    Make {
        /// Boot block image
        #[arg(long, short)]
        boot: Option<PathBuf>,

        /// Kernel image
        #[arg(long, short)]
        kernel: Option<PathBuf>,

        /// Host directory packed into the root directory
        #[arg(long, short)]
        source: Option<PathBuf>,
    },

    /// Pack a host directory into the root of an existing image
    Pack {
        /// Host directory
        #[arg(long, short)]
        source: PathBuf,

        /// Reformat the image when its size is wrong instead of failing
        #[arg(long)]
        format_on_size_mismatch: bool,
    },

    /// List the directory tree
    Tree,

    /// Show superblock counters
    Info,
}
