use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum LayoutAction {
    /// Print the filesystem block size in bytes
    ReadFsBlockSize {
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,
    },

    /// Print the disk block size in bytes
    ReadBlockSize {
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,
    },

    /// Print a partition size in bytes
    ReadPartitionSize {
        #[arg(value_name = "IMAGE_TYPE")]
        image_type: String,

        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,

        /// Partition selector: number or label
        #[arg(value_name = "ID|LABEL")]
        partition: String,
    },

    /// Print a filesystem size in bytes
    ReadFsSize {
        #[arg(value_name = "IMAGE_TYPE")]
        image_type: String,

        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,

        /// Partition selector: number or label
        #[arg(value_name = "ID|LABEL")]
        partition: String,
    },

    /// Print a partition label
    ReadLabel {
        #[arg(value_name = "IMAGE_TYPE")]
        image_type: String,

        #[arg(value_name = "DESCRIPTOR")]
        descriptor: PathBuf,

        /// Partition selector: number or label
        #[arg(value_name = "ID|LABEL")]
        partition: String,
    },
}

#[derive(Args, Debug)]
pub struct BuildCli {
    /// Target device or image file to assemble
    #[arg(long, value_name = "DEV")]
    pub output: PathBuf,

    /// Root filesystem image
    #[arg(long, value_name = "PATH")]
    pub rootfs: PathBuf,

    /// Stateful partition image
    #[arg(long, value_name = "PATH")]
    pub stateful: PathBuf,

    /// EFI system partition image
    #[arg(long, value_name = "PATH")]
    pub esp: PathBuf,

    /// Target architecture (x86, amd64, arm, arm64)
    #[arg(long, value_name = "ARCH")]
    pub arch: String,

    /// Assemble a factory install image
    #[arg(long)]
    pub factory_install: bool,

    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}
