use anyhow::{anyhow, bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::super::cli::BuildCli;
use super::super::gpt::{find_partition, map_partitions, mark_successful, open_gpt};
use super::super::mount::MountGuard;
use super::super::types::{Arch, PartitionInfo};
use super::super::utils::{confirm_or_yes, root_cmd, run_checked, stat_len};

/// Partition slots of the assembled image.
const STATEFUL_PART: u32 = 1;
const KERNEL_PART: u32 = 2;
const ROOTFS_PART: u32 = 3;
const ESP_PART: u32 = 12;

/// Table writer embedded in the root filesystem image.
const WRITER_RELPATH: &str = "usr/sbin/write_gpt.sh";
const WRITER_ENTRY: &str = "write_base_table";

/// Protective MBR stub shipped inside x86-family root filesystems.
const PMBR_RELPATH: &str = "boot/syslinux/gptmbr.bin";

const COPY_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Assemble a bootable image: write the partition table, splice the
/// stateful/root/ESP sub-images at their partition offsets, then flag the
/// kernel partition as a successful boot candidate. Any step failure aborts
/// the remaining steps; a partially written device is left for the caller to
/// discard.
pub fn build_image(cli: &BuildCli) -> Result<()> {
    // Unknown architectures abort before anything touches the output.
    let arch: Arch = cli.arch.parse()?;
    let layout_type = if cli.factory_install {
        "factory_install"
    } else {
        "base"
    };

    if !cli.yes {
        let prompt = format!("This will overwrite {}. Continue?", cli.output.display());
        confirm_or_yes(false, &prompt)?;
    }

    info!(
        "writing {layout_type} partition table to {} ({arch})",
        cli.output.display()
    );
    write_partition_table(&cli.output, &cli.rootfs, arch, layout_type)?;

    let partitions = {
        let gdisk = open_gpt(&cli.output, false)?;
        map_partitions(&gdisk)?
    };

    copy_into_partition(&cli.stateful, &cli.output, &partitions, STATEFUL_PART)?;
    copy_into_partition(&cli.rootfs, &cli.output, &partitions, ROOTFS_PART)?;
    copy_into_partition(&cli.esp, &cli.output, &partitions, ESP_PART)?;

    mark_successful(&cli.output, KERNEL_PART)?;
    info!("marked partition {KERNEL_PART} as a successful boot candidate");
    Ok(())
}

/// Mount the rootfs read-only on a fresh scratch directory and drive the
/// table writer it carries. The mount guard releases the mount on every exit
/// path, including writer failure.
fn write_partition_table(
    output: &Path,
    rootfs: &Path,
    arch: Arch,
    layout_type: &str,
) -> Result<()> {
    let scratch = tempfile::tempdir().context("failed to create scratch mount point")?;
    let mount = MountGuard::mount_ro_loop(rootfs, scratch.path())?;

    let writer = mount.path().join(WRITER_RELPATH);
    if !writer.is_file() {
        bail!(
            "table writer {WRITER_RELPATH} not found in {}",
            rootfs.display()
        );
    }
    let pmbr = protective_mbr(mount.path(), arch);
    if !pmbr.exists() {
        bail!("protective MBR blob {} not found", pmbr.display());
    }

    let mut cmd = root_cmd("bash");
    cmd.arg("-c")
        .arg(format!(
            ". \"{}\" && {WRITER_ENTRY} \"{}\" \"{}\"",
            writer.display(),
            output.display(),
            pmbr.display()
        ))
        .env("DISK_LAYOUT_TYPE", layout_type);
    let result = run_checked(&mut cmd);

    match result {
        // Surface unmount errors only on the success path; on failure the
        // guard still releases the mount.
        Ok(()) => mount.unmount(),
        Err(e) => Err(e),
    }
}

fn protective_mbr(rootfs_mount: &Path, arch: Arch) -> PathBuf {
    if arch.is_arm_family() {
        PathBuf::from("/dev/zero")
    } else {
        rootfs_mount.join(PMBR_RELPATH)
    }
}

/// Raw copy of a sub-image into a partition slot, never truncating the
/// destination. Falls back to dd under sudo when the target device is not
/// writable by the invoking identity.
fn copy_into_partition(
    src: &Path,
    disk: &Path,
    partitions: &[PartitionInfo],
    num: u32,
) -> Result<()> {
    let part = find_partition(partitions, num)?;
    let src_len = stat_len(src)?;
    if src_len > part.size_bytes {
        bail!(
            "{} ({src_len} bytes) does not fit partition {num} ({} bytes)",
            src.display(),
            part.size_bytes
        );
    }

    info!(
        "copying {} into partition {num} at byte offset {}",
        src.display(),
        part.start_bytes
    );

    match OpenOptions::new().write(true).open(disk) {
        Ok(mut dst) => {
            let mut source =
                File::open(src).map_err(|e| anyhow!("failed to open {}: {e}", src.display()))?;
            dst.seek(SeekFrom::Start(part.start_bytes))?;
            copy_stream(&mut source, &mut dst)?;
            dst.flush()?;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => dd_copy(src, disk, part),
        Err(e) => Err(anyhow!("failed to open {}: {e}", disk.display())),
    }
}

fn copy_stream(src: &mut File, dst: &mut File) -> Result<()> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
    }
    Ok(())
}

fn dd_copy(src: &Path, disk: &Path, part: &PartitionInfo) -> Result<()> {
    let mut cmd = root_cmd("dd");
    cmd.arg(format!("if={}", src.display()))
        .arg(format!("of={}", disk.display()))
        .arg("bs=512")
        .arg(format!("seek={}", part.first_lba))
        .arg("conv=notrunc");
    run_checked(&mut cmd)
}
