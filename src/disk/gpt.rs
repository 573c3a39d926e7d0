use anyhow::{anyhow, Result};
use bitflags::bitflags;
use gpt::{disk::LogicalBlockSize, GptConfig};
use std::{fs::File, path::Path};

use super::types::PartitionInfo;

const LB_SIZE_BYTES: u64 = 512;

bitflags! {
    /// Boot attribute bits carried in the GPT attribute word of kernel
    /// partitions. Priority and tries are 4-bit fields; successful is the
    /// single bit the assembler sets on a freshly built image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BootAttributes: u64 {
        const PRIORITY   = 0xF << 48;
        const TRIES      = 0xF << 52;
        const SUCCESSFUL = 1 << 56;
    }
}

pub fn open_gpt(disk: &Path, writable: bool) -> Result<gpt::GptDisk<File>> {
    GptConfig::new()
        .writable(writable)
        .logical_block_size(LogicalBlockSize::Lb512)
        .open(disk)
        .map_err(|e| anyhow!("failed to open GPT: {e}"))
}

pub fn map_partitions(gdisk: &gpt::GptDisk<File>) -> Result<Vec<PartitionInfo>> {
    let mut out = Vec::new();
    for (idx, part) in gdisk.partitions().iter() {
        if !part.is_used() {
            continue;
        }
        let start = part
            .bytes_start(LogicalBlockSize::Lb512)
            .map_err(|e| anyhow!("invalid partition start: {e}"))?;
        let size = part
            .bytes_len(LogicalBlockSize::Lb512)
            .map_err(|e| anyhow!("invalid partition size: {e}"))?;
        out.push(PartitionInfo {
            index: *idx,
            name: part.name.clone(),
            first_lba: part.first_lba,
            last_lba: part.last_lba,
            start_bytes: start,
            size_bytes: size,
        });
    }
    out.sort_by_key(|p| p.index);
    Ok(out)
}

pub fn find_partition(partitions: &[PartitionInfo], num: u32) -> Result<&PartitionInfo> {
    partitions.iter().find(|p| p.index == num).ok_or_else(|| {
        let list = partitions
            .iter()
            .map(|p| format!("{}:{}", p.index, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("partition {num} not found. available: {list}")
    })
}

/// Human-readable table rows, also embedded as comment lines in generated
/// scripts.
pub fn table_rows(partitions: &[PartitionInfo]) -> Vec<String> {
    partitions
        .iter()
        .map(|p| {
            format!(
                "{:>3} {:<16} start={:>10} size={:>10}",
                p.index,
                p.name,
                p.first_lba,
                p.size_lba()
            )
        })
        .collect()
}

/// Machine-parsable rows: `start size number label`, one partition per line.
pub fn table_rows_quiet(partitions: &[PartitionInfo]) -> Vec<String> {
    partitions
        .iter()
        .map(|p| format!("{} {} {} {}", p.first_lba, p.size_lba(), p.index, p.name))
        .collect()
}

/// Set the successful-boot attribute bit on a partition.
pub fn mark_successful(disk: &Path, part_num: u32) -> Result<()> {
    let mut gdisk = open_gpt(disk, true)?;

    let mut partitions = gdisk.partitions().clone();
    let part = partitions
        .get_mut(&part_num)
        .filter(|p| p.is_used())
        .ok_or_else(|| anyhow!("partition {part_num} not found on {}", disk.display()))?;
    part.flags |= BootAttributes::SUCCESSFUL.bits();

    gdisk
        .update_partitions(partitions)
        .map_err(|e| anyhow!("failed to update partition {part_num}: {e}"))?;
    let _ = gdisk
        .write()
        .map_err(|e| anyhow!("failed to write GPT: {e}"))?;
    Ok(())
}

pub fn lb_size_bytes() -> u64 {
    LB_SIZE_BYTES
}
