use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

use super::super::gpt::{lb_size_bytes, map_partitions, open_gpt, table_rows};
use super::super::types::PartitionInfo;

const PACK_NAME: &str = "pack_partitions.sh";
const UNPACK_NAME: &str = "unpack_partitions.sh";

const USAGE_GUARD: &str = "\nTARGET=${1:-}\nif [ -z \"$TARGET\" ]; then\n  echo \"usage: $0 <device>\" >&2\n  exit 1\nfi\n\n";

/// Generate the pack/unpack script pair for an image's current partition
/// table. Both scripts are written completely before either is marked
/// executable, so a failure never leaves a runnable half-script behind.
pub fn emit_scripts(image: &Path, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let gdisk = open_gpt(image, false)
        .map_err(|e| anyhow!("no readable partition table on {}: {e}", image.display()))?;
    let partitions = map_partitions(&gdisk)?;
    if partitions.is_empty() {
        bail!("no partitions on {}", image.display());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let pack_path = output_dir.join(PACK_NAME);
    let unpack_path = output_dir.join(UNPACK_NAME);

    let stamp = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    std::fs::write(&unpack_path, unpack_script(image, &partitions, &stamp))
        .with_context(|| format!("failed to write {}", unpack_path.display()))?;
    std::fs::write(&pack_path, pack_script(&partitions, &stamp))
        .with_context(|| format!("failed to write {}", pack_path.display()))?;

    for path in [&pack_path, &unpack_path] {
        mark_executable(path)?;
    }

    info!(
        "generated {} and {} for {} partition(s)",
        pack_path.display(),
        unpack_path.display(),
        partitions.len()
    );
    Ok((pack_path, unpack_path))
}

fn unpack_script(image: &Path, partitions: &[PartitionInfo], stamp: &str) -> String {
    let mut out = script_header(stamp);
    out.push_str(&format!("#\n# Partition table of {}:\n", image.display()));
    for row in table_rows(partitions) {
        out.push_str(&format!("#   {row}\n"));
    }
    out.push_str(USAGE_GUARD);
    for p in partitions {
        out.push_str(&format!(
            "dd if=\"$TARGET\" of=part_{} bs={} skip={} count={}\n",
            p.index,
            lb_size_bytes(),
            p.first_lba,
            p.size_lba()
        ));
    }
    out
}

fn pack_script(partitions: &[PartitionInfo], stamp: &str) -> String {
    let mut out = script_header(stamp);
    out.push_str(USAGE_GUARD);
    for p in partitions {
        out.push_str(&format!(
            "dd if=part_{} of=\"$TARGET\" bs={} seek={} count={} conv=notrunc\n",
            p.index,
            lb_size_bytes(),
            p.first_lba,
            p.size_lba()
        ));
    }
    out
}

fn script_header(stamp: &str) -> String {
    format!("#!/bin/bash -eu\n# Generated by imgtool on {stamp}\n")
}

fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
        .with_context(|| format!("failed to mark {} executable", path.display()))
}
