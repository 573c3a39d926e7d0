use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use gpt::disk::LogicalBlockSize;
use gpt::GptConfig;
use tempfile::TempDir;

use imgtool::disk::commands::{build, emit};
use imgtool::disk::gpt as disk_gpt;
use imgtool::disk::BuildCli;

const LB: u64 = 512;

fn create_disk_with_table(disk: &Path, size_bytes: u64, parts: &[(u32, &str, u64, u64)]) {
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(disk)
        .expect("create disk");
    file.set_len(size_bytes).expect("set len");

    let mut gdisk = GptConfig::new()
        .writable(true)
        .logical_block_size(LogicalBlockSize::Lb512)
        .create_from_device(file, None)
        .expect("create gpt");
    for (num, label, start_lba, size_lba) in parts {
        gdisk
            .add_partition_at(
                label,
                *num,
                *start_lba,
                *size_lba,
                gpt::partition_types::LINUX_FS,
                0,
            )
            .expect("add partition");
    }
    let _ = gdisk.write().expect("write gpt");
}

fn fill_region(disk: &Path, offset: u64, len: u64, seed: u8) {
    let mut file = fs::OpenOptions::new().write(true).open(disk).expect("open disk");
    file.seek(SeekFrom::Start(offset)).expect("seek");
    let chunk = vec![seed; 8192];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(chunk.len() as u64) as usize;
        file.write_all(&chunk[..n]).expect("write pattern");
        remaining -= n as u64;
    }
}

fn read_region(disk: &Path, offset: u64, len: u64) -> Vec<u8> {
    let mut file = fs::File::open(disk).expect("open disk");
    file.seek(SeekFrom::Start(offset)).expect("seek");
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf).expect("read region");
    buf
}

#[test]
fn emit_scripts_round_trip() {
    let temp = TempDir::new().expect("temp dir");
    let disk = temp.path().join("disk.img");
    let scripts = temp.path().join("scripts");
    let work = temp.path().join("work");
    fs::create_dir(&work).expect("work dir");

    create_disk_with_table(
        &disk,
        16 * 1024 * 1024,
        &[(1, "STATE", 2048, 4096), (2, "KERN-A", 6144, 2048)],
    );
    fill_region(&disk, 2048 * LB, 4096 * LB, 0xA5);
    fill_region(&disk, 6144 * LB, 2048 * LB, 0x5A);

    let (pack, unpack) = emit::emit_scripts(&disk, &scripts).expect("emit scripts");

    for path in [&pack, &unpack] {
        let mode = fs::metadata(path).expect("script exists").permissions().mode();
        assert_ne!(mode & 0o111, 0, "{} not executable", path.display());
    }

    let unpack_text = fs::read_to_string(&unpack).expect("read unpack");
    assert!(unpack_text.starts_with("#!/bin/bash -eu"));
    assert!(unpack_text.contains("# Partition table of"));
    assert!(unpack_text.contains("skip=2048 count=4096"));
    assert!(unpack_text.contains("skip=6144 count=2048"));

    let pack_text = fs::read_to_string(&pack).expect("read pack");
    assert!(pack_text.contains("seek=2048 count=4096 conv=notrunc"));

    // No argument: usage message on stderr, exit code 1.
    let out = Command::new("bash")
        .arg(&unpack)
        .current_dir(&work)
        .output()
        .expect("run unpack without args");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("usage"));

    // Unpack each partition into per-partition files.
    let out = Command::new("bash")
        .arg(&unpack)
        .arg(&disk)
        .current_dir(&work)
        .output()
        .expect("run unpack");
    assert!(out.status.success(), "unpack failed: {:?}", out);

    let part1 = work.join("part_1");
    let part2 = work.join("part_2");
    assert_eq!(fs::metadata(&part1).expect("part_1").len(), 4096 * LB);
    assert_eq!(fs::metadata(&part2).expect("part_2").len(), 2048 * LB);
    assert!(fs::read(&part1).expect("part_1").iter().all(|b| *b == 0xA5));
    assert!(fs::read(&part2).expect("part_2").iter().all(|b| *b == 0x5A));

    // Pack them back onto a blank same-sized device.
    let target = temp.path().join("target.img");
    let file = fs::File::create(&target).expect("create target");
    file.set_len(16 * 1024 * 1024).expect("set target len");
    drop(file);

    let out = Command::new("bash")
        .arg(&pack)
        .arg(&target)
        .current_dir(&work)
        .output()
        .expect("run pack");
    assert!(out.status.success(), "pack failed: {:?}", out);

    assert_eq!(
        read_region(&disk, 2048 * LB, 4096 * LB),
        read_region(&target, 2048 * LB, 4096 * LB)
    );
    assert_eq!(
        read_region(&disk, 6144 * LB, 2048 * LB),
        read_region(&target, 6144 * LB, 2048 * LB)
    );
}

#[test]
fn emit_aborts_without_partition_table() {
    let temp = TempDir::new().expect("temp dir");
    let disk = temp.path().join("blank.img");
    let scripts = temp.path().join("scripts");

    let file = fs::File::create(&disk).expect("create blank");
    file.set_len(1024 * 1024).expect("set len");
    drop(file);

    emit::emit_scripts(&disk, &scripts).expect_err("no table to read");
    assert!(!scripts.join("pack_partitions.sh").exists());
    assert!(!scripts.join("unpack_partitions.sh").exists());
}

#[test]
fn mark_successful_sets_boot_attribute() {
    let temp = TempDir::new().expect("temp dir");
    let disk = temp.path().join("disk.img");
    create_disk_with_table(
        &disk,
        16 * 1024 * 1024,
        &[(1, "STATE", 2048, 2048), (2, "KERN-A", 4096, 2048)],
    );

    disk_gpt::mark_successful(&disk, 2).expect("mark successful");

    let gdisk = disk_gpt::open_gpt(&disk, false).expect("reopen");
    let kern = gdisk.partitions().get(&2).expect("partition 2");
    assert_ne!(
        kern.flags & disk_gpt::BootAttributes::SUCCESSFUL.bits(),
        0
    );
    let state = gdisk.partitions().get(&1).expect("partition 1");
    assert_eq!(state.flags, 0);
}

#[test]
fn mark_successful_rejects_missing_partition() {
    let temp = TempDir::new().expect("temp dir");
    let disk = temp.path().join("disk.img");
    create_disk_with_table(&disk, 16 * 1024 * 1024, &[(1, "STATE", 2048, 2048)]);

    let err = disk_gpt::mark_successful(&disk, 2).expect_err("missing partition");
    assert!(err.to_string().contains("partition 2 not found"));
}

#[test]
fn quiet_rows_are_machine_parsable() {
    let temp = TempDir::new().expect("temp dir");
    let disk = temp.path().join("disk.img");
    create_disk_with_table(
        &disk,
        16 * 1024 * 1024,
        &[(1, "STATE", 2048, 4096), (2, "KERN-A", 6144, 2048)],
    );

    let gdisk = disk_gpt::open_gpt(&disk, false).expect("open");
    let partitions = disk_gpt::map_partitions(&gdisk).expect("map");
    let rows = disk_gpt::table_rows_quiet(&partitions);
    assert_eq!(rows[0], "2048 4096 1 STATE");
    assert_eq!(rows[1], "6144 2048 2 KERN-A");
}

#[test]
fn build_rejects_unknown_architecture() {
    let temp = TempDir::new().expect("temp dir");
    let output = temp.path().join("out.img");

    let cli = BuildCli {
        output: output.clone(),
        rootfs: temp.path().join("rootfs.img"),
        stateful: temp.path().join("stateful.img"),
        esp: temp.path().join("esp.img"),
        arch: "mips".to_string(),
        factory_install: false,
        yes: true,
    };

    let err = build::build_image(&cli).expect_err("mips is not supported");
    assert!(err.to_string().contains("unsupported architecture"));
    // Nothing was written to the output device.
    assert!(!output.exists());
}
