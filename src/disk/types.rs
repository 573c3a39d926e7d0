use anyhow::bail;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Debug, Clone)]
pub struct PartitionInfo {
    pub index: u32,
    pub name: String,
    pub first_lba: u64,
    pub last_lba: u64,
    pub start_bytes: u64,
    pub size_bytes: u64,
}

impl PartitionInfo {
    pub fn size_lba(&self) -> u64 {
        self.last_lba - self.first_lba + 1
    }
}

#[derive(Serialize)]
pub struct DiskInfo {
    pub disk: String,
    pub size_bytes: u64,
    pub partitions: Vec<PartitionInfo>,
}

/// Architectures the assembler knows how to lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    Amd64,
    Arm,
    Arm64,
}

impl Arch {
    pub fn is_arm_family(self) -> bool {
        matches!(self, Arch::Arm | Arch::Arm64)
    }
}

impl FromStr for Arch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" => Ok(Arch::X86),
            "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm" => Ok(Arch::Arm),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => bail!("unsupported architecture: {other}"),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86 => "x86",
            Arch::Amd64 => "amd64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        };
        f.write_str(name)
    }
}
