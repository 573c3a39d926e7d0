use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::utils::parse_size;

/// Size field of a descriptor entry: a raw byte count or a string with a
/// K/M/G suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    Bytes(u64),
    Human(String),
}

impl SizeSpec {
    fn to_bytes(&self) -> Result<u64> {
        match self {
            SizeSpec::Bytes(n) => Ok(*n),
            SizeSpec::Human(s) => parse_size(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    block_size: u64,
    fs_block_size: u64,
}

#[derive(Debug, Deserialize)]
struct RawPartition {
    num: u32,
    label: String,
    size: SizeSpec,
    #[serde(default)]
    fs_size: Option<SizeSpec>,
}

#[derive(Debug, Deserialize)]
struct RawLayout {
    metadata: RawMetadata,
    layouts: BTreeMap<String, Vec<RawPartition>>,
}

/// One partition of a layout variant, sizes resolved to bytes.
#[derive(Debug, Clone)]
pub struct PartitionEntry {
    pub num: u32,
    pub label: String,
    pub size_bytes: u64,
    pub fs_size_bytes: u64,
}

/// A disk layout descriptor, parsed and validated once. Read-only after
/// loading; queries are pure lookups.
#[derive(Debug, Clone)]
pub struct DiskLayout {
    block_size: u64,
    fs_block_size: u64,
    layouts: BTreeMap<String, Vec<PartitionEntry>>,
}

impl DiskLayout {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read disk layout {}: {e}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("malformed disk layout {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let raw: RawLayout = serde_json::from_str(content)?;

        if raw.metadata.block_size == 0 || raw.metadata.fs_block_size == 0 {
            bail!("block sizes must be positive");
        }
        if !raw.metadata.fs_block_size.is_multiple_of(raw.metadata.block_size) {
            bail!(
                "fs_block_size {} is not a multiple of block_size {}",
                raw.metadata.fs_block_size,
                raw.metadata.block_size
            );
        }
        if raw.layouts.is_empty() {
            bail!("descriptor defines no layouts");
        }

        let mut layouts = BTreeMap::new();
        for (variant, raw_parts) in raw.layouts {
            let mut seen = BTreeSet::new();
            let mut entries = Vec::with_capacity(raw_parts.len());
            for part in raw_parts {
                if part.label.is_empty() {
                    bail!("layout {variant}: partition {} has an empty label", part.num);
                }
                if !seen.insert(part.num) {
                    bail!("layout {variant}: duplicate partition number {}", part.num);
                }

                let size_bytes = part
                    .size
                    .to_bytes()
                    .with_context(|| format!("layout {variant}: partition {}", part.num))?;
                if size_bytes == 0 {
                    bail!("layout {variant}: partition {} has zero size", part.num);
                }
                let fs_size_bytes = match &part.fs_size {
                    Some(spec) => spec
                        .to_bytes()
                        .with_context(|| format!("layout {variant}: partition {}", part.num))?,
                    None => size_bytes,
                };
                if fs_size_bytes > size_bytes {
                    bail!(
                        "layout {variant}: partition {} filesystem size {fs_size_bytes} exceeds partition size {size_bytes}",
                        part.num
                    );
                }

                entries.push(PartitionEntry {
                    num: part.num,
                    label: part.label,
                    size_bytes,
                    fs_size_bytes,
                });
            }
            layouts.insert(variant, entries);
        }

        Ok(Self {
            block_size: raw.metadata.block_size,
            fs_block_size: raw.metadata.fs_block_size,
            layouts,
        })
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn fs_block_size(&self) -> u64 {
        self.fs_block_size
    }

    pub fn partition_size(&self, image_type: &str, id: &str) -> Result<u64> {
        Ok(self.find(image_type, id)?.size_bytes)
    }

    pub fn filesystem_size(&self, image_type: &str, id: &str) -> Result<u64> {
        Ok(self.find(image_type, id)?.fs_size_bytes)
    }

    pub fn label(&self, image_type: &str, id: &str) -> Result<&str> {
        Ok(self.find(image_type, id)?.label.as_str())
    }

    fn find(&self, image_type: &str, id: &str) -> Result<&PartitionEntry> {
        let layout = self.layouts.get(image_type).ok_or_else(|| {
            let list = self.layouts.keys().cloned().collect::<Vec<_>>().join(", ");
            anyhow!("unknown image type {image_type}. available: {list}")
        })?;

        let resolved = if let Ok(num) = id.parse::<u32>() {
            layout.iter().find(|p| p.num == num)
        } else {
            layout.iter().find(|p| p.label == id)
        };

        resolved.ok_or_else(|| {
            let list = layout
                .iter()
                .map(|p| format!("{}:{}", p.num, p.label))
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("partition {id} not found in layout {image_type}. available: {list}")
        })
    }
}
