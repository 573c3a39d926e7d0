use anyhow::Result;
use std::path::Path;

use super::super::gpt::{map_partitions, open_gpt, table_rows, table_rows_quiet};
use super::super::types::DiskInfo;
use super::super::utils::stat_len;

pub fn show(image: &Path, quiet: bool, json: bool) -> Result<()> {
    let gdisk = open_gpt(image, false)?;
    let partitions = map_partitions(&gdisk)?;

    if json {
        let info = DiskInfo {
            disk: image.display().to_string(),
            size_bytes: stat_len(image)?,
            partitions,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if partitions.is_empty() {
        if !quiet {
            println!("No GPT partitions found.");
        }
        return Ok(());
    }

    let rows = if quiet {
        table_rows_quiet(&partitions)
    } else {
        table_rows(&partitions)
    };
    for row in rows {
        println!("{row}");
    }
    Ok(())
}
