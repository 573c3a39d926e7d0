use anyhow::Result;

use super::super::cli::LayoutAction;
use super::super::layout::DiskLayout;

/// Each query prints exactly one value on stdout; lookup failures propagate
/// as errors so the process exits nonzero instead of printing a default.
pub fn run(action: LayoutAction) -> Result<()> {
    match action {
        LayoutAction::ReadFsBlockSize { descriptor } => {
            println!("{}", DiskLayout::load(&descriptor)?.fs_block_size());
        }
        LayoutAction::ReadBlockSize { descriptor } => {
            println!("{}", DiskLayout::load(&descriptor)?.block_size());
        }
        LayoutAction::ReadPartitionSize {
            image_type,
            descriptor,
            partition,
        } => {
            let layout = DiskLayout::load(&descriptor)?;
            println!("{}", layout.partition_size(&image_type, &partition)?);
        }
        LayoutAction::ReadFsSize {
            image_type,
            descriptor,
            partition,
        } => {
            let layout = DiskLayout::load(&descriptor)?;
            println!("{}", layout.filesystem_size(&image_type, &partition)?);
        }
        LayoutAction::ReadLabel {
            image_type,
            descriptor,
            partition,
        } => {
            let layout = DiskLayout::load(&descriptor)?;
            println!("{}", layout.label(&image_type, &partition)?);
        }
    }
    Ok(())
}
