use anyhow::Result;

use crate::config::LayoutConfig;

use super::super::resolver::{board_overlays, resolve_layout_path};

pub fn run(board: &str, config: Option<&LayoutConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let overlays = board_overlays(&config.overlay_roots, board);
    debug!("probing {} overlay(s) for a layout descriptor", overlays.len());

    let path = resolve_layout_path(&overlays, &config.default_layout);
    println!("{}", path.display());
    Ok(())
}
