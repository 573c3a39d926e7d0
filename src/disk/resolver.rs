use std::path::{Path, PathBuf};

/// Location of the descriptor inside an overlay.
const LAYOUT_RELPATH: &str = "scripts/disk_layout.json";

/// Overlay directories probed for a board, in precedence order. An empty
/// board name selects the default board overlay.
pub fn board_overlays(roots: &[PathBuf], board: &str) -> Vec<PathBuf> {
    let name = if board.is_empty() { "default" } else { board };
    roots
        .iter()
        .map(|root| root.join(format!("overlay-{name}")))
        .collect()
}

/// Probe each overlay for a layout descriptor. Later overlays override
/// earlier ones, so the last overlay carrying one wins; when none do, the
/// built-in default path is returned. Contents are not validated here.
pub fn resolve_layout_path(overlays: &[PathBuf], default_path: &Path) -> PathBuf {
    let mut resolved = default_path.to_path_buf();
    for overlay in overlays {
        let candidate = overlay.join(LAYOUT_RELPATH);
        if candidate.is_file() {
            resolved = candidate;
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populate(overlay: &Path) {
        let scripts = overlay.join("scripts");
        fs::create_dir_all(&scripts).expect("create overlay");
        fs::write(scripts.join("disk_layout.json"), b"{}").expect("write layout");
    }

    #[test]
    fn later_overlay_wins() {
        let temp = TempDir::new().expect("temp dir");
        let a = temp.path().join("overlay-a");
        let b = temp.path().join("overlay-b");
        populate(&a);
        populate(&b);

        let default = temp.path().join("default.json");
        let resolved = resolve_layout_path(&[a, b.clone()], &default);
        assert_eq!(resolved, b.join("scripts/disk_layout.json"));
    }

    #[test]
    fn skips_overlays_without_descriptor() {
        let temp = TempDir::new().expect("temp dir");
        let a = temp.path().join("overlay-a");
        let b = temp.path().join("overlay-b");
        populate(&a);
        fs::create_dir_all(&b).expect("create overlay");

        let default = temp.path().join("default.json");
        let resolved = resolve_layout_path(&[a.clone(), b], &default);
        assert_eq!(resolved, a.join("scripts/disk_layout.json"));
    }

    #[test]
    fn falls_back_to_default() {
        let temp = TempDir::new().expect("temp dir");
        let default = temp.path().join("default.json");
        let overlays = [temp.path().join("overlay-a")];
        assert_eq!(resolve_layout_path(&overlays, &default), default);
    }

    #[test]
    fn board_overlay_naming() {
        let roots = [PathBuf::from("src/overlays")];
        assert_eq!(
            board_overlays(&roots, "kukui"),
            [PathBuf::from("src/overlays/overlay-kukui")]
        );
        assert_eq!(
            board_overlays(&roots, ""),
            [PathBuf::from("src/overlays/overlay-default")]
        );
    }
}
