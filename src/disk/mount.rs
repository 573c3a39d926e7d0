use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use super::utils::{root_cmd, run_checked};

/// Scoped read-only loop mount. The mount is released when the guard goes
/// out of scope, so every exit path out of a step that mounts an image
/// unmounts it again.
pub struct MountGuard {
    mountpoint: PathBuf,
    mounted: bool,
}

impl MountGuard {
    pub fn mount_ro_loop(image: &Path, mountpoint: &Path) -> Result<Self> {
        let mut cmd = root_cmd("mount");
        cmd.arg("-o").arg("loop,ro").arg(image).arg(mountpoint);
        run_checked(&mut cmd)
            .map_err(|e| anyhow!("failed to mount {}: {e}", image.display()))?;
        Ok(Self {
            mountpoint: mountpoint.to_path_buf(),
            mounted: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.mountpoint
    }

    /// Explicit release, surfacing unmount errors to the caller.
    pub fn unmount(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }
        self.mounted = false;
        let mut cmd = root_cmd("umount");
        cmd.arg(&self.mountpoint);
        run_checked(&mut cmd)
            .map_err(|e| anyhow!("failed to unmount {}: {e}", self.mountpoint.display()))
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if self.mounted
            && let Err(e) = self.release()
        {
            warn!("{e}");
        }
    }
}
