use anyhow::{anyhow, bail, Result};
use dialoguer::Confirm;
use std::path::Path;
use std::process::Command;

pub fn parse_size(input: &str) -> Result<u64> {
    let s = input.trim();
    if s.is_empty() {
        bail!("size is empty");
    }

    let (num_str, unit) = s.split_at(s.len().saturating_sub(1));
    let (value, multiplier) = match unit.to_ascii_lowercase().as_str() {
        "k" => (num_str, 1024u64),
        "m" => (num_str, 1024u64 * 1024),
        "g" => (num_str, 1024u64 * 1024 * 1024),
        _ => (s, 1u64),
    };

    let num: u64 = value
        .parse()
        .map_err(|_| anyhow!("invalid size: {input}"))?;
    Ok(num.saturating_mul(multiplier))
}

pub fn confirm_or_yes(yes: bool, prompt: &str) -> Result<()> {
    if yes {
        return Ok(());
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| anyhow!("prompt failed: {e}"))?;
    if confirmed {
        Ok(())
    } else {
        bail!("aborted by user")
    }
}

/// Run an external command, surfacing its stderr on failure.
pub fn run_checked(cmd: &mut Command) -> Result<()> {
    let rendered = render(cmd);
    let output = cmd
        .output()
        .map_err(|e| anyhow!("failed to spawn {rendered}: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{rendered} failed ({}): {}", output.status, stderr.trim());
    }
    Ok(())
}

fn render(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    out
}

/// Commands that need root (mount, umount, the embedded table writer, dd
/// against a root-owned device) go through sudo unless we already are root.
pub fn root_cmd(program: &str) -> Command {
    if is_root() {
        Command::new(program)
    } else {
        let mut cmd = Command::new("sudo");
        cmd.arg(program);
        cmd
    }
}

fn is_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    // /proc/<pid> is owned by the effective uid of the process.
    std::fs::metadata("/proc/self")
        .map(|m| m.uid() == 0)
        .unwrap_or(false)
}

pub fn stat_len(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)
        .map_err(|e| anyhow!("failed to stat {}: {e}", path.display()))?
        .len())
}
