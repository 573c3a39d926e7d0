use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Where board overlays are searched and which descriptor to fall back to
/// when no overlay provides one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Overlay search roots, in precedence order (later overrides earlier)
    #[serde(default = "default_overlay_roots")]
    pub overlay_roots: Vec<PathBuf>,

    /// Descriptor used when no overlay provides one
    #[serde(default = "default_layout_path")]
    pub default_layout: PathBuf,
}

fn default_overlay_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("overlays")]
}

fn default_layout_path() -> PathBuf {
    PathBuf::from("build/disk_layout.json")
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            overlay_roots: default_overlay_roots(),
            default_layout: default_layout_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutConfig>,
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(force: bool) -> anyhow::Result<()> {
        use std::io::Write;

        let config_path = ".imgtool.toml";

        // Check if file already exists
        if std::path::Path::new(config_path).exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                config_path
            );
        }

        let config_content = Self::generate_full_config();

        let mut file = fs::File::create(config_path)?;
        file.write_all(config_content.as_bytes())?;

        info!("Configuration file generated: {}", config_path);
        info!("Please edit this file to customize layout resolution");
        Ok(())
    }

    pub fn generate_full_config() -> String {
        let config = AppConfig {
            layout: Some(LayoutConfig::default()),
        };
        let toml_content = toml::to_string_pretty(&config).unwrap();
        format!(
            "# imgtool configuration file\n# All fields are optional, command line arguments override config file values\n\n{}",
            toml_content
        )
    }
}
