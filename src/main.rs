use anyhow::Result;
use clap::{Parser, Subcommand};
use imgtool::config::AppConfig;
use imgtool::disk;
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgtool")]
#[command(about = "Disk layout and image assembly tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective disk layout descriptor path for a board
    ResolveLayout {
        /// Board name (empty selects the default board)
        #[arg(long, default_value = "", value_name = "BOARD")]
        board: String,
    },

    /// Query a disk layout descriptor
    Layout {
        #[command(subcommand)]
        action: disk::LayoutAction,
    },

    /// Generate pack/unpack partition scripts from a built image
    EmitScripts {
        /// Disk image with a written partition table
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Directory receiving the generated scripts
        #[arg(long, default_value = ".", value_name = "DIR")]
        output: PathBuf,
    },

    /// Show the partition table of an image
    Show {
        /// Disk image path
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Machine-parsable rows instead of the human-readable dump
        #[arg(short, long)]
        quiet: bool,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Assemble a bootable disk image from sub-images
    Build(disk::BuildCli),

    /// Generate configuration file (.imgtool.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    // Try to load configuration file
    let config_path = ".imgtool.toml";
    let app_config = if std::path::Path::new(config_path).exists() {
        match AppConfig::load_from_file(config_path) {
            Ok(cfg) => {
                let abs_path = std::fs::canonicalize(config_path)
                    .unwrap_or_else(|_| std::path::PathBuf::from(config_path));
                info!("Using configuration file: {}", abs_path.display());
                Some(cfg)
            }
            Err(e) => {
                error!("Failed to load configuration file: {}, using defaults", e);
                None
            }
        }
    } else {
        None
    };

    match cli.command {
        Commands::ResolveLayout { board } => {
            disk::commands::resolve::run(
                &board,
                app_config.as_ref().and_then(|c| c.layout.as_ref()),
            )?;
        }

        Commands::Layout { action } => {
            disk::commands::query::run(action)?;
        }

        Commands::EmitScripts { image, output } => {
            let (pack, unpack) = disk::commands::emit::emit_scripts(&image, &output)?;
            println!("{}", pack.display());
            println!("{}", unpack.display());
        }

        Commands::Show { image, quiet, json } => {
            disk::commands::show::show(&image, quiet, json)?;
        }

        Commands::Build(args) => {
            disk::commands::build::build_image(&args)?;
        }

        Commands::Genconfig { force } => {
            if let Err(e) = AppConfig::generate_config_file(force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
