use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Volume image file
    #[arg(long, short)]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a blank volume, truncating the image
    Format {
        /// Image size in MiB
        #[arg(long, short, default_value_t = 32)]
        size: u64,
    },
    /// Print the volume geometry and free ratios
    Info,
    /// List every file in the root directory
    Ls,
    /// Copy a host file into the volume
    Add {
        host: PathBuf,

        /// Name inside the volume, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// Print a file to stdout
    Cat { name: String },
    /// Delete a file
    Rm { name: String },
    /// Print the size of a file
    Stat { name: String },
}
