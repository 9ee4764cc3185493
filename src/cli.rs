use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediaforge")]
#[command(author, version, about = "URL-driven image and video transformation server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding source assets (overrides config)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP transformation server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Parse a transformation URL and print the resulting chain
    Parse {
        /// URL or path, e.g. /image/upload/c_fill,w_200,h_200/photo.jpg
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a transformation URL against local storage into a file
    Render {
        /// URL or path to render
        url: String,

        /// File to write the result to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate,

    /// Display version information
    Version,
}
