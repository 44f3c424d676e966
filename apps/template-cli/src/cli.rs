//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tmplctl")]
#[command(version, about = "Parse document templates and manage their field schemas")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a template and print its schema
    Parse {
        /// The .docx or .odt template
        template: PathBuf,
        /// Flattened template text produced by the converter
        #[arg(long)]
        text: PathBuf,
        /// Identifier recorded in the schema (defaults to the file stem)
        #[arg(long)]
        template_id: Option<String>,
    },

    /// Parse a template and print the legacy field list
    Legacy {
        template: PathBuf,
        #[arg(long)]
        text: PathBuf,
        #[arg(long)]
        template_id: Option<String>,
    },

    /// Re-parse a template and replace the stored schema
    Reparse {
        /// Classification the schema is stored under
        id: String,
        template: PathBuf,
        #[arg(long)]
        text: PathBuf,
    },

    /// Print the stored schema
    Show { id: String },

    /// Print field count and repeater names of the stored schema
    Summary { id: String },

    /// Remove the stored schema
    Delete { id: String },

    /// Rebuild a document blob from submitted values and the stored schema
    Fill {
        id: String,
        /// JSON object mapping slugs to strings or item lists
        values: PathBuf,
        /// Currently stored blob of the document
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Encode a JSON array of field values into a blob
    Encode { values: PathBuf },

    /// Decode a blob into a JSON object keyed by slug
    Decode { blob: PathBuf },
}
