use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Settings;
use crate::resource::NameFormat;

pub mod dict;
pub mod export_xml;
pub mod list;
pub mod retarget;
pub mod strings;

/// Resource type as hex, with or without `0x`
fn parse_type(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("Invalid resource type '{s}': {e}"))
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the resources of a package
    List {
        /// Package file
        package: PathBuf,

        /// Only list resources of this type (hex, e.g. 220557DA)
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        type_id: Option<u32>,

        /// Resource name convention: s4pe, colon or maxis
        #[arg(short, long, default_value = "s4pe")]
        format: NameFormat,
    },

    /// Print the strings of a package or a .stbl file
    Strings {
        /// Package or .stbl file
        path: PathBuf,

        /// Only print tables in this locale (e.g. ENG_US)
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// Export every string table of a package as XML
    ExportXml {
        /// Package file
        package: PathBuf,

        /// Output directory
        output: PathBuf,
    },

    /// Write the source-language tables of a package re-keyed to another locale
    Retarget {
        /// Package file
        package: PathBuf,

        /// Output package
        output: PathBuf,

        /// Destination locale (defaults to the configured one)
        #[arg(long)]
        to: Option<String>,

        /// Normalize groups to the `8xxxxxxx` form
        #[arg(long)]
        highbit: bool,
    },

    /// Print the records of a dictionary
    Dict {
        /// Dictionary file (.dct)
        file: PathBuf,

        /// Only print records whose source contains this text
        #[arg(short, long)]
        query: Option<String>,
    },
}

impl Commands {
    pub fn execute(&self, mut settings: Settings) -> anyhow::Result<()> {
        match self {
            Commands::List {
                package,
                type_id,
                format,
            } => list::execute(package, *type_id, *format),
            Commands::Strings { path, locale } => {
                strings::execute(path, locale.as_deref(), &settings)
            }
            Commands::ExportXml { package, output } => export_xml::execute(package, output),
            Commands::Retarget {
                package,
                output,
                to,
                highbit,
            } => {
                if let Some(to) = to {
                    settings.translation.destination.clone_from(to);
                }
                if *highbit {
                    settings.group.original = false;
                    settings.group.highbit = true;
                }
                retarget::execute(package, output, &settings)
            }
            Commands::Dict { file, query } => dict::execute(file, query.as_deref()),
        }
    }
}
