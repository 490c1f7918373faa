use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use miette::{Context, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use stage_codec::Context as CodecContext;
use stage_geom::category::OTHER_PROPS;
use stage_geom::{categorize, GeomFile, PropEntry};
use tracing::info;

use crate::commands::{DictionaryArgs, TitleArgs};

#[derive(Subcommand)]
pub enum GeomCommands {
    /// Append the contents of one geometry file to another
    Merge(MergeArgs),
    /// Write a copy holding only the mesh references
    Strip(StripArgs),
    /// List the props of a geometry file by category
    Props(PropsArgs),
}

impl GeomCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            GeomCommands::Merge(merge) => merge.handle(),
            GeomCommands::Strip(strip) => strip.handle(),
            GeomCommands::Props(props) => props.handle(),
        }
    }
}

fn open(path: &Path, title: &TitleArgs) -> Result<GeomFile> {
    GeomFile::open(path, CodecContext::new(title.title))
        .context(format!("parsing {}", path.display()))
}

#[derive(Args)]
pub struct MergeArgs {
    #[command(flatten)]
    title: TitleArgs,

    /// The geometry file merged into
    #[arg(short, long, value_name = "FILE")]
    base: PathBuf,

    /// The geometry file appended to the base
    #[arg(short = 'i', long, value_name = "FILE")]
    other: PathBuf,

    /// Where to write the result, the base is replaced when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only append the mesh references of the other file
    #[arg(short, long)]
    references_only: bool,
}

impl MergeArgs {
    pub fn handle(&self) -> Result<()> {
        let mut geom = open(&self.base, &self.title)?;
        geom.merge_file(&self.other, self.references_only)
            .context(format!("merging {}", self.other.display()))?;

        let output = self.output.as_ref().unwrap_or(&self.base);
        geom.save_as(output, false)?;
        info!(
            "{}: {} meshes, {} references, {} props",
            output.display(),
            geom.meshes.len(),
            geom.references.len(),
            geom.props.len()
        );
        Ok(geom.close()?)
    }
}

#[derive(Args)]
pub struct StripArgs {
    #[command(flatten)]
    title: TitleArgs,

    /// An input geometry file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Where to write the stripped copy
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

impl StripArgs {
    pub fn handle(&self) -> Result<()> {
        let geom = open(&self.file, &self.title)?;
        geom.save_as(&self.output, true)?;
        info!(
            "kept {} references of {}",
            geom.references.len(),
            self.file.display()
        );
        Ok(geom.close()?)
    }
}

#[derive(Args)]
pub struct PropsArgs {
    #[command(flatten)]
    title: TitleArgs,

    #[command(flatten)]
    dictionary: DictionaryArgs,

    /// An input geometry file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only list props whose name contains this text
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

fn print_entries(label: &str, entries: &[PropEntry]) {
    if entries.is_empty() {
        return;
    }

    println!("  {}", label.if_supports_color(Stdout, |t| t.italic()));
    for entry in entries {
        let p = entry.position;
        println!(
            "    {:>4} {:<40} {:>10.2} {:>10.2} {:>10.2}",
            entry.index, entry.name, p.x, p.y, p.z
        );
    }
}

impl PropsArgs {
    pub fn handle(&self) -> Result<()> {
        let dictionary = self.dictionary.load()?;
        let geom = open(&self.file, &self.title)?;

        let center = geom.stage_center(&dictionary);
        println!(
            "{} {:.2} {:.2} {:.2}",
            "Stage centre".if_supports_color(Stdout, |t| t.bold()),
            center.x,
            center.y,
            center.z
        );

        for category in categorize(&geom.props, &dictionary, self.filter.as_deref()) {
            if category.name == OTHER_PROPS {
                println!("{}", category.name.if_supports_color(Stdout, |t| t.bold()));
                print_entries("All", &category.main);
            } else {
                let label = format!("{} Props", category.name);
                println!("{}", label.if_supports_color(Stdout, |t| t.bold()));
                print_entries("Main", &category.main);
                print_entries("Mini", &category.mini);
            }
        }

        Ok(geom.close()?)
    }
}
