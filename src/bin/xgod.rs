use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xgod::convert::{ConvertOptions, Progress, convert};
use xgod::god::layout::FileLayout;

/// Convert an Xbox 360 disc image into a Games on Demand package.
#[derive(Debug, Parser)]
#[command(name = "xgod", version, about)]
struct Args {
    /// Disc image to read.
    source: PathBuf,

    /// Directory the package is written under.
    dest: PathBuf,

    /// Title shown on the console (defaults to the title ID).
    #[arg(long, short = 't')]
    game_title: Option<String>,

    /// PNG to embed as the package icon.
    #[arg(long)]
    icon: Option<PathBuf>,

    /// Only convert the part of the volume that holds files.
    #[arg(long)]
    trim: bool,

    /// Print what would be written without writing it.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let icon = args
        .icon
        .as_ref()
        .map(|path| fs::read(path).with_context(|| format!("reading icon {}", path.display())))
        .transpose()?;

    let image = File::open(&args.source)
        .with_context(|| format!("opening {}", args.source.display()))?;

    let options = ConvertOptions {
        dest_dir: args.dest,
        game_title: args.game_title,
        icon,
        trim: args.trim,
        dry_run: args.dry_run,
    };

    let mut last_percent = None;
    let summary = convert(BufReader::new(image), &options, |event| match event {
        Progress::PartStarted { index, count } => println!("part {} of {}", index + 1, count),
        Progress::BlocksWritten { done, total } => {
            let percent = done * 100 / total.max(1);
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                println!("{percent:3}%");
            }
        }
        Progress::Finished => println!("done"),
    })
    .with_context(|| format!("converting {}", args.source.display()))?;

    print_summary(&summary.layout, summary.part_count, summary.parts_total_size);
    if options.dry_run {
        info!("dry run, nothing written");
    }

    Ok(())
}

fn print_summary(layout: &FileLayout, part_count: u64, parts_total_size: u64) {
    println!("title id:   {}", layout.title_id_hex());
    println!("media id:   {}", layout.media_id_hex());
    println!("header:     {}", layout.con_header_file_path().display());
    println!("data:       {}", layout.data_dir_path().display());
    println!("parts:      {part_count} ({parts_total_size} bytes)");
}
