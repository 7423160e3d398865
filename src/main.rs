use anyhow::{Context, Result};
use catalog_importer::{artwork, load_catalog, Pid, Record};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog-importer")]
#[command(about = "Read a legacy jukebox catalog and dump its records", long_about = None)]
struct Args {
    /// Catalog file (.itl, .musicdb or .xml)
    catalog: PathBuf,

    /// Print every record as a JSON line instead of a summary
    #[arg(long)]
    json: bool,

    /// Look up cover art for a persistent id (16-digit hex)
    #[arg(long, value_name = "PID")]
    artwork: Option<String>,

    /// Home directory holding the artwork caches
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Write the looked-up artwork JPEG here
    #[arg(long, value_name = "FILE", requires = "artwork")]
    artwork_out: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("Loading catalog {:?}", args.catalog);

    let mut library_pid: Option<Pid> = None;
    let mut tracks = 0usize;
    let mut playlists = 0usize;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for item in load_catalog(&args.catalog) {
        let record = item.with_context(|| format!("failed to load {:?}", args.catalog))?;
        match &record {
            Record::Library(lib) => {
                if library_pid.is_none() {
                    library_pid = lib.persistent_id;
                }
            }
            Record::Track(_) => tracks += 1,
            Record::Playlist(_) => playlists += 1,
        }
        if args.json {
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }

    log::info!("Catalog loaded: {} tracks, {} playlists", tracks, playlists);

    if let Some(pid_hex) = args.artwork {
        let pid = Pid::from_hex(&pid_hex)
            .with_context(|| format!("invalid persistent id {pid_hex:?}"))?;
        let library_pid =
            library_pid.context("catalog carries no library persistent id for artwork lookup")?;
        let home = match args.home {
            Some(dir) => dir,
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .context("no home directory; pass --home")?,
        };

        let source = artwork::open_source(&home, library_pid)?;
        let jpeg = source
            .jpeg(pid)
            .with_context(|| format!("no artwork for {pid}"))?;
        match args.artwork_out {
            Some(path) => {
                std::fs::write(&path, &jpeg)
                    .with_context(|| format!("failed to write {path:?}"))?;
                log::info!("Wrote {} bytes of artwork to {:?}", jpeg.len(), path);
            }
            None => log::info!("Found {} bytes of artwork for {}", jpeg.len(), pid),
        }
    }

    Ok(())
}
