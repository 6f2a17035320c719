use clap::{Parser, Subcommand};
use sheet_player::{
    assets::{
        provisioner::{asset_path, is_present},
        registry::resolve_assets,
    },
    server, Config, ConvertProgress, MusicConverter, Reporter, Toolchain,
};
use std::{fs, path::PathBuf, process, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheet-player")]
#[command(about = "Turn sheet music scans into playable audio", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, env = "SHEET_PLAYER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web UI
    Serve {
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Convert one PDF/PNG/JPG to MP3 without the UI
    Convert {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "sheet_music.mp3")]
        output: PathBuf,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Download assets and relocate the engine ahead of the first request
    Prepare {
        #[arg(short, long)]
        quiet: bool,
    },

    /// List registry assets and whether they are cached
    Assets,
}

fn main() {
    let cli = Cli::parse();

    let quiet = matches!(
        cli.command,
        Commands::Convert { quiet: true, .. } | Commands::Prepare { quiet: true }
    );
    init_tracing(quiet);

    let result = Config::load(cli.config.as_deref())
        .map_err(Into::into)
        .and_then(|config| match cli.command {
            Commands::Serve { bind } => handle_serve(config, bind),
            Commands::Convert {
                input,
                output,
                quiet,
            } => handle_convert(config, input, output, quiet),
            Commands::Prepare { quiet } => handle_prepare(config, quiet),
            Commands::Assets => handle_assets(config),
        });

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn handle_serve(mut config: Config, bind: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let tools = Toolchain::from_config(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(Arc::new(config), tools))?;
    Ok(())
}

fn handle_convert(
    config: Config,
    input: PathBuf,
    output: PathBuf,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    let bytes = fs::read(&input)?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !quiet {
        eprintln!("🎼 Sheet Player");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Input:  {}", input.display());
        eprintln!("Output: {}", output.display());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!();
    }

    let tools = Toolchain::from_config(&config)?;
    let mut converter = MusicConverter::new(Arc::new(config), tools);
    if !quiet {
        converter = converter.with_reporter(progress_printer());
    }

    let result = converter.convert(&bytes, &file_name)?;
    fs::copy(&result.mp3_path, &output)?;

    if !quiet {
        eprintln!();
        eprintln!("✅ Done!");
        if let Some(secs) = result.duration_secs {
            eprintln!("  Duration:  {:.1}s", secs);
        }
        eprintln!("  MusicXML:  {}", result.musicxml_path.display());
        eprintln!("  MIDI:      {}", result.midi_path.display());
    }
    println!("{}", output.display());

    Ok(())
}

fn handle_prepare(config: Config, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let tools = Toolchain::from_config(&config)?;
    let mut converter = MusicConverter::new(Arc::new(config), tools);
    if !quiet {
        converter = converter.with_reporter(progress_printer());
    }

    let soundfont = converter.setup_environment()?;

    if !quiet {
        eprintln!("✅ Environment ready");
        eprintln!("  SoundFont: {}", soundfont.display());
        eprintln!(
            "  Engine:    {}",
            converter.config().engine_dir()?.display()
        );
    }
    Ok(())
}

fn handle_assets(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let assets = resolve_assets(&config.assets)?;
    let data_dir = config.data_dir()?;
    let engine_dir = config.engine_dir()?;

    eprintln!("📋 Assets");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for spec in &assets {
        let path = asset_path(spec, &data_dir, &engine_dir);
        let marker = if is_present(spec, &path) { "✔" } else { "✘" };
        eprintln!("  {} {:<10} {}", marker, spec.name, path.display());
        eprintln!("      {}", spec.url);
    }
    Ok(())
}

fn progress_printer() -> Reporter {
    Arc::new(|progress: ConvertProgress| match progress {
        ConvertProgress::Stage { label, .. } => eprintln!("⏳ {}", label),
        ConvertProgress::Download { asset, done, total } => {
            if total > 0 {
                let percent = (done as f64 / total as f64 * 100.0).round() as u64;
                eprint!(
                    "\r📥 Downloading {}: {:>3}% ({:.2} MB / {:.2} MB)",
                    asset,
                    percent,
                    done as f64 / 1_000_000.0,
                    total as f64 / 1_000_000.0
                );
                if done >= total {
                    eprintln!();
                }
            } else {
                eprint!("\r📥 Downloading {}: {:.2} MB", asset, done as f64 / 1_000_000.0);
            }
        }
        ConvertProgress::Finished { .. } => {}
        ConvertProgress::Failed { message } => eprintln!("❌ Failed: {}", message),
    })
}
