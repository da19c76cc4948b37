use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use codesong_core::{
    builtin_songs, find_song, AppConfig, Banner, CodesongError, KaraokePlayer, Palette, Song,
    Terminal, Tone,
};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use tracing_subscriber::EnvFilter;

const MENU_TONES: [Tone; 4] = [Tone::Cyan, Tone::Green, Tone::Magenta, Tone::Yellow];

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command.unwrap_or(Commands::Menu) {
        Commands::List => run_list(),
        Commands::Play { song, mute } => run_play(config, &song, mute).await,
        Commands::Menu => run_menu(config).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            // Playback failures were already reported on screen by the player.
            if !err.is_playback() {
                let message = format!("❌ {} error: {err}", err.stage());
                eprintln!("{}", Palette::colored().paint(Tone::Red, &message));
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> codesong_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_list() -> codesong_core::Result<ExitCode> {
    for (index, song) in builtin_songs().iter().enumerate() {
        println!("{}. {} ({})", index + 1, song.title, song.slug);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_play(
    config: Option<&Path>,
    query: &str,
    mute: bool,
) -> codesong_core::Result<ExitCode> {
    let config = load_config(config)?;
    let songs = builtin_songs();
    let song = find_song(&songs, query)
        .ok_or_else(|| CodesongError::msg(format!("no song matches `{query}`")))?;

    tracing::info!(song = %song.slug, mute, "starting playback");
    let mut terminal = Terminal::stdout(&config.display)?;
    let player = KaraokePlayer::from_config(config)?;

    let result = if mute {
        player.display_muted(song, &mut terminal).await
    } else {
        player.display(song, &mut terminal).await
    };

    // The runtime waits for blocking device threads on shutdown.
    let stopped = player.stop_detached();
    if stopped > 0 {
        tracing::debug!(stopped, "stopped detached audio");
    }

    result?;
    Ok(ExitCode::SUCCESS)
}

async fn run_menu(config: Option<&Path>) -> codesong_core::Result<ExitCode> {
    let palette = Palette::colored();
    let songs = builtin_songs();

    print_menu(&palette, &songs)?;

    let answer = tokio::task::spawn_blocking(read_choice)
        .await
        .map_err(|err| CodesongError::msg(format!("failed to read choice: {err}")))??;

    let Some(song) = answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|choice| (1..=songs.len()).contains(choice))
        .and_then(|choice| songs.get(choice - 1))
    else {
        println!("{}", palette.paint(Tone::Red, "❌ Invalid choice!"));
        return Ok(ExitCode::FAILURE);
    };

    run_child(&palette, song, config).await
}

fn print_menu(palette: &Palette, songs: &[Song]) -> codesong_core::Result<()> {
    let mut out = io::stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    writeln!(out, "{}", palette.paint(Tone::Cyan, "🎵  Welcome to CodeSong  🎵\n"))?;
    match Banner::standard().and_then(|banner| banner.render("Codesong")) {
        Ok(art) => writeln!(out, "{}", palette.paint(Tone::Magenta, &art))?,
        Err(err) => tracing::warn!(error = %err, "menu banner unavailable"),
    }
    writeln!(out, "{}", palette.paint(Tone::Yellow, "                    by Kenichi Ichi"))?;
    writeln!(out, "{}", palette.paint(Tone::Gray, "         © Copyright 2025 Kenichi Ichi"))?;
    writeln!(out, "{}", palette.paint(Tone::Cyan, &"=".repeat(56)))?;
    writeln!(out, "{}", palette.paint(Tone::Green, "=== Pick a song to play ==="))?;

    for (index, song) in songs.iter().enumerate() {
        let tone = MENU_TONES[index % MENU_TONES.len()];
        writeln!(out, "{}", palette.paint(tone, &format!("{}. {}", index + 1, song.slug)))?;
    }

    write!(out, "{}", palette.paint(Tone::White, "\nEnter your choice: "))?;
    out.flush()?;
    Ok(())
}

fn read_choice() -> codesong_core::Result<String> {
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// Runs the chosen song in a child process and reports how it exited.
async fn run_child(
    palette: &Palette,
    song: &Song,
    config: Option<&Path>,
) -> codesong_core::Result<ExitCode> {
    let exe = std::env::current_exe()?;
    let mut command = tokio::process::Command::new(exe);
    if let Some(path) = config {
        command.arg("--config").arg(path);
    }
    command.arg("play").arg(&song.slug);

    println!(
        "{}",
        palette.paint(Tone::Blue, &format!("\n🚀 Running: {}", song.slug))
    );
    let status = command.status().await?;
    let code = status.code();
    tracing::debug!(song = %song.slug, ?code, "child finished");

    let shown = code.map_or_else(|| "signal".to_string(), |code| code.to_string());
    println!(
        "{}",
        palette.paint(
            Tone::Green,
            &format!("\n✅ Finished {} (exit code: {shown})", song.slug)
        )
    );

    Ok(match code {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal karaoke: typed lyrics in sync with streamed audio", long_about = None)]
struct Cli {
    /// JSON configuration file overriding pacing, gate and display settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the built-in songs.
    List,
    /// Display one song, streaming its audio unless muted.
    Play {
        /// Song number (as shown by `list`) or slug.
        song: String,
        /// Type the lyrics without playing audio.
        #[arg(long)]
        mute: bool,
    },
    /// Interactive picker that runs the chosen song in a child process.
    Menu,
}
