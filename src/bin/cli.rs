use anyhow::{Context, Result};
use beatbridge as lib;
use clap::{Parser, Subcommand};
use lib::api::spotify::SpotifyProvider;
use lib::api::youtube::YoutubeProvider;
use lib::api::{http_client, Provider};
use lib::config::Config;
use lib::matcher::TrackMatcher;
use lib::models::{Playlist, PlaylistRef, ProviderKind};
use lib::transfer::Transfer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "beatbridge", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spotify access token
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true, global = true)]
    spotify_token: Option<String>,

    /// Google (YouTube) access token
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    google_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (long-running)
    Serve,
    /// Copy one playlist to the other platform
    Transfer {
        /// Source platform ("spotify" or "youtube")
        #[arg(long)]
        from: String,

        /// Id of the playlist on the source platform
        #[arg(long)]
        playlist_id: String,

        /// Name for the new playlist; defaults to the playlist id
        #[arg(long)]
        playlist_name: Option<String>,
    },
    /// List the user's playlists
    Playlists {
        /// Only list one platform
        #[arg(long)]
        provider: Option<String>,
    },
    /// Validate config file and exit
    ConfigValidate,
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    // --config wins; otherwise the system-wide file, then the repo example,
    // then built-in defaults.
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let etc_path = Path::new("/etc/beatbridge/config.toml");
            let example = Path::new("config/example-config.toml");
            if etc_path.exists() {
                etc_path.to_path_buf()
            } else if example.exists() {
                example.to_path_buf()
            } else {
                return Ok(Config::default());
            }
        }
    };
    Config::from_path(&path).with_context(|| format!("loading config from {}", path.display()))
}

fn build_provider(cfg: &Config, kind: ProviderKind, token: Option<&str>) -> Arc<dyn Provider> {
    let client = http_client(cfg.http_timeout_secs);
    let token = token.unwrap_or_default().trim().to_string();
    match kind {
        ProviderKind::Spotify => Arc::new(SpotifyProvider::with_client(client, token, cfg.spotify_api_base.clone())),
        ProviderKind::Youtube => Arc::new(YoutubeProvider::with_client(client, token, cfg.youtube_api_base.clone())),
    }
}

fn parse_kind(s: &str) -> ProviderKind {
    match ProviderKind::parse(s) {
        Some(k) => k,
        None => {
            eprintln!("Unknown provider '{}'. Expected 'spotify' or 'youtube'.", s);
            std::process::exit(1);
        }
    }
}

async fn fetch_playlists(prov: &dyn Provider) -> Result<Option<Vec<Playlist>>> {
    if !prov.is_authenticated() {
        eprintln!("{} is not connected; pass a token first.", prov.kind().display_name());
        return Ok(None);
    }
    let playlists = prov
        .list_playlists()
        .await
        .with_context(|| format!("listing {} playlists", prov.kind().display_name()))?;
    Ok(Some(playlists))
}

fn print_playlists(kind: ProviderKind, playlists: Option<Vec<Playlist>>) {
    let Some(playlists) = playlists else { return };
    println!("{} ({} playlists):", kind.display_name(), playlists.len());
    for p in playlists {
        println!("- {} ({}, {} tracks)", p.name, p.id, p.track_count);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ConfigValidate = cli.command {
        match resolve_config(cli.config.as_deref()) {
            Ok(_) => {
                println!("Config OK");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Config invalid: {:#}", e);
                std::process::exit(2);
            }
        }
    }

    let cfg = resolve_config(cli.config.as_deref())?;

    // Bridge `log` records into tracing; logs go to stdout and a daily file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "beatbridge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;

    match cli.command {
        Commands::Serve => {
            lib::server::run(cfg).await.context("running server")?;
        }
        Commands::Transfer {
            from,
            playlist_id,
            playlist_name,
        } => {
            let from = parse_kind(&from);
            let to = match from {
                ProviderKind::Spotify => ProviderKind::Youtube,
                ProviderKind::Youtube => ProviderKind::Spotify,
            };
            let token_for = |kind: ProviderKind| match kind {
                ProviderKind::Spotify => cli.spotify_token.as_deref(),
                ProviderKind::Youtube => cli.google_token.as_deref(),
            };
            let transfer = Transfer::new(
                build_provider(&cfg, from, token_for(from)),
                build_provider(&cfg, to, token_for(to)),
                TrackMatcher::new(cfg.matching.clone()),
            )
            .with_description_template(cfg.playlist_description_template.clone());

            let playlist = PlaylistRef {
                name: playlist_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| playlist_id.clone()),
                id: playlist_id,
                owner_provider: from,
            };
            match transfer.run(&playlist).await {
                Ok(result) => {
                    println!(
                        "Created {} playlist {}: {}/{} tracks added",
                        to.display_name(),
                        result.created_playlist_id,
                        result.success,
                        result.total
                    );
                    for f in &result.failed {
                        let artists = f.track.artists.join(", ");
                        println!("  failed: {} - {} ({})", artists, f.track.title, f.reason);
                    }
                }
                Err(e) => {
                    eprintln!("Transfer failed: {}", e.user_message());
                    eprintln!("  cause: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Playlists { provider } => {
            let spotify = build_provider(&cfg, ProviderKind::Spotify, cli.spotify_token.as_deref());
            let youtube = build_provider(&cfg, ProviderKind::Youtube, cli.google_token.as_deref());
            match provider.as_deref().map(parse_kind) {
                Some(kind) => {
                    let prov = if kind == ProviderKind::Spotify { spotify } else { youtube };
                    print_playlists(kind, fetch_playlists(prov.as_ref()).await?);
                }
                None => {
                    let (a, b) =
                        futures::future::join(fetch_playlists(spotify.as_ref()), fetch_playlists(youtube.as_ref())).await;
                    print_playlists(ProviderKind::Spotify, a?);
                    print_playlists(ProviderKind::Youtube, b?);
                }
            }
        }
        Commands::ConfigValidate => {}
    }

    Ok(())
}
