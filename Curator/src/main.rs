use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use curatorcatalog::{
    Catalog, CatalogConfigExt, HttpDurationProbe, SearchQueryState, SearchSession, Track,
};
use curatorconfig::{Config, get_config};
use curatorplayer::{PlayerConfigExt, SqliteTrackStore, TRACK_STORE_FILE, TrackStore};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Search the Curator catalog from the command line
#[derive(Parser, Debug)]
#[command(name = "curator", version, about)]
struct Args {
    /// Search terms; without terms, suggested tracks are shown
    query: Vec<String>,

    /// Show the next page of shuffled tracks
    #[arg(long, conflicts_with = "related")]
    shuffle: bool,

    /// Show the tracks related to the first search result
    #[arg(long)]
    related: bool,

    /// Play the first listed track
    #[cfg(feature = "rodio")]
    #[arg(long)]
    play: bool,
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config
            .get_log_min_level()
            .unwrap_or_else(|_| "INFO".to_string());
        EnvFilter::new(level.to_lowercase())
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.get_log_enable_console().unwrap_or(true) {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry.init();
    }
}

fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "--:--".to_string();
    }
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn print_track(index: usize, track: &Track, offline: bool) {
    println!(
        "{:>2}. {} - {} [{}] {}",
        index + 1,
        track.artist,
        track.title,
        format_duration(track.duration),
        if offline { "(offline)" } else { "" }
    );
    println!(
        "    {} bpm, {}, key {}, {}, energy {:.2}",
        track.bpm.round(),
        track.mood,
        track.key,
        track.genre,
        track.energy
    );
}

fn print_state(state: &SearchQueryState, store: &dyn TrackStore) {
    if let Some(notice) = &state.notice {
        println!("{}: {}", notice.title, notice.description);
    }
    if let Some(error) = &state.error {
        eprintln!("{error}");
    }
    for (i, track) in state.tracks.iter().enumerate() {
        let offline = store
            .get(&track.id)
            .ok()
            .flatten()
            .is_some_and(|stored| stored.cached);
        print_track(i, track, offline);
    }
}

#[cfg(feature = "rodio")]
async fn play_until_end(
    store: Arc<SqliteTrackStore>,
    volume: f32,
    track: &Track,
) -> Result<()> {
    use curatorplayer::{AudioTransport, RodioSoundFactory, SourceResolver};
    use std::time::Duration;

    let resolver = SourceResolver::new(store)?;
    let factory = Arc::new(RodioSoundFactory::new(resolver.client().clone()));
    let transport = AudioTransport::new(resolver, factory);
    transport.set_volume(volume);

    let subscription = transport.subscribe(|state| {
        info!(
            playing = state.playing,
            position = state.position.unwrap_or_default(),
            "Playback state changed"
        );
    });

    transport.play(track).await;
    if !transport.current_state().playing {
        warn!("Could not start {}", track.title);
        subscription.unsubscribe();
        return Ok(());
    }
    println!("Playing {} - {} (Ctrl+C to stop)", track.artist, track.title);

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                transport.pause();
                break;
            }
            _ = ticker.tick() => {
                if !transport.current_state().playing {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = get_config();
    init_logging(&config);

    let client = config.catalog_client()?;
    let probe = HttpDurationProbe::with_client(client.http().clone());
    let catalog = Catalog::with_settings(
        Arc::new(client),
        Arc::new(probe),
        config.catalog_settings(),
    );
    let session = SearchSession::new(catalog);

    let store_path = Path::new(&config.get_track_store_dir()?).join(TRACK_STORE_FILE);
    let store = Arc::new(SqliteTrackStore::open(&store_path)?);
    info!(store = %store_path.display(), "Opened track store");

    let query = args.query.join(" ");
    if args.shuffle {
        session.shuffle().await;
    } else {
        session.set_query(&query).await;
        if args.related {
            match session.state().tracks.first().cloned() {
                Some(seed) => {
                    println!("Related to {} - {}:", seed.artist, seed.title);
                    session.fetch_related(&seed).await;
                }
                None => warn!("No track to look up related tracks for"),
            }
        }
    }

    let state = session.state();
    print_state(&state, store.as_ref());

    for track in state.tracks.iter().filter(|t| !t.id.is_empty()) {
        if let Err(e) = store.put(track) {
            warn!("Failed to record {}: {}", track.id, e);
        }
    }

    #[cfg(feature = "rodio")]
    if args.play {
        if let Some(first) = state.tracks.first() {
            play_until_end(store.clone(), config.get_player_volume(), first).await?;
        }
    }

    Ok(())
}
