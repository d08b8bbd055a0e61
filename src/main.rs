use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tiltdeck::config::GameConfig;
use tiltdeck::feedback::tracing_sinks::{TracingAudioSink, TracingHapticSink};
use tiltdeck::feedback::FeedbackDispatcher;
use tiltdeck::game::engine::RoundEngine;
use tiltdeck::game::models::{Card, Deck, EngineState};
use tiltdeck::motion::motion_handle::MotionHandle;
use tiltdeck::motion::scripted_source::ScriptedSource;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    GameConfig::ensure_default_config().await?;
    let config = GameConfig::load().await?;
    info!("Loaded config from {}", GameConfig::config_path().display());

    let source = Arc::new(ScriptedSource::new(config.sensor.clone()));
    source.loop_script(demo_script(&source));

    let (motion, channels) = MotionHandle::new(source.clone(), config.classifier.clone());

    let mut errors = channels.errors;
    tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            error!("Sensor error: {}", e);
        }
    });

    let feedback = FeedbackDispatcher::new(
        Arc::new(TracingAudioSink::default()),
        Arc::new(TracingHapticSink::default()),
        config.feedback.clone(),
    );

    let engine = RoundEngine::new(config.round.clone(), motion, channels.events, feedback);

    let mut snapshots = engine.subscribe();
    engine.start_round(Arc::new(demo_deck()));
    engine.start_game_loop();

    loop {
        snapshots
            .changed()
            .await
            .map_err(|e| eyre!("Round engine went away: {}", e))?;

        let snapshot = snapshots.borrow_and_update().clone();
        match snapshot.state {
            EngineState::Buffer(count) => info!("Get ready: {}", count),
            EngineState::Finished => break,
            _ => {
                if let Some(round) = &snapshot.round {
                    debug!(
                        "{:.1}s left, score {}, card {:?}",
                        round.time_remaining,
                        round.score,
                        round.current_card.as_ref().map(|c| c.text.as_str())
                    );
                }
            }
        }
    }

    let result = engine
        .result()
        .ok_or_else(|| eyre!("Round finished without a result"))?;

    info!(
        "Result on {}: {} correct, {} passed, accuracy {:.0}%, rank {:?}",
        result.date.format("%Y-%m-%d %H:%M"),
        result.score,
        result.passed,
        result.accuracy() * 100.0,
        result.rank()
    );

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// A player who guesses, rests, then passes, over and over
fn demo_script(source: &ScriptedSource) -> Vec<f64> {
    [
        (0.05, 2.0),
        (1.0, 0.6),
        (0.0, 1.5),
        (-0.95, 0.5),
        (0.1, 1.8),
        (0.9, 0.4),
    ]
    .into_iter()
    .flat_map(|(angle, seconds)| source.segment(angle, Duration::from_secs_f64(seconds)))
    .collect()
}

fn demo_deck() -> Deck {
    let words = [
        "Lighthouse",
        "Tax Return",
        "Saxophone",
        "Sourdough",
        "Eclipse",
        "Trampoline",
        "Submarine",
        "Crossword",
        "Volcano",
        "Karaoke",
        "Compass",
        "Origami",
    ];

    let cards = words
        .iter()
        .enumerate()
        .map(|(i, word)| Card::new(format!("demo-{i}"), *word))
        .collect();

    Deck::new("demo", "Demo Deck", cards)
}
