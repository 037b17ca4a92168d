use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use trivia_sound::audio_system::{
    AudioBackend, AudioSessionManager, RodioBackend, SessionOptions, SilentBackend, SoundCatalog,
};
use trivia_sound::quiz::{self, Advance, AnswerResult, Level, QuizSession};
use trivia_sound::{
    AppResult, EffectName, PlayOptions, PlayOutcome, PrefsStore, QuizError, SoundConfig,
};

const LOG_TARGET_STARTUP: &str = "trivia_quiz::startup";

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/TriviaQuiz/logs/trivia-quiz.YYYY-MM-DD.log`.
/// Debug builds also log to the console.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = SoundConfig::config_dir().join("logs");

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "trivia-quiz.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!(target: LOG_TARGET_STARTUP, "Log directory: {}", log_dir.display());
}

#[derive(Parser, Debug)]
#[command(name = "trivia-quiz", about = "Terminal trivia quiz with sound")]
struct CliArgs {
    /// Path to the sound configuration JSON file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read levels from a local JSON file instead of the level server.
    #[arg(long = "file")]
    levels_file: Option<PathBuf>,

    /// Start this level directly (id or 1-based position).
    #[arg(long)]
    level: Option<String>,
}

fn build_sound_session(config: &SoundConfig) -> AudioSessionManager {
    let store = PrefsStore::default_location();
    let prefs = match store.load() {
        Ok(Some(prefs)) => prefs,
        Ok(None) => config.prefs,
        Err(e) => {
            tracing::warn!("Ignoring stored sound preferences: {}", e);
            config.prefs
        }
    };

    // The quiz stays usable without an audio device
    let backend: Arc<dyn AudioBackend> = match RodioBackend::new() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!("No audio output, continuing silently: {}", e);
            Arc::new(SilentBackend)
        }
    };

    AudioSessionManager::create(
        backend,
        SoundCatalog::from_dir(&config.assets_dir),
        SessionOptions::from_config(config)
            .with_prefs(prefs)
            .with_store(store),
    )
}

fn main() -> AppResult<()> {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting trivia-quiz v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => SoundConfig::load_from(path),
        None => SoundConfig::load(),
    }
    .unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {}", e);
        SoundConfig::default()
    });

    let sounds = build_sound_session(&config);
    sounds.initialize();

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let result = match load_levels(&args, &config, &mut input) {
        Ok(Some(levels)) => match args.level.as_deref() {
            Some(id) => quiz::find_level(&levels, Some(id))
                .cloned()
                .ok_or_else(|| anyhow::Error::from(QuizError::LevelNotFound(id.to_string())))
                .and_then(|level| play_level(level, &sounds, &mut input)),
            None => level_menu(&levels, &sounds, &mut input),
        },
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    sounds.dispose();
    result
}

fn load_levels(
    args: &CliArgs,
    config: &SoundConfig,
    input: &mut impl BufRead,
) -> AppResult<Option<Vec<Level>>> {
    retry_until_loaded(
        || match &args.levels_file {
            Some(path) => quiz::load_levels_file(path),
            None => quiz::fetch_levels(&config.levels_url),
        },
        input,
    )
}

/// Keep loading until it works or the player gives up. `None` means they quit.
fn retry_until_loaded(
    mut load: impl FnMut() -> Result<Vec<Level>, QuizError>,
    input: &mut impl BufRead,
) -> AppResult<Option<Vec<Level>>> {
    loop {
        match load() {
            Ok(levels) => return Ok(Some(levels)),
            Err(e) => {
                tracing::warn!("Loading levels failed: {}", e);
                println!("Could not load the levels: {e}");
            }
        }

        match prompt(input, "[r] retry, [q] quit > ")?.as_deref() {
            Some("r") => continue,
            _ => return Ok(None),
        }
    }
}

fn prompt(input: &mut impl BufRead, text: &str) -> AppResult<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_sound_state(sounds: &AudioSessionManager) {
    let on_off = |muted: bool| if muted { "off" } else { "on" };
    println!(
        "Music: {}   Effects: {}",
        on_off(sounds.music_muted()),
        on_off(sounds.effects_muted())
    );
}

/// Tap first so switching effects off is still heard
fn toggle_effects(sounds: &AudioSessionManager) -> PlayOutcome {
    let tap = sounds.trigger(EffectName::Tap, PlayOptions::default());
    sounds.toggle_effects_muted();
    tap
}

fn level_menu(
    levels: &[Level],
    sounds: &AudioSessionManager,
    input: &mut impl BufRead,
) -> AppResult<()> {
    if levels.is_empty() {
        println!("No levels available.");
        return Ok(());
    }

    loop {
        println!("\nPick a level");
        for (position, level) in levels.iter().enumerate() {
            println!("  {}. {} ({} questions)", position + 1, level.title, level.questions.len());
        }
        print_sound_state(sounds);

        let Some(choice) = prompt(input, "[number] play, [m] music, [s] effects, [q] quit > ")?
        else {
            return Ok(());
        };

        match choice.as_str() {
            "q" => return Ok(()),
            "m" => {
                sounds.trigger(EffectName::Tap, PlayOptions::default());
                sounds.toggle_music_muted();
            }
            "s" => {
                toggle_effects(sounds);
            }
            other => match other.parse::<usize>().ok().and_then(|n| levels.get(n.wrapping_sub(1))) {
                Some(level) => {
                    sounds.trigger(EffectName::Tap, PlayOptions::default());
                    if let Err(e) = play_level(level.clone(), sounds, input) {
                        println!("{e}");
                    }
                }
                None => println!("Unknown choice: {other}"),
            },
        }
    }
}

fn play_level(
    level: Level,
    sounds: &AudioSessionManager,
    input: &mut impl BufRead,
) -> AppResult<()> {
    let mut session = QuizSession::new(level)?;
    println!("\n== {} ==", session.level().title.to_uppercase());

    loop {
        let (position, total) = session.progress();
        let question = session.current().clone();
        println!("\nQuestion {position} of {total}");
        println!("{}", question.text);
        for (index, option) in question.options.iter().enumerate() {
            println!("  {}. {}", index + 1, option);
        }

        let Some(answer) = prompt(input, "Your answer > ")? else {
            return Ok(());
        };
        let picked = answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
        if !picked.is_some_and(|index| session.select(index, sounds)) {
            println!("Pick a number between 1 and {}", question.options.len());
            continue;
        }

        match session.submit(sounds) {
            Some(AnswerResult::Correct) => println!("Correct!"),
            Some(AnswerResult::Wrong) => {
                match question.correct_index.and_then(|index| question.options.get(index)) {
                    Some(answer) => println!("Wrong. The answer was: {answer}"),
                    None => println!("Wrong."),
                }
            }
            None => continue,
        }

        let label = if session.is_last_question() { "finish" } else { "next" };
        if prompt(input, &format!("[enter] {label} > "))?.is_none() {
            return Ok(());
        }

        if let Some(Advance::Finished { score, total }) = session.next(sounds) {
            println!("\nLevel complete! Score: {score} / {total}");
            match prompt(input, "[r] retry, [enter] back to levels > ")?.as_deref() {
                Some("r") => {
                    session.retry();
                    continue;
                }
                _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn silent_sounds() -> AudioSessionManager {
        AudioSessionManager::create(
            Arc::new(SilentBackend),
            SoundCatalog::from_dir(std::path::Path::new("missing-assets")),
            SessionOptions::default(),
        )
    }

    #[test]
    fn test_cli_flags() {
        let args = CliArgs::try_parse_from([
            "trivia-quiz",
            "--file",
            "levels.json",
            "--level",
            "lvl2",
        ])
        .unwrap();
        assert_eq!(args.levels_file, Some(PathBuf::from("levels.json")));
        assert_eq!(args.level.as_deref(), Some("lvl2"));
        assert!(args.config.is_none());

        assert!(CliArgs::try_parse_from(["trivia-quiz", "--volume", "3"]).is_err());
    }

    #[test]
    fn test_failed_load_retried_on_request() {
        let mut attempts = 0;
        let mut input = Cursor::new("r\n");

        let levels = retry_until_loaded(
            || {
                attempts += 1;
                if attempts == 1 {
                    Err(QuizError::Status(503))
                } else {
                    quiz::parse_document(r#"{ "levels": [{ "title": "Warmup" }] }"#)
                }
            },
            &mut input,
        )
        .unwrap();

        assert_eq!(attempts, 2);
        assert_eq!(levels.map(|levels| levels.len()), Some(1));
    }

    #[test]
    fn test_failed_load_gives_up_on_quit() {
        let mut attempts = 0;
        let mut input = Cursor::new("q\n");

        let levels = retry_until_loaded(
            || {
                attempts += 1;
                Err(QuizError::Network("offline".to_string()))
            },
            &mut input,
        )
        .unwrap();

        assert!(levels.is_none());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_muting_effects_still_taps() {
        let sounds = silent_sounds();

        assert_eq!(toggle_effects(&sounds), PlayOutcome::Queued);
        assert!(sounds.effects_muted());

        sounds.dispose();
    }
}
