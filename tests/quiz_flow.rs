// Plays a level end to end against a silent audio session

use std::sync::Arc;
use std::time::Duration;

use trivia_sound::audio_system::{
    AssetRef, AudioSessionManager, SessionOptions, SilentBackend, SoundCatalog, SoundEvent,
};
use trivia_sound::quiz::{self, Advance, AnswerResult, QuizSession};
use trivia_sound::{EffectName, SoundTuning};

const DOCUMENT: &str = r#"{
    "media": { "intro": "robot.mp4" },
    "levels": [
        {
            "id": "geo",
            "title": "Geography",
            "questions": [
                { "questionText": "Capital of Peru?", "options": ["Lima", "Quito"], "correctAnswerIndex": 0 },
                { "question": "Longest river?", "answers": ["Amazon", "Nile"], "answer": "nile" }
            ]
        },
        { "title": "Empty" }
    ]
}"#;

fn silent_session() -> AudioSessionManager {
    AudioSessionManager::create(
        Arc::new(SilentBackend),
        SoundCatalog::new(AssetRef::bytes("background", Vec::new()), |name| {
            AssetRef::bytes(name.as_str(), Vec::new())
        }),
        SessionOptions::default().with_tuning(SoundTuning {
            duck_restore_ms: 20,
            ..SoundTuning::default()
        }),
    )
}

#[test]
fn test_level_played_end_to_end() {
    let levels = quiz::parse_document(DOCUMENT).unwrap();
    let level = quiz::find_level(&levels, Some("lvl1")).cloned().unwrap();
    assert_eq!(level.id, "geo");

    let sounds = silent_session();
    sounds.initialize();
    let (events, _) = sounds.subscribe();

    let mut session = QuizSession::new(level).unwrap();

    assert!(session.select(1, &sounds));
    assert_eq!(session.submit(&sounds), Some(AnswerResult::Wrong));
    assert_eq!(session.next(&sounds), Some(Advance::NextQuestion(1)));

    assert!(session.select(1, &sounds));
    assert_eq!(session.submit(&sounds), Some(AnswerResult::Correct));
    assert_eq!(session.next(&sounds), Some(Advance::Finished { score: 1, total: 2 }));

    // The wrong-answer cue was played ducked through the worker
    let mut saw_wrong = false;
    while let Ok(event) = events.recv_timeout(Duration::from_secs(3)) {
        if event == (SoundEvent::EffectPlayed { name: EffectName::Wrong, volume: 0.8 }) {
            saw_wrong = true;
        }
        if matches!(event, SoundEvent::MusicRestored { .. }) && saw_wrong {
            break;
        }
    }
    assert!(saw_wrong);

    sounds.dispose();
}

#[test]
fn test_level_without_questions_is_rejected() {
    let levels = quiz::parse_document(DOCUMENT).unwrap();
    let empty = quiz::find_level(&levels, Some("lvl2")).cloned().unwrap();
    assert!(QuizSession::new(empty).is_err());
}
