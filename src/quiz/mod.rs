/// Quiz data and flow
///
/// Levels come from a remote JSON document; the session walks through one
/// level and cues sounds on the audio session as the player answers.
pub mod loader;
pub mod model;
pub mod session;

pub use loader::{fetch_levels, load_levels_file, parse_document};
pub use model::{find_level, parse_levels, Level, Question};
pub use session::{Advance, AnswerResult, QuizSession, SoundCues};
