/// Quiz flow for one level: select, submit, advance, retry
use crate::audio_system::{AudioSessionManager, EffectName, PlayOptions};
use crate::error::QuizError;

use super::model::{Level, Question};

/// Where the quiz sends its sound cues
pub trait SoundCues {
    fn cue(&self, name: EffectName, options: PlayOptions);
}

impl SoundCues for AudioSessionManager {
    fn cue(&self, name: EffectName, options: PlayOptions) {
        // Fire-and-forget: input never waits on audio
        let _ = self.trigger(name, options);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerResult {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at this 0-based index
    NextQuestion(usize),
    Finished { score: usize, total: usize },
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    level: Level,
    index: usize,
    selected: Option<usize>,
    revealed: bool,
    score: usize,
    finished: bool,
}

impl QuizSession {
    pub fn new(level: Level) -> Result<Self, QuizError> {
        if level.questions.is_empty() {
            return Err(QuizError::NoQuestions(level.id));
        }
        Ok(Self {
            level,
            index: 0,
            selected: None,
            revealed: false,
            score: 0,
            finished: false,
        })
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn current(&self) -> &Question {
        &self.level.questions[self.index]
    }

    /// (1-based position, total questions)
    pub fn progress(&self) -> (usize, usize) {
        (self.index + 1, self.level.questions.len())
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_last_question(&self) -> bool {
        self.index + 1 >= self.level.questions.len()
    }

    /// Pick an option. Ignored once the answer is revealed.
    pub fn select(&mut self, option: usize, sounds: &impl SoundCues) -> bool {
        if self.finished || self.revealed || option >= self.current().options.len() {
            return false;
        }
        sounds.cue(EffectName::Select, PlayOptions::default());
        self.selected = Some(option);
        true
    }

    /// Check the selected option and reveal the answer
    pub fn submit(&mut self, sounds: &impl SoundCues) -> Option<AnswerResult> {
        if self.finished || self.revealed {
            return None;
        }
        let selected = self.selected?;
        sounds.cue(EffectName::Tap, PlayOptions::default());

        let result = if self.current().is_correct(selected) {
            self.score += 1;
            AnswerResult::Correct
        } else {
            AnswerResult::Wrong
        };

        let effect = match result {
            AnswerResult::Correct => EffectName::Correct,
            AnswerResult::Wrong => EffectName::Wrong,
        };
        sounds.cue(effect, PlayOptions::ducked());

        self.revealed = true;
        Some(result)
    }

    /// Move past a revealed question
    pub fn next(&mut self, sounds: &impl SoundCues) -> Option<Advance> {
        if self.finished || !self.revealed {
            return None;
        }
        sounds.cue(EffectName::Tap, PlayOptions::default());

        if self.is_last_question() {
            self.finished = true;
            return Some(Advance::Finished {
                score: self.score,
                total: self.level.questions.len(),
            });
        }

        self.index += 1;
        self.selected = None;
        self.revealed = false;
        Some(Advance::NextQuestion(self.index))
    }

    /// Start the level over
    pub fn retry(&mut self) {
        self.index = 0;
        self.selected = None;
        self.revealed = false;
        self.score = 0;
        self.finished = false;
    }
}
