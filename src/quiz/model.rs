/// Level and question model
///
/// The level document is loosely typed: questions carry their text, options
/// and answer under several alternative field names. Everything is
/// normalised here so the rest of the crate sees one shape.
use serde::Serialize;
use serde_json::Value;

const TEXT_KEYS: [&str; 3] = ["questionText", "question", "text"];
const OPTION_KEYS: [&str; 3] = ["options", "answers", "choices"];
const INDEX_KEYS: [&str; 2] = ["correctAnswerIndex", "correctIndex"];
const ANSWER_KEYS: [&str; 3] = ["correct", "correctAnswer", "answer"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    /// Index of the right option, if the document identifies one
    pub correct_index: Option<usize>,
}

impl Question {
    pub fn from_value(value: &Value) -> Self {
        let text = TEXT_KEYS
            .iter()
            .filter_map(|key| value.get(key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("Question")
            .to_string();

        let options: Vec<String> = OPTION_KEYS
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_array))
            .map(|items| items.iter().filter_map(option_text).collect())
            .unwrap_or_default();

        let correct_index = resolve_correct_index(value, &options);

        Self {
            text,
            options,
            correct_index,
        }
    }

    pub fn is_correct(&self, option: usize) -> bool {
        self.correct_index == Some(option)
    }
}

fn option_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A numeric index wins when present, even if out of range; otherwise the
/// first non-null answer text is matched against the options.
fn resolve_correct_index(value: &Value, options: &[String]) -> Option<usize> {
    if let Some(index) = INDEX_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_f64))
    {
        if index.fract() != 0.0 || index < 0.0 {
            return None;
        }
        let index = index as usize;
        return (index < options.len()).then_some(index);
    }

    let answer = ANSWER_KEYS
        .iter()
        .find_map(|key| value.get(key).filter(|v| !v.is_null()))?
        .as_str()?
        .trim()
        .to_lowercase();

    options
        .iter()
        .position(|option| option.trim().to_lowercase() == answer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

impl Level {
    /// Normalise the level at `position` (0-based) in the document
    pub fn from_value(value: &Value, position: usize) -> Self {
        let id = match value.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("lvl{}", position + 1),
        };

        let title = value
            .get("title")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("LEVEL {}", position + 1));

        let questions = value
            .get("questions")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Question::from_value).collect())
            .unwrap_or_default();

        Self {
            id,
            title,
            questions,
        }
    }
}

/// Levels from a `{ "levels": [...] }` document; anything else yields none
pub fn parse_levels(document: &Value) -> Vec<Level> {
    document
        .get("levels")
        .and_then(Value::as_array)
        .map(|levels| {
            levels
                .iter()
                .enumerate()
                .map(|(position, level)| Level::from_value(level, position))
                .collect()
        })
        .unwrap_or_default()
}

/// Find a level by exact id, falling back to the digits of `id` as a
/// 1-based position. Without an id the first level is returned.
pub fn find_level<'a>(levels: &'a [Level], id: Option<&str>) -> Option<&'a Level> {
    let Some(id) = id else {
        return levels.first();
    };

    if let Some(level) = levels.iter().find(|level| level.id == id) {
        return Some(level);
    }

    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    let position: usize = digits.parse().ok()?;
    position.checked_sub(1).and_then(|index| levels.get(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_field_variants() {
        let q = Question::from_value(&json!({
            "question": "Capital of France?",
            "choices": ["Rome", "Paris", "Madrid"],
            "correctIndex": 1
        }));
        assert_eq!(q.text, "Capital of France?");
        assert_eq!(q.options.len(), 3);
        assert_eq!(q.correct_index, Some(1));
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn test_answer_text_matched_case_insensitively() {
        let q = Question::from_value(&json!({
            "questionText": "2 + 2?",
            "options": ["three", " Four ", "five"],
            "correctAnswer": "four"
        }));
        assert_eq!(q.correct_index, Some(1));
    }

    #[test]
    fn test_numeric_index_takes_precedence() {
        let q = Question::from_value(&json!({
            "text": "Pick",
            "answers": ["a", "b"],
            "correctAnswerIndex": 0,
            "answer": "b"
        }));
        assert_eq!(q.correct_index, Some(0));
    }

    #[test]
    fn test_out_of_range_index_has_no_answer() {
        let q = Question::from_value(&json!({
            "text": "Pick",
            "options": ["a", "b"],
            "correctIndex": 5,
            "answer": "a"
        }));
        assert_eq!(q.correct_index, None);
    }

    #[test]
    fn test_empty_question_defaults() {
        let q = Question::from_value(&json!({ "questionText": "" }));
        assert_eq!(q.text, "Question");
        assert!(q.options.is_empty());
        assert_eq!(q.correct_index, None);
    }

    #[test]
    fn test_parse_levels_defaults() {
        let doc = json!({
            "media": {},
            "levels": [
                { "id": "easy", "title": "Easy", "questions": [{ "text": "q" }] },
                { "questions": "not a list" },
                { "id": 7 }
            ]
        });
        let levels = parse_levels(&doc);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].id, "easy");
        assert_eq!(levels[0].questions.len(), 1);
        assert_eq!(levels[1].id, "lvl2");
        assert_eq!(levels[1].title, "LEVEL 2");
        assert!(levels[1].questions.is_empty());
        assert_eq!(levels[2].id, "7");
    }

    #[test]
    fn test_parse_levels_without_levels_key() {
        assert!(parse_levels(&json!([1, 2, 3])).is_empty());
        assert!(parse_levels(&json!({ "levels": {} })).is_empty());
    }

    #[test]
    fn test_find_level() {
        let doc = json!({ "levels": [{ "id": "easy" }, { "id": "hard" }] });
        let levels = parse_levels(&doc);

        assert_eq!(find_level(&levels, None).map(|l| l.id.as_str()), Some("easy"));
        assert_eq!(find_level(&levels, Some("hard")).map(|l| l.id.as_str()), Some("hard"));
        assert_eq!(find_level(&levels, Some("lvl2")).map(|l| l.id.as_str()), Some("hard"));
        assert!(find_level(&levels, Some("lvl0")).is_none());
        assert!(find_level(&levels, Some("lvl9")).is_none());
        assert!(find_level(&levels, Some("nope")).is_none());
        assert!(find_level(&[], None).is_none());
    }
}
