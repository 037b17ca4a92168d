use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use super::model::{parse_levels, Level};
use crate::error::QuizError;

/// Fetch and normalise the level document from `url`.
///
/// No retries; callers decide whether to ask again.
pub fn fetch_levels(url: &str) -> Result<Vec<Level>, QuizError> {
    tracing::info!("[levels] Fetching level document from {}", url);

    let user_agent = format!("TriviaQuiz/{}", env!("CARGO_PKG_VERSION"));
    let response = match ureq::get(url)
        .set("User-Agent", &user_agent)
        .set("Cache-Control", "no-store")
        .timeout(Duration::from_secs(10))
        .call()
    {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, _)) => {
            tracing::error!("[levels] Server returned status {}", code);
            return Err(QuizError::Status(code));
        }
        Err(e) => {
            tracing::error!("[levels] Network error: {}", e);
            return Err(QuizError::Network(e.to_string()));
        }
    };

    if response.status() != 200 {
        return Err(QuizError::Status(response.status()));
    }

    let body = response
        .into_string()
        .map_err(|e| QuizError::Network(e.to_string()))?;
    let levels = parse_document(&body)?;

    tracing::info!("[levels] Loaded {} levels", levels.len());
    Ok(levels)
}

/// Read the level document from a local file
pub fn load_levels_file(path: &Path) -> Result<Vec<Level>, QuizError> {
    let body = std::fs::read_to_string(path).map_err(|e| QuizError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_document(&body)
}

pub fn parse_document(body: &str) -> Result<Vec<Level>, QuizError> {
    let document: Value = serde_json::from_str(body).map_err(QuizError::Parse)?;
    Ok(parse_levels(&document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let levels = parse_document(r#"{ "levels": [{ "title": "Warmup" }] }"#).unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].title, "Warmup");
        assert_eq!(levels[0].id, "lvl1");
    }

    #[test]
    fn test_parse_document_rejects_invalid_json() {
        assert!(matches!(parse_document("{ levels"), Err(QuizError::Parse(_))));
    }

    #[test]
    fn test_load_levels_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.json");
        std::fs::write(&path, r#"{ "levels": [{ "id": "a" }, { "id": "b" }] }"#).unwrap();

        let levels = load_levels_file(&path).unwrap();
        assert_eq!(levels.len(), 2);

        let missing = load_levels_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(QuizError::Io { .. })));
    }
}
