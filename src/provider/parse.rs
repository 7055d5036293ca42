use std::collections::HashSet;

use serde_json::Value;

use super::GenerationError;

pub fn extract_tokens(content: &str) -> Result<Vec<String>, GenerationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    let value = match serde_json::from_str::<Value>(content) {
        Ok(value) => value,
        Err(_) => embedded_object(content)
            .ok_or_else(|| GenerationError::Parse("no JSON object in response".into()))?,
    };
    let list = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("emojis").or_else(|| map.get("items")) {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        },
        _ => return Err(GenerationError::Parse("unexpected JSON shape".into())),
    };
    Ok(list
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

fn embedded_object(content: &str) -> Option<Value> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

pub fn take_unique(tokens: Vec<String>, count: usize) -> Result<Vec<String>, GenerationError> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();
    if unique.len() < count {
        return Err(GenerationError::TooFew {
            got: unique.len(),
            expected: count,
        });
    }
    unique.truncate(count);
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_accepted_shape() {
        assert_eq!(extract_tokens(r#"["a","b"]"#).unwrap(), vec!["a", "b"]);
        assert_eq!(extract_tokens(r#"{"emojis":["a"]}"#).unwrap(), vec!["a"]);
        assert_eq!(extract_tokens(r#"{"items":["x","y"]}"#).unwrap(), vec!["x", "y"]);
        let fenced = "Sure!\n```json\n{\"emojis\": [\"🐙\", \"🦑\"]}\n```";
        assert_eq!(extract_tokens(fenced).unwrap(), vec!["🐙", "🦑"]);
        assert!(extract_tokens(r#"{"other":[1]}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(extract_tokens("   "), Err(GenerationError::EmptyResponse)));
        assert!(matches!(extract_tokens("no json here"), Err(GenerationError::Parse(_))));
        assert!(matches!(extract_tokens("42"), Err(GenerationError::Parse(_))));
    }

    #[test]
    fn take_unique_dedupes_and_truncates() {
        let raw = vec![" a ".into(), "b".into(), "a".into(), "".into(), "c".into(), "d".into()];
        assert_eq!(take_unique(raw, 3).unwrap(), vec!["a", "b", "c"]);

        let short = vec!["a".into(), "a".into(), "b".into()];
        match take_unique(short, 3) {
            Err(GenerationError::TooFew { got, expected }) => assert_eq!((got, expected), (2, 3)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
