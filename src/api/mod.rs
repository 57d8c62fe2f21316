pub mod handlers;
pub mod routes;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::tts::CharacterInfo;

#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "character_id")]
    pub character: Option<String>,
}

/// Characters are named by strings, but any other JSON value is forwarded
/// as its JSON text so the engine reports it as an unknown character.
fn character_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(id) => Some(id),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<CharacterInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> SynthesisRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_character_forms() {
        assert_eq!(parse(r#"{"text": "hi"}"#).character, None);
        assert_eq!(parse(r#"{"text": "hi", "character": null}"#).character, None);
        assert_eq!(
            parse(r#"{"text": "hi", "character": "alba"}"#).character.as_deref(),
            Some("alba")
        );
        assert_eq!(
            parse(r#"{"text": "hi", "character": 5}"#).character.as_deref(),
            Some("5")
        );
        assert_eq!(
            parse(r#"{"text": "hi", "character": ["a"]}"#).character.as_deref(),
            Some(r#"["a"]"#)
        );
    }
}
