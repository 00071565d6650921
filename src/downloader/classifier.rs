// Request classifier - decides single item vs collection from probe metadata

use serde::Deserialize;

use super::errors::ProbeError;
use super::models::{MediaKind, ProbeResult};
use super::traits::MediaFetcher;

/// Subset of the fetcher's metadata document the classifier looks at
#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(rename = "_type")]
    kind: Option<String>,
    title: Option<String>,
    playlist_count: Option<u64>,
    entries: Option<Vec<serde_json::Value>>,
}

/// Probe `url` without downloading and classify it.
pub async fn classify(fetcher: &dyn MediaFetcher, url: &str) -> Result<ProbeResult, ProbeError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ProbeError::InvalidUrl("URL is empty".to_string()));
    }

    tracing::debug!(fetcher = fetcher.name(), url, "probing");
    let metadata = fetcher.probe(url).await?;
    let result = interpret(metadata)?;

    tracing::info!(
        url,
        collection = result.is_collection(),
        entries = ?result.entry_count,
        title = result.title.as_deref().unwrap_or("<untitled>"),
        "classified"
    );
    Ok(result)
}

/// Turn a metadata document into a [`ProbeResult`].
pub fn interpret(metadata: serde_json::Value) -> Result<ProbeResult, ProbeError> {
    if !metadata.is_object() {
        return Err(ProbeError::Parse(
            "probe response is not a JSON object".to_string(),
        ));
    }

    let response: ProbeResponse = serde_json::from_value(metadata)
        .map_err(|e| ProbeError::Parse(format!("Invalid probe response: {}", e)))?;

    let title = response.title.filter(|t| !t.trim().is_empty());

    if response.kind.as_deref() == Some("playlist") {
        let entry_count = response
            .playlist_count
            .or_else(|| response.entries.as_ref().map(|e| e.len() as u64));

        return Ok(ProbeResult {
            kind: MediaKind::Collection {
                title: title.clone(),
            },
            title,
            entry_count,
        });
    }

    Ok(ProbeResult {
        kind: MediaKind::Single,
        title,
        entry_count: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn playlist_type_is_a_collection() {
        let result = interpret(json!({
            "_type": "playlist",
            "title": "Mix1",
            "entries": [{"title": "a"}, {"title": "b"}]
        }))
        .unwrap();

        assert_eq!(
            result.kind,
            MediaKind::Collection {
                title: Some("Mix1".to_string())
            }
        );
        assert_eq!(result.entry_count, Some(2));
    }

    #[test]
    fn playlist_count_wins_over_entries() {
        let result = interpret(json!({
            "_type": "playlist",
            "title": "Set",
            "playlist_count": 12,
            "entries": []
        }))
        .unwrap();
        assert_eq!(result.entry_count, Some(12));
    }

    #[test]
    fn video_type_is_single() {
        let result = interpret(json!({"_type": "video", "title": "Song A", "id": "x"})).unwrap();
        assert_eq!(result, ProbeResult::single("Song A"));
    }

    #[test]
    fn missing_discriminator_is_single() {
        let result = interpret(json!({"title": "Track"})).unwrap();
        assert!(!result.is_collection());
    }

    #[test]
    fn blank_collection_title_is_none() {
        let result = interpret(json!({"_type": "playlist", "title": "  "})).unwrap();
        assert!(result.is_collection());
        assert_eq!(result.collection_title(), None);
    }

    #[test]
    fn non_object_is_parse_error() {
        assert!(matches!(interpret(json!([1, 2])), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn wrongly_typed_field_is_parse_error() {
        assert!(matches!(
            interpret(json!({"_type": "playlist", "title": 42})),
            Err(ProbeError::Parse(_))
        ));
    }
}
