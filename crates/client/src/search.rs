//! Keyword search within the current deck.

use crate::backend::NotesBackend;
use deck_notes_core::{Error, Result, SearchHit, TextNormalizer};

/// Largest `top_k` the backend accepts.
pub const MAX_TOP_K: usize = 20;

/// Search `deck_id` for `query`, returning at most `top_k` ranked hits.
///
/// Fails with a validation error, without contacting the backend, when no
/// deck is loaded or the query is blank. An empty result is not an error.
pub async fn search(
    backend: &dyn NotesBackend,
    deck_id: Option<&str>,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>> {
    let deck_id = deck_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::validation("upload a deck before searching"))?;

    let normalizer = TextNormalizer::new();
    let query = normalizer
        .normalize_query(query)
        .ok_or_else(|| Error::validation("enter a search keyword"))?;
    let top_k = top_k.clamp(1, MAX_TOP_K);

    log::debug!("Searching deck {} for {:?} (top {})", deck_id, query, top_k);
    let mut hits = backend.search(deck_id, &query, top_k).await?;
    hits.truncate(top_k);
    for hit in &mut hits {
        hit.snippet = normalizer.snippet(&hit.snippet);
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, DECK_ID};

    fn backend() -> ScriptedBackend {
        ScriptedBackend::with_slides(&[(1, "Cell biology"), (2, "Genetics"), (3, "Cell division")])
    }

    #[tokio::test]
    async fn test_missing_deck_is_validation_error() {
        let backend = backend();
        let err = search(&backend, None, "cell", 5).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = search(&backend, Some("  "), "cell", 5).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_never_hits_network() {
        let backend = backend();
        for query in ["", "   ", "\n\t"] {
            let err = search(&backend, Some(DECK_ID), query, 5).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_hits_are_returned_with_clean_snippets() {
        let backend = backend();
        let hits = search(&backend, Some(DECK_ID), "  cell ", 5).await.unwrap();
        let indices: Vec<u32> = hits.iter().map(|h| h.slide_index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(!hits[0].snippet.contains('\n'));
        assert_eq!(hits[0].snippet, "Cell biology point 1");
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let backend = backend();
        let hits = search(&backend, Some(DECK_ID), "astronomy", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_is_clamped() {
        let backend = backend();
        let hits = search(&backend, Some(DECK_ID), "cell", 0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = backend();
        let err = search(&backend, Some("unknown"), "cell", 5).await.unwrap_err();
        assert_eq!(err.message(), "ppt_id not found");
    }
}
