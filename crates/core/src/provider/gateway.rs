//! Gateway-level search with mode fallback.

use tracing::debug;

use crate::search::SearchResult;

use super::{Provider, ProviderError, ProviderSearchRequest, SearchMode};

/// Run one provider search, retrying once in the other mode when the
/// first pass comes back empty and the provider opts into fallback.
///
/// A season-only manual search never falls back to per-episode queries;
/// the caller asked for packs specifically.
pub async fn search_with_fallback(
    provider: &dyn Provider,
    req: &ProviderSearchRequest,
) -> Result<Vec<SearchResult>, ProviderError> {
    let hits = provider.search(req).await?;
    if !hits.is_empty() {
        return Ok(hits);
    }

    if !provider.config().search_fallback {
        return Ok(hits);
    }
    if req.manual && req.mode == SearchMode::Season {
        return Ok(hits);
    }

    let flipped = req.flipped();
    debug!(
        provider = %provider.config().id,
        from = ?req.mode,
        to = ?flipped.mode,
        "empty result set, retrying in fallback mode"
    );
    provider.search(&flipped).await
}
