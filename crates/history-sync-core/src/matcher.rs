use history_sync_models::{CatalogCandidate, CatalogMatch, MediaKind};
use history_sync_sources::CatalogSearch;
use tracing::{debug, warn};

/// Catalog years within this distance of the hint count as a year match.
pub const YEAR_TOLERANCE: i32 = 1;

/// Resolves titles to the tracking service's slugs through its search.
/// Holds no state between calls; pacing is up to the caller.
pub struct CatalogMatcher<'a> {
    search: &'a dyn CatalogSearch,
}

/// Result of one match call, with the number of remote searches it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAttempt {
    pub catalog_match: Option<CatalogMatch>,
    pub queries: usize,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(search: &'a dyn CatalogSearch) -> Self {
        Self { search }
    }

    /// Search with the normalized title, then once more with the original
    /// title if the first query produced nothing usable.
    pub async fn match_title(
        &self,
        normalized_title: &str,
        original_title: &str,
        year_hint: Option<i32>,
        kind: MediaKind,
    ) -> MatchAttempt {
        let mut queries = 0;
        let mut tried: Vec<&str> = Vec::with_capacity(2);

        for query in [normalized_title.trim(), original_title.trim()] {
            if query.is_empty() || tried.contains(&query) {
                continue;
            }
            tried.push(query);
            queries += 1;

            let candidates = match self.search.search(query, kind).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(query = %query, kind = %kind, error = %e, "Catalog search failed");
                    continue;
                }
            };

            if let Some(found) = choose_candidate(&candidates, year_hint) {
                debug!(query = %query, slug = %found.slug, year = ?found.matched_year, "Catalog match");
                return MatchAttempt {
                    catalog_match: Some(found),
                    queries,
                };
            }
            debug!(query = %query, results = candidates.len(), "No usable catalog candidate");
        }

        MatchAttempt {
            catalog_match: None,
            queries,
        }
    }
}

/// First candidate within the year window of the hint, otherwise the first
/// candidate overall. Candidates without a slug are never chosen.
pub fn choose_candidate(candidates: &[CatalogCandidate], year_hint: Option<i32>) -> Option<CatalogMatch> {
    let with_slug = || {
        candidates
            .iter()
            .filter_map(|c| c.slug.as_deref().map(|slug| (c, slug)))
    };

    let by_year = year_hint.and_then(|hint| {
        with_slug().find(|(c, _)| c.year.is_some_and(|y| (y - hint).abs() <= YEAR_TOLERANCE))
    });

    by_year
        .or_else(|| with_slug().next())
        .map(|(c, slug)| CatalogMatch::new(slug, c.title.clone(), c.year))
}
