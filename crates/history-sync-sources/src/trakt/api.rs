use history_sync_models::{CatalogCandidate, MediaKind, SyncMode, SyncPayload};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::http::body_text;
use crate::traits::TransportResponse;

pub const API_BASE_URL: &str = "https://api.trakt.tv";
const SERVICE: &str = "trakt";

#[derive(Debug, Deserialize)]
struct TraktIds {
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraktTitle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    ids: Option<TraktIds>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    movie: Option<TraktTitle>,
    #[serde(default)]
    show: Option<TraktTitle>,
}

#[derive(Debug, Deserialize)]
struct UserSettings {
    user: SettingsUser,
}

#[derive(Debug, Deserialize)]
struct SettingsUser {
    username: String,
}

/// Parse `/search/{type}` results, keeping the service's ranking order.
pub fn parse_search_results(body: &str, kind: MediaKind) -> Result<Vec<CatalogCandidate>, SourceError> {
    let results: Vec<SearchResult> =
        serde_json::from_str(body).map_err(|e| SourceError::decode(SERVICE, e))?;

    let candidates = results
        .into_iter()
        .filter_map(|r| match kind {
            MediaKind::Movie => r.movie,
            MediaKind::Show => r.show,
        })
        .map(|t| CatalogCandidate {
            title: t.title.unwrap_or_default(),
            year: t.year,
            slug: t.ids.and_then(|ids| ids.slug).filter(|s| !s.is_empty()),
        })
        .collect();
    Ok(candidates)
}

/// Text search: `GET /search/{movie|show}?query=...`
/// Reference: https://trakt.docs.apiary.io/#reference/search/text-query/get-text-query-results
pub async fn search(
    client: &Client,
    base_url: &str,
    client_id: &str,
    query: &str,
    kind: MediaKind,
) -> Result<Vec<CatalogCandidate>, SourceError> {
    let url = format!(
        "{}/search/{}?query={}",
        base_url,
        kind.as_str(),
        urlencoding::encode(query)
    );

    let response = client
        .get(&url)
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    let body = body_text(response).await;
    if !status.is_success() {
        warn!("Trakt search failed for '{}': HTTP {}", query, status);
        return Err(SourceError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body,
        });
    }

    let candidates = parse_search_results(&body, kind)?;
    debug!(query = %query, kind = %kind, results = candidates.len(), "Trakt search");
    Ok(candidates)
}

/// `POST /sync/history` or `/sync/watchlist`. The status is returned, not judged.
pub async fn post_sync(
    client: &Client,
    base_url: &str,
    access_token: &str,
    client_id: &str,
    target: SyncMode,
    payload: &SyncPayload,
) -> Result<TransportResponse, SourceError> {
    let url = format!("{}/sync/{}", base_url, target.endpoint());

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = body_text(response).await;
    Ok(TransportResponse { status, body })
}

/// Username of the token owner, via `GET /users/settings`.
pub async fn get_username(
    client: &Client,
    base_url: &str,
    access_token: &str,
    client_id: &str,
) -> Result<String, SourceError> {
    let response = client
        .get(format!("{}/users/settings", base_url))
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id)
        .send()
        .await?;

    let status = response.status();
    let body = body_text(response).await;
    if !status.is_success() {
        return Err(SourceError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body,
        });
    }

    let settings: UserSettings =
        serde_json::from_str(&body).map_err(|e| SourceError::decode(SERVICE, e))?;
    Ok(settings.user.username)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_BODY: &str = r#"[
        {"type": "show", "score": 1000, "show": {"title": "Example", "year": 2019, "ids": {"trakt": 1, "slug": "example"}}},
        {"type": "show", "score": 900, "show": {"title": "Example Again", "year": null, "ids": {"trakt": 2}}},
        {"type": "movie", "score": 800, "movie": {"title": "Example Movie", "year": 2020, "ids": {"slug": "example-movie"}}}
    ]"#;

    #[test]
    fn test_parse_search_results_by_kind() {
        let shows = parse_search_results(SEARCH_BODY, MediaKind::Show).unwrap();
        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].slug.as_deref(), Some("example"));
        assert_eq!(shows[0].year, Some(2019));
        assert_eq!(shows[1].slug, None);
        assert_eq!(shows[1].year, None);

        let movies = parse_search_results(SEARCH_BODY, MediaKind::Movie).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Example Movie");
    }

    #[test]
    fn test_parse_search_results_invalid() {
        assert!(parse_search_results("[]", MediaKind::Movie).unwrap().is_empty());
        assert!(parse_search_results("{\"error\": true}", MediaKind::Movie).is_err());
    }
}
