use chrono::NaiveDateTime;
use history_sync_models::{InterestEntry, MediaKind, SubjectId};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;
use crate::http::body_text;
use crate::traits::SubjectDetail;

pub const REXXAR_BASE_URL: &str = "https://m.douban.com/rexxar/api/v2";
const MOBILE_REFERER: &str = "https://m.douban.com/mine/movie";
const CREATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SERVICE: &str = "douban";

/// Keys of the mobile subject document that may carry the user's own mark time.
const DETAIL_TIME_KEYS: [&str; 4] = ["interest", "user_interest", "activity", "activities"];

#[derive(Debug, Deserialize)]
struct InterestsPage {
    #[serde(default)]
    interests: Vec<RawInterest>,
}

#[derive(Debug, Deserialize)]
struct RawInterest {
    #[serde(default)]
    subject: Option<RawSubject>,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubject {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Parse a feed timestamp. Only full `YYYY-MM-DD HH:MM:SS` values count.
pub fn parse_create_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), CREATE_TIME_FORMAT).ok()
}

// Subject ids show up both as strings and as bare numbers.
fn subject_id_from_value(value: &Value) -> Option<SubjectId> {
    match value {
        Value::String(s) => SubjectId::new(s.as_str()),
        Value::Number(n) => SubjectId::new(n.to_string()),
        _ => None,
    }
}

/// Turn one feed page body into interest entries.
pub fn parse_interests_page(body: &str, status: &str) -> Result<Vec<InterestEntry>, SourceError> {
    let page: InterestsPage =
        serde_json::from_str(body).map_err(|e| SourceError::decode(SERVICE, e))?;

    let mut entries = Vec::with_capacity(page.interests.len());
    for item in page.interests {
        let Some(subject) = item.subject else {
            continue;
        };
        let Some(subject_id) = subject.id.as_ref().and_then(subject_id_from_value) else {
            continue;
        };
        let Some(created_at) = item.create_time.as_deref().and_then(parse_create_time) else {
            debug!(subject_id = %subject_id, "Skipping interest without a usable create_time");
            continue;
        };
        entries.push(InterestEntry {
            subject_id,
            status: status.to_string(),
            kind: subject.kind.as_deref().and_then(MediaKind::from_source_label),
            created_at,
        });
    }
    Ok(entries)
}

/// Create time of a single-interest document, if it has one.
pub fn parse_single_interest(body: &str) -> Option<SubjectDetail> {
    let doc: Value = serde_json::from_str(body).ok()?;
    let created_at = doc
        .get("create_time")
        .and_then(Value::as_str)
        .and_then(parse_create_time)?;
    let kind = doc
        .get("subject")
        .and_then(|s| s.get("type"))
        .and_then(Value::as_str)
        .and_then(MediaKind::from_source_label);
    Some(SubjectDetail {
        kind,
        created_at: Some(created_at),
    })
}

/// Type and (when present) the user's mark time from a mobile subject document.
pub fn parse_subject_document(body: &str) -> Option<SubjectDetail> {
    let doc: Value = serde_json::from_str(body).ok()?;
    let kind = doc
        .get("type")
        .and_then(Value::as_str)
        .and_then(MediaKind::from_source_label);

    let created_at = DETAIL_TIME_KEYS.iter().find_map(|key| match doc.get(*key) {
        Some(Value::Object(obj)) => obj
            .get("create_time")
            .and_then(Value::as_str)
            .and_then(parse_create_time),
        Some(Value::Array(items)) => items.iter().find_map(|it| {
            it.get("create_time")
                .and_then(Value::as_str)
                .and_then(parse_create_time)
        }),
        _ => None,
    });

    Some(SubjectDetail { kind, created_at })
}

pub async fn get_interests(
    client: &Client,
    base_url: &str,
    user_id: &str,
    status: &str,
    start: u32,
    count: u32,
) -> Result<Vec<InterestEntry>, SourceError> {
    let url = format!("{}/user/{}/interests", base_url, urlencoding::encode(user_id));
    let response = client
        .get(&url)
        .query(&[
            ("status", status.to_string()),
            ("start", start.to_string()),
            ("count", count.to_string()),
        ])
        .header("Referer", MOBILE_REFERER)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status_code = response.status();
    let body = body_text(response).await;
    if !status_code.is_success() {
        return Err(SourceError::Status {
            service: SERVICE,
            status: status_code.as_u16(),
            body,
        });
    }

    parse_interests_page(&body, status)
}

/// `GET /user/{uid}/interest?subject_id=X`. Non-200 answers mean "nothing here".
pub async fn get_user_interest(
    client: &Client,
    base_url: &str,
    user_id: &str,
    subject: &SubjectId,
) -> Result<Option<SubjectDetail>, SourceError> {
    let url = format!("{}/user/{}/interest", base_url, urlencoding::encode(user_id));
    let response = client
        .get(&url)
        .query(&[("subject_id", subject.as_str())])
        .header("Referer", MOBILE_REFERER)
        .header("Accept", "application/json")
        .send()
        .await?;

    if response.status().as_u16() != 200 {
        debug!(subject_id = %subject, status = %response.status(), "Single interest lookup unavailable");
        return Ok(None);
    }
    Ok(parse_single_interest(&body_text(response).await))
}

/// `GET /subject/{sid}?for_mobile=1`.
pub async fn get_mobile_subject(
    client: &Client,
    base_url: &str,
    subject: &SubjectId,
) -> Result<Option<SubjectDetail>, SourceError> {
    let url = format!("{}/subject/{}", base_url, urlencoding::encode(subject.as_str()));
    let response = client
        .get(&url)
        .query(&[("for_mobile", "1")])
        .header("Accept", "application/json")
        .send()
        .await?;

    if response.status().as_u16() != 200 {
        debug!(subject_id = %subject, status = %response.status(), "Mobile subject lookup unavailable");
        return Ok(None);
    }
    Ok(parse_subject_document(&body_text(response).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_interests_page() {
        let body = r#"{
            "count": 3, "start": 0, "total": 3,
            "interests": [
                {"create_time": "2020-01-05 21:00:00", "subject": {"id": "1234567", "type": "tv"}},
                {"create_time": "2019-12-31 08:15:00", "subject": {"id": 7654321, "type": "movie"}},
                {"create_time": "", "subject": {"id": "42", "type": "movie"}},
                {"create_time": "2019-01-01 00:00:00", "subject": {"type": "movie"}},
                {"create_time": "2019-01-01 00:00:00"}
            ]
        }"#;

        let entries = parse_interests_page(body, "done").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject_id.as_str(), "1234567");
        assert_eq!(entries[0].kind, Some(MediaKind::Show));
        assert_eq!(entries[0].created_at, at(2020, 1, 5, 21, 0, 0));
        assert_eq!(entries[0].status, "done");
        assert_eq!(entries[1].subject_id.as_str(), "7654321");
        assert_eq!(entries[1].kind, Some(MediaKind::Movie));
    }

    #[test]
    fn test_parse_interests_page_empty_and_invalid() {
        assert!(parse_interests_page("{}", "done").unwrap().is_empty());
        assert!(parse_interests_page(r#"{"interests": []}"#, "wish").unwrap().is_empty());
        assert!(matches!(
            parse_interests_page("<html>", "done"),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn test_parse_create_time_requires_seconds() {
        assert_eq!(parse_create_time(" 2023-07-28 21:32:11 "), Some(at(2023, 7, 28, 21, 32, 11)));
        assert_eq!(parse_create_time("2023-07-28"), None);
        assert_eq!(parse_create_time("2023-07-28 21:32"), None);
    }

    #[test]
    fn test_parse_single_interest() {
        let detail = parse_single_interest(
            r#"{"create_time": "2023-07-28 21:32:11", "subject": {"type": "movie"}}"#,
        )
        .unwrap();
        assert_eq!(detail.created_at, Some(at(2023, 7, 28, 21, 32, 11)));
        assert_eq!(detail.kind, Some(MediaKind::Movie));

        assert!(parse_single_interest(r#"{"msg": "not found"}"#).is_none());
        assert!(parse_single_interest("not json").is_none());
    }

    #[test]
    fn test_parse_subject_document_time_keys() {
        let object_form = r#"{"type": "tv", "interest": {"create_time": "2022-02-02 10:00:00"}}"#;
        let detail = parse_subject_document(object_form).unwrap();
        assert_eq!(detail.kind, Some(MediaKind::Show));
        assert_eq!(detail.created_at, Some(at(2022, 2, 2, 10, 0, 0)));

        let list_form = r#"{"type": "movie", "activities": [{"create_time": "bad"}, {"create_time": "2021-03-04 05:06:07"}]}"#;
        let detail = parse_subject_document(list_form).unwrap();
        assert_eq!(detail.created_at, Some(at(2021, 3, 4, 5, 6, 7)));

        let no_time = r#"{"type": "movie", "interest": null}"#;
        let detail = parse_subject_document(no_time).unwrap();
        assert_eq!(detail.kind, Some(MediaKind::Movie));
        assert_eq!(detail.created_at, None);
    }
}
