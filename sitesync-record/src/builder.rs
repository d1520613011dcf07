//! Map a validated post onto the `site.standard.document` wire record.

use chrono::SecondsFormat;

use sitesync_core::{BlogPost, RemoteRecord, SiteId, DOCUMENT_COLLECTION};

use crate::error::RecordError;
use crate::key::parse_publish_date;

/// Build the wire record for `post`, published under `site`.
///
/// Deterministic: the only timestamp is the one taken from `post.date`.
pub fn build_record(post: &BlogPost, site: &SiteId) -> Result<RemoteRecord, RecordError> {
    let published_at = parse_publish_date(&post.date)?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    Ok(RemoteRecord {
        record_type: DOCUMENT_COLLECTION.to_string(),
        site: site.clone(),
        path: post.path.clone(),
        title: post.title.clone(),
        description: Some(post.description.clone()),
        tags: post.tags.clone(),
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> BlogPost {
        BlogPost {
            title: "Hello".to_string(),
            date: "2024-03-15".to_string(),
            description: "First post".to_string(),
            slug: "hello-world".to_string(),
            path: "/blog/hello-world".to_string(),
            excerpt: Some("An excerpt".to_string()),
            author: Some("sam".to_string()),
            tags: Some(vec!["rust".to_string()]),
            draft: false,
        }
    }

    fn site() -> SiteId {
        SiteId::from("https://example.dev")
    }

    #[test]
    fn maps_every_field() {
        let record = build_record(&post(), &site()).expect("build");
        assert_eq!(record.record_type, "site.standard.document");
        assert_eq!(record.site, site());
        assert_eq!(record.path, "/blog/hello-world");
        assert_eq!(record.title, "Hello");
        assert_eq!(record.description.as_deref(), Some("First post"));
        assert_eq!(record.tags, Some(vec!["rust".to_string()]));
    }

    #[test]
    fn date_only_is_widened_to_midnight_utc() {
        let record = build_record(&post(), &site()).expect("build");
        assert_eq!(record.published_at, "2024-03-15T00:00:00.000Z");
    }

    #[test]
    fn date_time_keeps_its_instant() {
        let mut p = post();
        p.date = "2024-03-15T10:30:00+02:00".to_string();
        let record = build_record(&p, &site()).expect("build");
        assert_eq!(record.published_at, "2024-03-15T08:30:00.000Z");
    }

    #[test]
    fn empty_description_is_sent_as_is() {
        let mut p = post();
        p.description.clear();
        let record = build_record(&p, &site()).expect("build");
        assert_eq!(record.description.as_deref(), Some(""));

        p.excerpt = None;
        let json = serde_json::to_value(build_record(&p, &site()).expect("build")).expect("json");
        assert_eq!(json["description"], "");
    }

    #[test]
    fn building_twice_is_identical() {
        let p = post();
        assert_eq!(
            build_record(&p, &site()).expect("first"),
            build_record(&p, &site()).expect("second")
        );
    }

    #[test]
    fn unparsable_date_is_an_error() {
        let mut p = post();
        p.date = "someday".to_string();
        assert!(matches!(
            build_record(&p, &site()),
            Err(RecordError::InvalidDate { .. })
        ));
    }
}
