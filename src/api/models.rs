use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// A podcast or an episode as rendered on a card, queued, or loaded into
/// the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "feedImage")]
    pub fallback_image_url: Option<String>,
    /// Unix seconds.
    #[serde(default, alias = "datePublished")]
    pub published_at: Option<i64>,
    #[serde(default)]
    pub enclosure_url: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

impl MediaItem {
    /// The image to show for this item: its own artwork, else the feed's.
    pub fn display_image(&self) -> Option<&str> {
        [&self.image_url, &self.fallback_image_url]
            .into_iter()
            .flatten()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
    }

    /// Key used to decide whether two queue entries are the same episode.
    pub fn dedup_key(&self) -> &str {
        &self.title
    }
}

/// Podcast entry of a search response.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "id_string")]
    pub itunes_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl", alias = "artwork")]
    pub image: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default, alias = "newestItemPublishedAt")]
    pub newest_item_pubdate: Option<i64>,
}

impl Feed {
    /// Identifier to pass back when listing this feed's episodes.
    pub fn feed_id(&self) -> &str {
        if self.itunes_id.is_empty() {
            &self.id
        } else {
            &self.itunes_id
        }
    }

    pub fn to_media_item(&self) -> MediaItem {
        MediaItem {
            id: self.feed_id().to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image.clone(),
            fallback_image_url: None,
            published_at: self.newest_item_pubdate,
            enclosure_url: None,
            episode_count: Some(self.episode_count),
        }
    }
}

/// Episode entry of an episodes response.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default, alias = "feedImageUrl")]
    pub feed_image: Option<String>,
    #[serde(default)]
    pub date_published: Option<i64>,
    #[serde(default)]
    pub enclosure_url: Option<String>,
}

impl Episode {
    pub fn to_media_item(&self) -> MediaItem {
        MediaItem {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image.clone(),
            fallback_image_url: self.feed_image.clone(),
            published_at: self.date_published,
            enclosure_url: self.enclosure_url.clone(),
            episode_count: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EpisodesResponse {
    #[serde(default)]
    pub items: Vec<Episode>,
}

/// Podcast cards for a search response: feeds without episodes are skipped
/// and only the first feed of each title is kept.
pub fn podcast_cards(feeds: &[Feed]) -> Vec<MediaItem> {
    let mut titles = HashSet::new();
    feeds
        .iter()
        .filter(|feed| feed.episode_count > 0)
        .filter(|feed| titles.insert(feed.title.clone()))
        .map(Feed::to_media_item)
        .collect()
}

pub fn episode_cards(items: &[Episode]) -> Vec<MediaItem> {
    items.iter().map(Episode::to_media_item).collect()
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
        Missing(()),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
        RawId::Missing(()) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_accepts_numeric_ids_and_both_field_spellings() {
        let json = r#"{
            "feeds": [
                {"id": 75075, "title": "Rust Radio", "description": "d",
                 "image": "https://img/rr.png", "episodeCount": 12,
                 "newestItemPubdate": 1700000000, "itunesId": 1234},
                {"id": "abc", "title": "Other", "imageUrl": "https://img/o.png",
                 "episodeCount": 3, "newestItemPublishedAt": 1600000000, "itunesId": null}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.feeds[0].id, "75075");
        assert_eq!(response.feeds[0].feed_id(), "1234");
        assert_eq!(response.feeds[1].feed_id(), "abc");
        assert_eq!(response.feeds[1].image.as_deref(), Some("https://img/o.png"));
        assert_eq!(response.feeds[1].newest_item_pubdate, Some(1_600_000_000));
    }

    #[test]
    fn podcast_cards_drop_empty_and_repeated_feeds() {
        let feed = |title: &str, count: u32| Feed {
            id: title.to_lowercase(),
            title: title.to_string(),
            episode_count: count,
            ..Feed::default()
        };
        let cards = podcast_cards(&[
            feed("Alpha", 4),
            feed("Empty", 0),
            feed("Alpha", 9),
            feed("Beta", 1),
        ]);
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "Beta"]);
        assert_eq!(cards[0].episode_count, Some(4));
    }

    #[test]
    fn episode_image_falls_back_to_feed_image() {
        let json = r#"{"items": [
            {"id": 1, "title": "Ep", "image": "", "feedImage": "https://img/feed.png",
             "datePublished": 1700000000, "enclosureUrl": "https://cdn/ep.mp3"}
        ]}"#;
        let response: EpisodesResponse = serde_json::from_str(json).unwrap();
        let cards = episode_cards(&response.items);
        assert_eq!(cards[0].display_image(), Some("https://img/feed.png"));
        assert_eq!(cards[0].enclosure_url.as_deref(), Some("https://cdn/ep.mp3"));

        let bare = MediaItem::default();
        assert_eq!(bare.display_image(), None);
    }

    #[test]
    fn stored_queue_entries_accept_raw_api_field_names() {
        let json = r#"{"id": 9, "title": "Ep", "image": "i.png", "feedImage": "f.png",
                       "datePublished": 5, "enclosureUrl": "a.mp3"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "9");
        assert_eq!(item.image_url.as_deref(), Some("i.png"));
        assert_eq!(item.fallback_image_url.as_deref(), Some("f.png"));
        assert_eq!(item.published_at, Some(5));
    }
}
