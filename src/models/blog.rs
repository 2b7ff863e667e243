use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::schedule::DATE_FORMAT;
use super::{RawId, id_of, lenient, non_empty, split_list};

pub const DEFAULT_READ_TIME: &str = "5 min read";
pub const DEFAULT_VIEWS: &str = "0 views";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlog {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub read_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub views: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogAuthor {
    pub name: Option<String>,
    pub role: String,
    pub avatar: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Option<String>,
    pub author: BlogAuthor,
    pub read_time: String,
    pub views: String,
    pub date: String,
    pub tags: Vec<String>,
}

impl Blog {
    /// `today` fills in a missing publication date.
    pub fn from_raw(raw: RawBlog, today: NaiveDate) -> Option<Blog> {
        let id = id_of(&raw.id)?;
        let category = non_empty(raw.category);
        let author_name = non_empty(raw.author);
        let avatar = author_name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "A".to_string());
        let field = category
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "counseling".to_string());
        Some(Blog {
            id,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            content: raw.content.unwrap_or_default(),
            author: BlogAuthor {
                name: author_name,
                role: "Expert".to_string(),
                avatar,
                bio: format!("Expert in {}", field),
            },
            category,
            read_time: non_empty(raw.read_time).unwrap_or_else(|| DEFAULT_READ_TIME.to_string()),
            views: non_empty(raw.views).unwrap_or_else(|| DEFAULT_VIEWS.to_string()),
            date: non_empty(raw.date).unwrap_or_else(|| today.format(DATE_FORMAT).to_string()),
            tags: split_list(raw.tags.as_deref()),
        })
    }
}

/// Editable blog fields. Turned into the wire payload with defaults applied.
#[derive(Debug, Clone, Default)]
pub struct BlogDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub read_time: Option<String>,
    pub views: Option<String>,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPayload {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub read_time: String,
    pub views: String,
    pub date: String,
    pub tags: String,
}

impl BlogDraft {
    pub fn into_payload(self, today: NaiveDate) -> BlogPayload {
        BlogPayload {
            title: self.title,
            description: self.description,
            content: self.content,
            category: self.category,
            author: self.author,
            read_time: non_empty(self.read_time).unwrap_or_else(|| DEFAULT_READ_TIME.to_string()),
            views: non_empty(self.views).unwrap_or_else(|| DEFAULT_VIEWS.to_string()),
            date: self.date.unwrap_or(today).format(DATE_FORMAT).to_string(),
            tags: self.tags.join(", "),
        }
    }
}
