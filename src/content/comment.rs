//! Reader comments and the short post listings shown beside an article.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require, BlogPost, ValidationError};

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Comment row
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/blog/{id}/comments`. Posting needs no session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl NewComment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            author: None,
            content: content.into(),
        }
    }

    /// Trimmed and sanitized copy with the author filled in.
    ///
    /// Content that is blank after cleaning is refused.
    pub fn prepare(&self) -> Result<NewComment, ValidationError> {
        let content = ammonia::clean(self.content.trim());
        require("content", &content)?;
        let author = self
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ammonia::clean)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());
        Ok(NewComment {
            author: Some(author),
            content,
        })
    }

    pub fn author(&self) -> &str {
        self.author.as_deref().unwrap_or(ANONYMOUS_AUTHOR)
    }
}

/// Link-sized view of a post for the related and popular sidebars.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub category: String,
    pub likes: i32,
}

impl PostSummary {
    pub const SELECT: &'static str = "id, slug, title, category, likes";
}

impl From<&BlogPost> for PostSummary {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            category: post.category.clone(),
            likes: post.likes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_defaults_author_and_trims() {
        let prepared = NewComment::new("  Lovely view!  ").prepare().unwrap();
        assert_eq!(prepared.content, "Lovely view!");
        assert_eq!(prepared.author(), ANONYMOUS_AUTHOR);

        let named = NewComment {
            author: Some(" Dana ".to_string()),
            content: "Thanks".to_string(),
        };
        assert_eq!(named.prepare().unwrap().author(), "Dana");
    }

    #[test]
    fn test_prepare_rejects_blank_content() {
        for content in ["", "   ", "<script>alert(1)</script>"] {
            let err = NewComment::new(content).prepare().unwrap_err();
            assert_eq!(err.field, "content");
        }
    }

    #[test]
    fn test_prepare_strips_markup() {
        let prepared = NewComment::new("<b>Nice</b><script>x()</script>")
            .prepare()
            .unwrap();
        assert_eq!(prepared.content, "<b>Nice</b>");
    }
}
