//! Blog posts: cover image, gallery and an embedded author.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require, require_one_of, require_slug, require_sluggable, slugify, Entity, EntityKind, ImageRef, Media, ValidationError};

/// Categories shown on the public blog filter.
pub const BLOG_CATEGORIES: &[&str] = &[
    "Land Development",
    "Real Estate",
    "Building Construction",
    "Interior Design",
];

pub const DEFAULT_BLOG_CATEGORY: &str = "Real Estate";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: String,
}

/// Blog post row
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub is_featured: bool,
    #[sqlx(json)]
    pub cover_image: Option<ImageRef>,
    #[sqlx(json)]
    pub gallery: Vec<ImageRef>,
    #[sqlx(json)]
    pub author: Author,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

/// Full-replace payload for create/update. `likes` is only sent on create;
/// updates leave the counter untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostDraft {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub cover_image: Option<ImageRef>,
    #[serde(default)]
    pub gallery: Vec<ImageRef>,
    #[serde(default)]
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogPostForm {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub featured: bool,
    pub author_name: String,
    pub author_bio: String,
    pub author_avatar: String,
}

impl Default for BlogPostForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            category: DEFAULT_BLOG_CATEGORY.to_string(),
            featured: false,
            author_name: String::new(),
            author_bio: String::new(),
            author_avatar: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entity for BlogPost {
    type Draft = BlogPostDraft;
    type Form = BlogPostForm;
    type Filter = BlogFilter;

    const KIND: EntityKind = EntityKind::BlogPost;

    fn id(&self) -> i64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn main_image(&self) -> Option<&ImageRef> {
        self.cover_image.as_ref()
    }

    fn gallery(&self) -> &[ImageRef] {
        &self.gallery
    }

    fn matches(&self, filter: &BlogFilter) -> bool {
        // Public filtering compares trimmed, case-folded category names.
        filter.category.as_deref().map_or(true, |c| {
            self.category.trim().eq_ignore_ascii_case(c.trim())
        })
    }

    fn to_form(&self) -> BlogPostForm {
        BlogPostForm {
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            featured: self.is_featured,
            author_name: self.author.name.clone(),
            author_bio: self.author.bio.clone(),
            author_avatar: self.author.avatar.clone(),
        }
    }

    fn validate_form(form: &BlogPostForm) -> Result<(), ValidationError> {
        require("title", &form.title)?;
        require_sluggable("title", &form.title)?;
        require_one_of("category", &form.category, BLOG_CATEGORIES)
    }

    fn assemble(form: &BlogPostForm, media: Media, existing: Option<&Self>) -> BlogPostDraft {
        BlogPostDraft {
            slug: slugify(&form.title),
            title: form.title.trim().to_string(),
            excerpt: form.excerpt.clone(),
            content: form.content.clone(),
            category: form.category.clone(),
            is_featured: form.featured,
            cover_image: media.main_image,
            gallery: media.gallery,
            author: Author {
                name: form.author_name.trim().to_string(),
                bio: form.author_bio.clone(),
                avatar: form.author_avatar.trim().to_string(),
            },
            likes: existing.is_none().then_some(0),
        }
    }

    fn prepare_draft(mut draft: BlogPostDraft) -> Result<BlogPostDraft, ValidationError> {
        require("title", &draft.title)?;
        require_slug(&draft.slug)?;
        require_one_of("category", &draft.category, BLOG_CATEGORIES)?;
        draft.content = ammonia::clean(&draft.content);
        Ok(draft)
    }

    fn materialize(id: i64, draft: BlogPostDraft, existing: Option<&Self>) -> Self {
        BlogPost {
            id,
            slug: draft.slug,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            category: draft.category,
            is_featured: draft.is_featured,
            cover_image: draft.cover_image,
            gallery: draft.gallery,
            author: draft.author,
            likes: draft
                .likes
                .or_else(|| existing.map(|e| e.likes))
                .unwrap_or(0),
            created_at: existing.map_or_else(Utc::now, |e| e.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str) -> BlogPostForm {
        BlogPostForm {
            title: title.to_string(),
            author_name: "Ada".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_assemble_new_post_defaults() {
        let draft = BlogPost::assemble(&form("Hello World"), Media::default(), None);
        assert_eq!(draft.slug, "hello-world");
        assert_eq!(draft.likes, Some(0));
        assert_eq!(draft.cover_image, None);
        assert!(draft.gallery.is_empty());
        assert_eq!(draft.category, DEFAULT_BLOG_CATEGORY);
        assert_eq!(draft.author.name, "Ada");
    }

    #[test]
    fn test_assemble_update_leaves_likes_out() {
        let existing = BlogPost::materialize(7, BlogPost::assemble(&form("A"), Media::default(), None), None);
        let draft = BlogPost::assemble(&form("A"), Media::default(), Some(&existing));
        assert_eq!(draft.likes, None);
        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("likes").is_none());
    }

    #[test]
    fn test_materialize_keeps_counter_on_update() {
        let mut existing =
            BlogPost::materialize(7, BlogPost::assemble(&form("A"), Media::default(), None), None);
        existing.likes = 12;
        let draft = BlogPost::assemble(&form("B"), Media::default(), Some(&existing));
        let updated = BlogPost::materialize(7, draft, Some(&existing));
        assert_eq!(updated.likes, 12);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.title, "B");
    }

    #[test]
    fn test_validate_form_requires_title_and_known_category() {
        assert!(BlogPost::validate_form(&form("")).is_err());
        let mut bad = form("Ok");
        bad.category = "Gardening".to_string();
        assert_eq!(BlogPost::validate_form(&bad).unwrap_err().field, "category");
        assert!(BlogPost::validate_form(&form("Ok")).is_ok());
    }

    #[test]
    fn test_prepare_draft_sanitizes_content() {
        let mut draft = BlogPost::assemble(&form("Safe"), Media::default(), None);
        draft.content = "<p>hi</p><script>alert(1)</script>".to_string();
        let prepared = BlogPost::prepare_draft(draft).unwrap();
        assert_eq!(prepared.content, "<p>hi</p>");
    }

    #[test]
    fn test_prepare_draft_rejects_bad_slug() {
        let mut draft = BlogPost::assemble(&form("Safe"), Media::default(), None);
        draft.slug = "Not A Slug".to_string();
        assert_eq!(BlogPost::prepare_draft(draft).unwrap_err().field, "slug");
    }

    #[test]
    fn test_filter_matches_case_insensitively() {
        let post = BlogPost::materialize(1, BlogPost::assemble(&form("A"), Media::default(), None), None);
        let filter = BlogFilter {
            category: Some(" real estate ".to_string()),
        };
        assert!(post.matches(&filter));
        assert!(!post.matches(&BlogFilter {
            category: Some("Interior Design".to_string())
        }));
        assert!(post.matches(&BlogFilter::default()));
    }
}
