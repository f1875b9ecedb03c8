//! Service projects, grouped by the service they showcase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require, require_one_of, require_slug, require_sluggable, slugify, Entity, EntityKind, ImageRef, Media, ValidationError};

/// Service slugs a project can belong to.
pub const SERVICES: &[&str] = &[
    "real-estate",
    "building-construction",
    "land-development",
    "home-interior-design",
];

pub const PROJECT_CATEGORIES: &[&str] = &["current", "completed", "upcoming"];

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub service: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub overview: String,
    pub details: String,
    pub hero_image: String,
    #[sqlx(json)]
    pub main_image: Option<ImageRef>,
    #[sqlx(json)]
    pub gallery: Vec<ImageRef>,
    pub location: String,
    pub year_completed: String,
    pub project_type: String,
    pub key_features: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub slug: String,
    pub service: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub hero_image: String,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub gallery: Vec<ImageRef>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub year_completed: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub key_features: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectForm {
    pub service: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub overview: String,
    pub details: String,
    pub hero_image: String,
    pub location: String,
    pub year_completed: String,
    pub project_type: String,
    pub key_features: String,
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self {
            service: SERVICES[0].to_string(),
            title: String::new(),
            description: String::new(),
            category: PROJECT_CATEGORIES[0].to_string(),
            overview: String::new(),
            details: String::new(),
            hero_image: String::new(),
            location: String::new(),
            year_completed: String::new(),
            project_type: String::new(),
            key_features: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entity for Project {
    type Draft = ProjectDraft;
    type Form = ProjectForm;
    type Filter = ProjectFilter;

    const KIND: EntityKind = EntityKind::Project;

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
        self.main_image.as_ref()
    }

    fn gallery(&self) -> &[ImageRef] {
        &self.gallery
    }

    fn matches(&self, filter: &ProjectFilter) -> bool {
        filter.service.as_deref().map_or(true, |s| self.service == s)
            && filter.category.as_deref().map_or(true, |c| self.category == c)
    }

    fn to_form(&self) -> ProjectForm {
        ProjectForm {
            service: self.service.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            overview: self.overview.clone(),
            details: self.details.clone(),
            hero_image: self.hero_image.clone(),
            location: self.location.clone(),
            year_completed: self.year_completed.clone(),
            project_type: self.project_type.clone(),
            key_features: self.key_features.clone(),
        }
    }

    fn validate_form(form: &ProjectForm) -> Result<(), ValidationError> {
        require("title", &form.title)?;
        require_sluggable("title", &form.title)?;
        require_one_of("service", &form.service, SERVICES)?;
        require_one_of("category", &form.category, PROJECT_CATEGORIES)
    }

    fn assemble(form: &ProjectForm, media: Media, _existing: Option<&Self>) -> ProjectDraft {
        ProjectDraft {
            slug: slugify(&form.title),
            service: form.service.clone(),
            title: form.title.trim().to_string(),
            description: form.description.clone(),
            category: form.category.clone(),
            overview: form.overview.clone(),
            details: form.details.clone(),
            hero_image: form.hero_image.trim().to_string(),
            main_image: media.main_image,
            gallery: media.gallery,
            location: form.location.clone(),
            year_completed: form.year_completed.trim().to_string(),
            project_type: form.project_type.clone(),
            key_features: form.key_features.clone(),
        }
    }

    fn prepare_draft(draft: ProjectDraft) -> Result<ProjectDraft, ValidationError> {
        require("title", &draft.title)?;
        require_slug(&draft.slug)?;
        require_one_of("service", &draft.service, SERVICES)?;
        require_one_of("category", &draft.category, PROJECT_CATEGORIES)?;
        Ok(draft)
    }

    fn materialize(id: i64, draft: ProjectDraft, existing: Option<&Self>) -> Self {
        Project {
            id,
            slug: draft.slug,
            service: draft.service,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            overview: draft.overview,
            details: draft.details,
            hero_image: draft.hero_image,
            main_image: draft.main_image,
            gallery: draft.gallery,
            location: draft.location,
            year_completed: draft.year_completed,
            project_type: draft.project_type,
            key_features: draft.key_features,
            created_at: existing.map_or_else(Utc::now, |e| e.created_at),
        }
    }
}
