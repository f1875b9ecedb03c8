//! Property listings with an embedded agent contact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{require, require_slug, require_sluggable, slugify, Entity, EntityKind, ImageRef, Media, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub address: String,
    pub price: String,
    pub property_type: String,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area: String,
    pub features: Vec<String>,
    pub description: String,
    #[sqlx(json)]
    pub agent: Agent,
    #[sqlx(json)]
    pub main_image: Option<ImageRef>,
    #[sqlx(json)]
    pub gallery: Vec<ImageRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agent: Agent,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub gallery: Vec<ImageRef>,
}

/// Editor fields. Counts are kept as typed text; `features` is a
/// comma-separated list; a blank `slug` falls back to the title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyForm {
    pub slug: String,
    pub title: String,
    pub address: String,
    pub price: String,
    pub property_type: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub area: String,
    pub features: String,
    pub description: String,
    pub agent_name: String,
    pub agent_phone: String,
    pub agent_email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
}

fn parse_count(field: &'static str, value: &str) -> Result<Option<i32>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u16>()
        .map(|n| Some(i32::from(n)))
        .map_err(|_| ValidationError::new(field, "must be a whole number"))
}

fn split_features(features: &str) -> Vec<String> {
    features
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

impl Entity for Property {
    type Draft = PropertyDraft;
    type Form = PropertyForm;
    type Filter = PropertyFilter;

    const KIND: EntityKind = EntityKind::Property;

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

    fn matches(&self, filter: &PropertyFilter) -> bool {
        filter
            .property_type
            .as_deref()
            .map_or(true, |t| self.property_type == t)
    }

    fn to_form(&self) -> PropertyForm {
        PropertyForm {
            slug: self.slug.clone(),
            title: self.title.clone(),
            address: self.address.clone(),
            price: self.price.clone(),
            property_type: self.property_type.clone(),
            bedrooms: self.bedrooms.map(|n| n.to_string()).unwrap_or_default(),
            bathrooms: self.bathrooms.map(|n| n.to_string()).unwrap_or_default(),
            area: self.area.clone(),
            features: self.features.join(", "),
            description: self.description.clone(),
            agent_name: self.agent.name.clone(),
            agent_phone: self.agent.phone.clone(),
            agent_email: self.agent.email.clone(),
        }
    }

    fn validate_form(form: &PropertyForm) -> Result<(), ValidationError> {
        require("title", &form.title)?;
        if form.slug.trim().is_empty() {
            require_sluggable("title", &form.title)?;
        } else {
            require_sluggable("slug", &form.slug)?;
        }
        parse_count("bedrooms", &form.bedrooms)?;
        parse_count("bathrooms", &form.bathrooms)?;
        Ok(())
    }

    fn assemble(form: &PropertyForm, media: Media, _existing: Option<&Self>) -> PropertyDraft {
        let slug = if form.slug.trim().is_empty() {
            slugify(&form.title)
        } else {
            slugify(&form.slug)
        };

        PropertyDraft {
            slug,
            title: form.title.trim().to_string(),
            address: form.address.clone(),
            price: form.price.trim().to_string(),
            property_type: form.property_type.clone(),
            bedrooms: parse_count("bedrooms", &form.bedrooms).ok().flatten(),
            bathrooms: parse_count("bathrooms", &form.bathrooms).ok().flatten(),
            area: form.area.clone(),
            features: split_features(&form.features),
            description: form.description.clone(),
            agent: Agent {
                name: form.agent_name.trim().to_string(),
                phone: form.agent_phone.trim().to_string(),
                email: form.agent_email.trim().to_string(),
            },
            main_image: media.main_image,
            gallery: media.gallery,
        }
    }

    fn prepare_draft(draft: PropertyDraft) -> Result<PropertyDraft, ValidationError> {
        require("title", &draft.title)?;
        require_slug(&draft.slug)?;
        if draft.bedrooms.is_some_and(|n| n < 0) || draft.bathrooms.is_some_and(|n| n < 0) {
            return Err(ValidationError::new("bedrooms", "must not be negative"));
        }
        Ok(draft)
    }

    fn materialize(id: i64, draft: PropertyDraft, existing: Option<&Self>) -> Self {
        Property {
            id,
            slug: draft.slug,
            title: draft.title,
            address: draft.address,
            price: draft.price,
            property_type: draft.property_type,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area: draft.area,
            features: draft.features,
            description: draft.description,
            agent: draft.agent,
            main_image: draft.main_image,
            gallery: draft.gallery,
            created_at: existing.map_or_else(Utc::now, |e| e.created_at),
        }
    }
}
