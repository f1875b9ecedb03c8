use serde::{Deserialize, Serialize};

/// Path marker that precedes the public id in asset CDN delivery URLs.
const UPLOAD_MARKER: &str = "/upload/";

/// A stored image: its delivery URL plus the asset-store identifier needed to
/// delete it. `external_id` is empty for legacy rows that never recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredImage")]
pub struct ImageRef {
    pub url: String,
    pub external_id: String,
}

/// Shapes an image reference has been persisted in over time.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredImage {
    Url(String),
    Full {
        url: String,
        #[serde(default, rename = "externalId", alias = "public_id", alias = "external_id")]
        external_id: Option<String>,
    },
}

impl From<StoredImage> for ImageRef {
    fn from(stored: StoredImage) -> Self {
        match stored {
            StoredImage::Url(url) => ImageRef::from_url(url),
            StoredImage::Full { url, external_id } => ImageRef {
                url,
                external_id: external_id.unwrap_or_default(),
            },
        }
    }
}

impl ImageRef {
    pub fn new(url: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            external_id: external_id.into(),
        }
    }

    /// Reference to an image whose asset id was never recorded.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(url, "")
    }

    /// The asset id to delete: the stored one, or one parsed from the URL for
    /// legacy rows.
    pub fn resolved_external_id(&self) -> Option<String> {
        if !self.external_id.trim().is_empty() {
            return Some(self.external_id.clone());
        }
        external_id_from_url(&self.url)
    }
}

/// Recover the asset id from a delivery URL such as
/// `https://res.cloudinary.com/demo/image/upload/v1699/properties/abc.jpg`
/// (yielding `properties/abc`). Returns `None` when the URL carries no
/// upload marker.
pub fn external_id_from_url(url: &str) -> Option<String> {
    let (_, tail) = url.split_once(UPLOAD_MARKER)?;
    let tail = tail.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();

    // Skip the version segment (`v<digits>/`) when present.
    let tail = match tail.split_once('/') {
        Some((first, rest))
            if first.len() > 1
                && first.starts_with('v')
                && first[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => tail,
    };

    let without_ext = match tail.rfind('.') {
        Some(dot) if !tail[dot..].contains('/') => &tail[..dot],
        _ => tail,
    };

    if without_ext.is_empty() {
        None
    } else {
        Some(without_ext.to_string())
    }
}
