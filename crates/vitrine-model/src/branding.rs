use crate::color::{contrast_color, parse_hex_color};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOGO_URL: &str = "/static/logo.svg";
pub const DEFAULT_PRIMARY_COLOR: &str = "#000000";
pub const DEFAULT_DOMAIN: &str = "vitrine.example";

/// The visual identity applied to the demo shell.
///
/// Invariant: `contrast_color` is a pure function of `primary_color`
/// (one of `#000000` / `#FFFFFF`), re-derived on every apply. A persisted
/// override is honored only on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrandingState {
    pub logo_url: String,
    pub primary_color: String,
    pub contrast_color: String,
    pub domain: String,
}

impl Default for BrandingState {
    fn default() -> Self {
        Self {
            logo_url: DEFAULT_LOGO_URL.to_string(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            contrast_color: contrast_color(DEFAULT_PRIMARY_COLOR).to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

/// The caller-supplied portion of a branding change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingInput {
    pub logo_url: String,
    pub primary_color: String,
    pub domain: String,
}

/// On-disk shape. Every field is optional so partial or legacy files still
/// load; missing required fields fall back to defaults wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedBranding {
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub contrast_color: Option<String>,
    pub domain: Option<String>,
}

impl BrandingState {
    /// Builds the next state from caller input, deriving the contrast color.
    #[must_use]
    pub fn apply(input: &BrandingInput) -> Self {
        Self {
            logo_url: input.logo_url.clone(),
            primary_color: input.primary_color.clone(),
            contrast_color: contrast_color(&input.primary_color).to_string(),
            domain: input.domain.clone(),
        }
    }

    /// Reconstructs state from persisted fields.
    ///
    /// If any of logo / primary / domain is absent the whole state falls back
    /// to defaults. An explicit contrast override is honored when it parses
    /// as a hex color; otherwise contrast is re-derived.
    #[must_use]
    pub fn from_persisted(persisted: &PersistedBranding) -> Self {
        let (Some(logo_url), Some(primary_color), Some(domain)) = (
            persisted.logo_url.clone(),
            persisted.primary_color.clone(),
            persisted.domain.clone(),
        ) else {
            return Self::default();
        };
        let contrast = persisted
            .contrast_color
            .as_deref()
            .filter(|c| parse_hex_color(c).is_some())
            .map_or_else(
                || contrast_color(&primary_color).to_string(),
                str::to_string,
            );
        Self {
            logo_url,
            primary_color,
            contrast_color: contrast,
            domain,
        }
    }

    #[must_use]
    pub fn to_persisted(&self) -> PersistedBranding {
        PersistedBranding {
            logo_url: Some(self.logo_url.clone()),
            primary_color: Some(self.primary_color.clone()),
            contrast_color: Some(self.contrast_color.clone()),
            domain: Some(self.domain.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_derives_contrast_from_primary() {
        let state = BrandingState::apply(&BrandingInput {
            logo_url: "https://img.example/acme.png".to_string(),
            primary_color: "#FFFFFF".to_string(),
            domain: "acme.com".to_string(),
        });
        assert_eq!(state.contrast_color, "#000000");

        let dark = BrandingState::apply(&BrandingInput {
            logo_url: "https://img.example/acme.png".to_string(),
            primary_color: "#3b82f6".to_string(),
            domain: "acme.com".to_string(),
        });
        assert_eq!(dark.contrast_color, "#FFFFFF");
    }

    #[test]
    fn defaults_have_white_on_black() {
        let state = BrandingState::default();
        assert_eq!(state.primary_color, "#000000");
        assert_eq!(state.contrast_color, "#FFFFFF");
        assert_eq!(state.domain, DEFAULT_DOMAIN);
    }

    #[test]
    fn persisted_roundtrip_reproduces_state() {
        let state = BrandingState::apply(&BrandingInput {
            logo_url: "https://img.example/x.png".to_string(),
            primary_color: "#16a34a".to_string(),
            domain: "x.dev".to_string(),
        });
        assert_eq!(BrandingState::from_persisted(&state.to_persisted()), state);
    }

    #[test]
    fn missing_required_field_falls_back_to_defaults() {
        let partial = PersistedBranding {
            logo_url: Some("https://img.example/x.png".to_string()),
            primary_color: None,
            contrast_color: None,
            domain: Some("x.dev".to_string()),
        };
        assert_eq!(BrandingState::from_persisted(&partial), BrandingState::default());
    }

    #[test]
    fn unparseable_contrast_override_is_rederived() {
        let persisted = PersistedBranding {
            logo_url: Some("l".to_string()),
            primary_color: Some("#ffffff".to_string()),
            contrast_color: Some("chartreuse".to_string()),
            domain: Some("d".to_string()),
        };
        assert_eq!(
            BrandingState::from_persisted(&persisted).contrast_color,
            "#000000"
        );
    }
}
