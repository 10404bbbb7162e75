#![forbid(unsafe_code)]
//! Vitrine domain model SSOT.
//!
//! ```compile_fail
//! use vitrine_model::FlagKey;
//!
//! fn exhaustive_match(k: FlagKey) -> &'static str {
//!     match k {
//!         FlagKey::ReleaseNewAuth => "a",
//!         FlagKey::EnableDisasterMode => "b",
//!     }
//! }
//! ```

mod branding;
mod color;
mod flags;
mod user;

pub use branding::{
    BrandingInput, BrandingState, PersistedBranding, DEFAULT_DOMAIN, DEFAULT_LOGO_URL,
    DEFAULT_PRIMARY_COLOR,
};
pub use color::{
    contrast_color, luma, parse_hex_color, CONTRAST_DARK, CONTRAST_LIGHT, LUMA_THRESHOLD,
};
pub use flags::{FlagKey, FlagSet};
pub use user::{
    parse_email, ProfileUpdate, PublicUser, UserId, UserRecord, ValidationError, EMAIL_MAX_LEN,
};

pub const CRATE_NAME: &str = "vitrine-model";
