use serde::{Deserialize, Serialize};

/// Every feature flag the app evaluates, with its wire name and default.
///
/// The schema is closed on purpose: flags are typed configuration, not
/// dynamically discovered variations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagKey {
    ReleaseNewAuth,
    EnableDisasterMode,
    CheckoutV2,
}

impl FlagKey {
    pub const ALL: [FlagKey; 3] = [
        FlagKey::ReleaseNewAuth,
        FlagKey::EnableDisasterMode,
        FlagKey::CheckoutV2,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FlagKey::ReleaseNewAuth => "release-new-auth",
            FlagKey::EnableDisasterMode => "enable-disaster-mode",
            FlagKey::CheckoutV2 => "checkout-v2",
        }
    }

    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            FlagKey::ReleaseNewAuth => "VITRINE_FLAG_RELEASE_NEW_AUTH",
            FlagKey::EnableDisasterMode => "VITRINE_FLAG_ENABLE_DISASTER_MODE",
            FlagKey::CheckoutV2 => "VITRINE_FLAG_CHECKOUT_V2",
        }
    }

    #[must_use]
    pub fn default_value(self) -> bool {
        false
    }

    #[must_use]
    pub fn parse_name(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == raw)
    }
}

/// Concrete flag values carried in app state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlagSet {
    pub release_new_auth: bool,
    pub enable_disaster_mode: bool,
    pub checkout_v2: bool,
}

impl FlagSet {
    #[must_use]
    pub fn get(&self, key: FlagKey) -> bool {
        match key {
            FlagKey::ReleaseNewAuth => self.release_new_auth,
            FlagKey::EnableDisasterMode => self.enable_disaster_mode,
            FlagKey::CheckoutV2 => self.checkout_v2,
        }
    }

    pub fn set(&mut self, key: FlagKey, value: bool) {
        match key {
            FlagKey::ReleaseNewAuth => self.release_new_auth = value,
            FlagKey::EnableDisasterMode => self.enable_disaster_mode = value,
            FlagKey::CheckoutV2 => self.checkout_v2 = value,
        }
    }

    /// Resolves every flag through a lookup (typically env vars), keeping the
    /// declared default when the lookup is absent or unparseable.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut flags = Self::default();
        for key in FlagKey::ALL {
            let value = lookup(key.env_var())
                .and_then(|raw| parse_bool(&raw))
                .unwrap_or_else(|| key.default_value());
            flags.set(key, value);
        }
        flags
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
