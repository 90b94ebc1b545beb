//! Provider-related types.
//!
//! This module contains types related to usage providers:
//! - [`ProviderKind`] - Closed set of supported providers
//! - [`ProviderBranding`] - Presentation hints (icon, accent color)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported usage providers.
///
/// The ordering of the variants is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Claude
    Claude,
    /// OpenAI Codex
    Codex,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
        }
    }

    /// Returns all available provider kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[Self::Claude, Self::Codex]
    }

    /// Returns the stable identifier (lowercase, no spaces).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    /// Returns the name accepted on the command line.
    pub fn cli_name(&self) -> &'static str {
        self.id()
    }

    /// Returns the visual branding for this provider.
    pub fn branding(&self) -> ProviderBranding {
        ProviderBranding::for_provider(*self)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.cli_name() == needle)
            .ok_or_else(|| format!("Unknown provider: {s}"))
    }
}

// ============================================================================
// Provider Branding
// ============================================================================

/// Visual branding for a provider.
///
/// Opaque to the engine; only the presentation layer reads it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderBranding {
    /// Fallback emoji icon.
    pub icon: &'static str,
    /// Asset name for a bundled icon, if any.
    pub icon_name: Option<&'static str>,
    /// Accent color for this provider.
    pub color: ProviderColor,
}

impl ProviderBranding {
    /// Creates branding for a provider kind.
    pub fn for_provider(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Claude => Self {
                icon: "🤖",
                icon_name: Some("claude-icon"),
                color: ProviderColor::new(0.82, 0.58, 0.44),
            },
            ProviderKind::Codex => Self {
                icon: "⚡",
                icon_name: Some("codex-icon"),
                color: ProviderColor::new(0.0, 0.64, 0.38),
            },
        }
    }
}

/// RGB color for provider branding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderColor {
    /// Red component (0.0 - 1.0).
    pub red: f32,
    /// Green component (0.0 - 1.0).
    pub green: f32,
    /// Blue component (0.0 - 1.0).
    pub blue: f32,
}

impl ProviderColor {
    /// Creates a new color.
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Converts to 8-bit RGB tuple.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        (
            (self.red.clamp(0.0, 1.0) * 255.0) as u8,
            (self.green.clamp(0.0, 1.0) * 255.0) as u8,
            (self.blue.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }

    /// Converts to hex string (e.g., "#FF6600").
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{r:02X}{g:02X}{b:02X}")
    }
}

impl Default for ProviderColor {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

// ============================================================================
// Tests
// ============================================================================
