//! Translation between UI enum tokens and backend picklist labels.
//!
//! Every workflow enum (opportunity stage, quote status, ...) has three
//! spellings: the short token used by the UI and the command line
//! (`closed_won`), the label the backend stores (`"Closed Won"`), and a display
//! title for column headers and notices. The [`Picklist`] trait ties them
//! together and declares the fixed column order through [`Picklist::ALL`].

use crate::error::{Error, Result};

/// How the gateway treats a backend label it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PicklistMode {
    /// Substitute the enum's default and log a warning.
    #[default]
    Lenient,
    /// Refuse the record with [`Error::UnmappedLabel`].
    Strict,
}

pub trait Picklist: Copy + Eq + std::fmt::Debug + Sized + 'static {
    /// Human readable name of the enum, used in errors and logs.
    const KIND: &'static str;
    /// Every value in presentation order.
    const ALL: &'static [Self];
    /// Value substituted for unknown backend labels.
    const DEFAULT: Self;

    fn as_str(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == token)
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.label() == label)
    }

    /// UI token to backend label. Unknown tokens map to the first label.
    fn to_backend(token: &str) -> &'static str {
        match Self::from_token(token) {
            Some(value) => value.label(),
            None => Self::ALL[0].label(),
        }
    }

    /// Backend label to UI value, falling back to [`Picklist::DEFAULT`].
    fn to_ui(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::DEFAULT)
    }

    fn try_to_ui(label: &str) -> Result<Self> {
        Self::from_label(label).ok_or_else(|| Error::UnmappedLabel {
            kind: Self::KIND,
            label: label.to_string(),
        })
    }

    /// Decode a label read off the wire according to `mode`.
    ///
    /// An absent or empty label is not an error in either mode; the backend
    /// leaves picklists blank on records created outside this client.
    fn decode(label: Option<&str>, mode: PicklistMode) -> Result<Self> {
        let label = match label {
            Some(l) if !l.is_empty() => l,
            _ => return Ok(Self::DEFAULT),
        };
        match (Self::from_label(label), mode) {
            (Some(value), _) => Ok(value),
            (None, PicklistMode::Strict) => Self::try_to_ui(label),
            (None, PicklistMode::Lenient) => {
                tracing::warn!(
                    kind = Self::KIND,
                    label,
                    fallback = Self::DEFAULT.as_str(),
                    "unmapped picklist label, using default"
                );
                Ok(Self::DEFAULT)
            }
        }
    }
}
