// Card lookup results as consumed by the pick pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::config::Format;

/// Legality status of a card in one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Legality {
    Legal,
    NotLegal,
    Restricted,
    Banned,
    #[serde(other)]
    Unknown,
}

impl Legality {
    /// Parse a lookup status string (`"legal"`, `"not_legal"`, ...).
    pub fn from_status(s: &str) -> Self {
        match s {
            "legal" => Legality::Legal,
            "not_legal" => Legality::NotLegal,
            "restricted" => Legality::Restricted,
            "banned" => Legality::Banned,
            _ => Legality::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Legality::Legal => "legal",
            Legality::NotLegal => "not_legal",
            Legality::Restricted => "restricted",
            Legality::Banned => "banned",
            Legality::Unknown => "unknown",
        }
    }
}

/// What the card lookup resolved a user's query to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardInfo {
    NotFound,
    Found {
        /// Canonical spelling. Uniqueness checks compare this value only.
        name: String,
        /// Format key -> status.
        legalities: HashMap<String, Legality>,
        image_url: Option<String>,
    },
}

impl CardInfo {
    /// A found card with no legality data; playable only in freeform drafts.
    pub fn named(name: impl Into<String>) -> Self {
        CardInfo::Found {
            name: name.into(),
            legalities: HashMap::new(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        if let CardInfo::Found { image_url, .. } = &mut self {
            *image_url = Some(url.into());
        }
        self
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            CardInfo::Found { image_url, .. } => image_url.as_deref(),
            CardInfo::NotFound => None,
        }
    }

    /// Per-format legality listing, formats sorted by key, e.g.
    /// "Gush Legality\n```\nlegacy: banned\nvintage: restricted\n```".
    pub fn legality_report(&self) -> Option<String> {
        let CardInfo::Found {
            name, legalities, ..
        } = self
        else {
            return None;
        };
        let mut formats: Vec<(&String, &Legality)> = legalities.iter().collect();
        formats.sort_by(|a, b| a.0.cmp(b.0));

        let mut report = format!("{name} Legality\n```\n");
        for (format, status) in formats {
            report.push_str(&format!("{format}: {}\n", status.as_str()));
        }
        report.push_str("```");
        Some(report)
    }

    pub fn with_legality(mut self, format: Format, status: Legality) -> Self {
        if let CardInfo::Found { legalities, .. } = &mut self {
            legalities.insert(format.display_str().to_string(), status);
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CardInfo::Found { name, .. } => Some(name),
            CardInfo::NotFound => None,
        }
    }

    /// Whether the card may be drafted in `format`. A missing entry counts as
    /// not legal; freeform accepts everything.
    pub fn is_legal_in(&self, format: Format) -> bool {
        if format.is_freeform() {
            return true;
        }
        match self {
            CardInfo::Found { legalities, .. } => !matches!(
                legalities.get(format.display_str()),
                None | Some(Legality::NotLegal | Legality::Banned)
            ),
            CardInfo::NotFound => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeform_ignores_legalities() {
        let card = CardInfo::named("Black Lotus").with_legality(Format::Modern, Legality::NotLegal);
        assert!(card.is_legal_in(Format::Freeform));
        assert!(!card.is_legal_in(Format::Modern));
    }

    #[test]
    fn banned_and_missing_are_not_legal() {
        let card = CardInfo::named("Gush")
            .with_legality(Format::Legacy, Legality::Banned)
            .with_legality(Format::Vintage, Legality::Restricted);
        assert!(!card.is_legal_in(Format::Legacy));
        assert!(card.is_legal_in(Format::Vintage));
        assert!(!card.is_legal_in(Format::Pauper));
    }

    #[test]
    fn legality_report_lists_formats_in_order() {
        let card = CardInfo::named("Gush")
            .with_legality(Format::Vintage, Legality::Restricted)
            .with_legality(Format::Legacy, Legality::Banned)
            .with_legality(Format::Modern, Legality::NotLegal);
        assert_eq!(
            card.legality_report().unwrap(),
            "Gush Legality\n```\nlegacy: banned\nmodern: not_legal\nvintage: restricted\n```"
        );
        assert_eq!(CardInfo::NotFound.legality_report(), None);
    }

    #[test]
    fn image_is_optional() {
        assert_eq!(CardInfo::named("Island").image_url(), None);
        let card = CardInfo::named("Island").with_image("https://img.example/island.jpg");
        assert_eq!(card.image_url(), Some("https://img.example/island.jpg"));
        assert_eq!(CardInfo::NotFound.with_image("x").image_url(), None);
    }

    #[test]
    fn legality_deserializes_unknown_status() {
        let parsed: Legality = serde_json::from_str("\"suspended\"").unwrap();
        assert_eq!(parsed, Legality::Unknown);
        assert_eq!(Legality::from_status("not_legal"), Legality::NotLegal);
    }
}
