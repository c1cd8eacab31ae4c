use crate::model::{OddsRow, Side};

/// Lowercased, trimmed, inner whitespace collapsed to single spaces.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps outcome rows to a side, either by the structured `home`/`away` key or
/// by matching the free-text outcome name against the event's participants.
#[derive(Debug, Clone)]
pub struct SideResolver {
    home: String,
    away: String,
}

impl SideResolver {
    pub fn new(home_name: &str, away_name: &str) -> Self {
        Self {
            home: normalize_label(home_name),
            away: normalize_label(away_name),
        }
    }

    pub fn resolve(&self, row: &OddsRow) -> Option<Side> {
        let key = row.outcome_key.as_deref().map(normalize_label);
        match key.as_deref() {
            Some("home") => return Some(Side::Home),
            Some("away") => return Some(Side::Away),
            _ => {}
        }

        let name = normalize_label(row.outcome_name.as_deref()?);
        if name.is_empty() {
            return None;
        }
        if name == self.home {
            Some(Side::Home)
        } else if name == self.away {
            Some(Side::Away)
        } else {
            None
        }
    }
}
