// ── Access control entries ──

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::datum;
use super::{Record, TableKind};
use crate::error::CoreError;

pub const MAX_PRIORITY: u16 = 32767;

/// Traffic direction relative to the logical port.
///
/// Variant order is the listing order: `from-lport` sorts first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Direction {
    FromLport,
    ToLport,
}

impl Direction {
    /// Accepts any word starting with `t` or `f`.
    pub fn parse_loose(raw: &str) -> Result<Self, CoreError> {
        match raw.chars().next() {
            Some('t') => Ok(Self::ToLport),
            Some('f') => Ok(Self::FromLport),
            _ => Err(CoreError::invalid(format!(
                "{raw}: direction must be \"to-lport\" or \"from-lport\""
            ))),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AclAction {
    Allow,
    AllowRelated,
    Drop,
    Reject,
}

impl AclAction {
    pub fn parse_strict(raw: &str) -> Result<Self, CoreError> {
        raw.parse().map_err(|_| {
            CoreError::invalid(format!(
                "{raw}: action must be one of \"allow\", \"allow-related\", \"drop\", and \"reject\""
            ))
        })
    }
}

/// A directional, prioritized match/action rule owned by one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub uuid: Uuid,
    pub direction: Direction,
    pub priority: u16,
    #[serde(rename = "match")]
    pub match_expr: String,
    pub action: AclAction,
    #[serde(default)]
    pub log: bool,
}

impl Default for Acl {
    fn default() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            direction: Direction::FromLport,
            priority: 0,
            match_expr: String::new(),
            action: AclAction::Allow,
            log: false,
        }
    }
}

impl Acl {
    pub fn new(direction: Direction, priority: u16, match_expr: impl Into<String>, action: AclAction) -> Self {
        Self {
            direction,
            priority,
            match_expr: match_expr.into(),
            action,
            ..Self::default()
        }
    }

    /// Presentation order: direction, then priority descending, then match.
    pub fn listing_cmp(&self, other: &Self) -> Ordering {
        self.direction
            .cmp(&other.direction)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.match_expr.cmp(&other.match_expr))
    }

    /// Whether this entry has exactly the given key.
    pub fn matches_key(&self, direction: Direction, priority: u16, match_expr: &str) -> bool {
        self.direction == direction && self.priority == priority && self.match_expr == match_expr
    }
}

/// Parse an ACL priority in `0..=32767`.
pub fn parse_priority(raw: &str) -> Result<u16, CoreError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p <= MAX_PRIORITY)
        .ok_or_else(|| CoreError::invalid(format!("{raw}: priority must in range 0...32767")))
}

impl Record for Acl {
    const TABLE: TableKind = TableKind::Acl;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn column_names() -> &'static [&'static str] {
        &["action", "direction", "log", "match", "priority"]
    }

    fn render_column(&self, column: &str) -> Option<String> {
        let rendered = match column {
            "action" => self.action.to_string(),
            "direction" => self.direction.to_string(),
            "log" => self.log.to_string(),
            "match" => datum::render_str(&self.match_expr),
            "priority" => self.priority.to_string(),
            _ => return None,
        };
        Some(rendered)
    }

    fn set_column(&mut self, column: &str, value: &str) -> Result<(), CoreError> {
        match column {
            "action" => self.action = AclAction::parse_strict(&datum::parse_string(value)?)?,
            "direction" => {
                let raw = datum::parse_string(value)?;
                self.direction = raw.parse().map_err(|_| {
                    CoreError::invalid(format!(
                        "{raw}: direction must be \"to-lport\" or \"from-lport\""
                    ))
                })?;
            }
            "log" => self.log = datum::parse_bool(value)?,
            "match" => self.match_expr = datum::parse_string(value)?,
            "priority" => {
                let priority = datum::parse_integer(value)?;
                self.priority = u16::try_from(priority)
                    .ok()
                    .filter(|p| *p <= MAX_PRIORITY)
                    .ok_or_else(|| {
                        CoreError::invalid(format!("{value}: priority must in range 0...32767"))
                    })?;
            }
            _ => return Err(super::unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
