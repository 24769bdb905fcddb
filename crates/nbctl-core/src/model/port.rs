// ── Logical port ──

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::datum;
use super::{Record, TableKind};
use crate::error::CoreError;

pub const MAX_TAG: u16 = 4095;

/// An attachment point on a logical switch.
///
/// `parent_name` is a logical reference to another port by name, not an
/// ownership link. `tag` is only meaningful when a parent is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalPort {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub port_security: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "type", default)]
    pub port_type: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum PortColumn {
    Name,
    ParentName,
    Tag,
    Addresses,
    PortSecurity,
    Up,
    Enabled,
    Type,
    Options,
}

impl LogicalPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            parent_name: None,
            tag: None,
            addresses: Vec::new(),
            port_security: Vec::new(),
            up: None,
            enabled: None,
            port_type: String::new(),
            options: BTreeMap::new(),
        }
    }

    /// Absent `enabled` means enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Absent `up` means down.
    pub fn is_up(&self) -> bool {
        self.up.unwrap_or(false)
    }

    pub(crate) fn column_eq(&self, other: &Self, column: PortColumn) -> bool {
        match column {
            PortColumn::Name => self.name == other.name,
            PortColumn::ParentName => self.parent_name == other.parent_name,
            PortColumn::Tag => self.tag == other.tag,
            PortColumn::Addresses => self.addresses == other.addresses,
            PortColumn::PortSecurity => self.port_security == other.port_security,
            PortColumn::Up => self.up == other.up,
            PortColumn::Enabled => self.enabled == other.enabled,
            PortColumn::Type => self.port_type == other.port_type,
            PortColumn::Options => self.options == other.options,
        }
    }

    pub(crate) fn copy_column(&mut self, from: &Self, column: PortColumn) {
        match column {
            PortColumn::Name => self.name.clone_from(&from.name),
            PortColumn::ParentName => self.parent_name.clone_from(&from.parent_name),
            PortColumn::Tag => self.tag = from.tag,
            PortColumn::Addresses => self.addresses.clone_from(&from.addresses),
            PortColumn::PortSecurity => self.port_security.clone_from(&from.port_security),
            PortColumn::Up => self.up = from.up,
            PortColumn::Enabled => self.enabled = from.enabled,
            PortColumn::Type => self.port_type.clone_from(&from.port_type),
            PortColumn::Options => self.options.clone_from(&from.options),
        }
    }
}

impl Record for LogicalPort {
    const TABLE: TableKind = TableKind::LogicalPort;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "addresses",
            "enabled",
            "name",
            "options",
            "parent_name",
            "port_security",
            "tag",
            "type",
            "up",
        ]
    }

    fn render_column(&self, column: &str) -> Option<String> {
        let strings = |list: &[String]| datum::render_set(list.iter().map(|s| datum::render_str(s)));
        let rendered = match column {
            "addresses" => strings(&self.addresses),
            "enabled" => datum::render_optional(self.enabled),
            "name" => datum::render_str(&self.name),
            "options" => datum::render_map(&self.options),
            "parent_name" => datum::render_optional(self.parent_name.as_deref().map(datum::render_str)),
            "port_security" => strings(&self.port_security),
            "tag" => datum::render_optional(self.tag),
            "type" => datum::render_str(&self.port_type),
            "up" => datum::render_optional(self.up),
            _ => return None,
        };
        Some(rendered)
    }

    fn set_column(&mut self, column: &str, value: &str) -> Result<(), CoreError> {
        match column {
            "name" => self.name = datum::parse_string(value)?,
            "parent_name" => {
                let parent = datum::parse_string(value)?;
                self.parent_name = (!parent.is_empty()).then_some(parent);
            }
            "tag" => self.tag = Some(parse_tag(value)?),
            "addresses" => self.addresses = datum::parse_set(value)?,
            "port_security" => self.port_security = datum::parse_set(value)?,
            "up" => self.up = Some(datum::parse_bool(value)?),
            "enabled" => self.enabled = Some(datum::parse_bool(value)?),
            "type" => self.port_type = datum::parse_string(value)?,
            "options" => self.options = datum::parse_map(value)?,
            _ => return Err(super::unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}

// ── Argument validation ──────────────────────────────────────────────

/// Parse a VLAN tag in `0..=4095`.
pub fn parse_tag(raw: &str) -> Result<u16, CoreError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|tag| *tag <= MAX_TAG)
        .ok_or_else(|| CoreError::invalid(format!("{raw}: invalid tag")))
}

/// Validate one `addresses` entry: `unknown`, or an Ethernet address
/// optionally followed by IP addresses, all in a single argument.
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    if address == "unknown" {
        return Ok(());
    }
    let mut tokens = address.split_whitespace();
    let valid = tokens.next().is_some_and(is_ethernet_address)
        && tokens.all(|token| token.parse::<IpAddr>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(CoreError::invalid(format!(
            "{address}: Invalid address format. See ovn-nb(5). Hint: An Ethernet address must \
             be listed before an IP address, together as a single argument."
        )))
    }
}

fn is_ethernet_address(token: &str) -> bool {
    let groups: Vec<&str> = token.split(':').collect();
    groups.len() == 6
        && groups.iter().all(|group| {
            (1..=2).contains(&group.len()) && group.chars().all(|c| c.is_ascii_hexdigit())
        })
}
