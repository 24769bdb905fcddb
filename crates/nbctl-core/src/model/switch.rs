// ── Logical switch ──

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::datum;
use super::{Record, TableKind};
use crate::error::CoreError;

/// A virtual L2 broadcast domain.
///
/// `ports` and `acls` are semantically unordered; removals swap the last
/// element into the hole, so callers must not rely on order surviving a
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalSwitch {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ports: Vec<Uuid>,
    #[serde(default)]
    pub acls: Vec<Uuid>,
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
pub enum SwitchColumn {
    Name,
    Ports,
    Acls,
}

impl LogicalSwitch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            ports: Vec::new(),
            acls: Vec::new(),
        }
    }

    /// The name, or the UUID for unnamed switches.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.uuid.to_string()
        } else {
            self.name.clone()
        }
    }

    pub(crate) fn column_eq(&self, other: &Self, column: SwitchColumn) -> bool {
        match column {
            SwitchColumn::Name => self.name == other.name,
            SwitchColumn::Ports => self.ports == other.ports,
            SwitchColumn::Acls => self.acls == other.acls,
        }
    }

    pub(crate) fn copy_column(&mut self, from: &Self, column: SwitchColumn) {
        match column {
            SwitchColumn::Name => self.name.clone_from(&from.name),
            SwitchColumn::Ports => self.ports.clone_from(&from.ports),
            SwitchColumn::Acls => self.acls.clone_from(&from.acls),
        }
    }

    /// Remove one reference by swapping the last element into its slot.
    pub(crate) fn swap_remove_port(&mut self, port: Uuid) -> bool {
        swap_remove_uuid(&mut self.ports, port)
    }

    pub(crate) fn swap_remove_acl(&mut self, acl: Uuid) -> bool {
        swap_remove_uuid(&mut self.acls, acl)
    }
}

fn swap_remove_uuid(list: &mut Vec<Uuid>, uuid: Uuid) -> bool {
    match list.iter().position(|u| *u == uuid) {
        Some(index) => {
            list.swap_remove(index);
            true
        }
        None => false,
    }
}

impl Record for LogicalSwitch {
    const TABLE: TableKind = TableKind::LogicalSwitch;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn column_names() -> &'static [&'static str] {
        &["acls", "name", "ports"]
    }

    fn render_column(&self, column: &str) -> Option<String> {
        let uuids = |list: &[Uuid]| datum::render_set(list.iter().map(Uuid::to_string));
        match column {
            "name" => Some(datum::render_str(&self.name)),
            "ports" => Some(uuids(&self.ports)),
            "acls" => Some(uuids(&self.acls)),
            _ => None,
        }
    }

    fn set_column(&mut self, column: &str, value: &str) -> Result<(), CoreError> {
        match column {
            "name" => self.name = datum::parse_string(value)?,
            _ => return Err(super::unknown_column(Self::TABLE, column)),
        }
        Ok(())
    }
}
