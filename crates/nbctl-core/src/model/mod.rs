// ── Domain model ──
//
// Logical switches own logical ports and ACLs purely through membership
// in their `ports`/`acls` collections. Ports and ACLs that no switch
// references are garbage collected on commit.

pub mod acl;
pub mod database;
pub mod datum;
pub mod port;
pub mod switch;

use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;

pub use acl::{Acl, AclAction, Direction};
pub use database::Database;
pub use port::{LogicalPort, PortColumn};
pub use switch::{LogicalSwitch, SwitchColumn};

/// The tables of the northbound schema that this client manages.
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
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum TableKind {
    #[strum(serialize = "Logical_Switch")]
    LogicalSwitch,
    #[strum(serialize = "Logical_Port")]
    LogicalPort,
    #[strum(serialize = "ACL")]
    Acl,
}

impl TableKind {
    /// Root tables keep their rows alive; everything else must be
    /// referenced from a root row to survive garbage collection.
    pub fn is_root(self) -> bool {
        matches!(self, Self::LogicalSwitch)
    }

    /// Column names of the table, `_uuid` excluded.
    pub fn column_names(self) -> &'static [&'static str] {
        match self {
            Self::LogicalSwitch => LogicalSwitch::column_names(),
            Self::LogicalPort => LogicalPort::column_names(),
            Self::Acl => Acl::column_names(),
        }
    }

    /// Fail unless `column` names a column of this table.
    pub fn check_column(self, column: &str) -> Result<(), CoreError> {
        if self.column_names().contains(&column) {
            Ok(())
        } else {
            Err(unknown_column(self, column))
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        name.parse()
            .map_err(|_| CoreError::invalid(format!("unknown table \"{name}\"")))
    }
}

/// A column whose value a transaction reads or writes.
///
/// ACL rows are immutable once inserted, so only switch and port
/// columns are ever tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnRef {
    Switch(Uuid, SwitchColumn),
    Port(Uuid, PortColumn),
}

impl ColumnRef {
    pub fn row(self) -> Uuid {
        match self {
            Self::Switch(uuid, _) | Self::Port(uuid, _) => uuid,
        }
    }
}

/// Generic column access used by `list`, `create` and `wait-until`.
pub trait Record {
    const TABLE: TableKind;

    fn uuid(&self) -> Uuid;

    /// Column names in display order, `_uuid` excluded.
    fn column_names() -> &'static [&'static str];

    /// Render one column, or `None` if the table has no such column.
    fn render_column(&self, column: &str) -> Option<String>;

    /// Assign a scalar column from its text form.
    fn set_column(&mut self, column: &str, value: &str) -> Result<(), CoreError>;

    /// `_uuid` followed by every column, rendered.
    fn rendered_row(&self) -> Vec<String> {
        std::iter::once(self.uuid().to_string())
            .chain(
                Self::column_names()
                    .iter()
                    .filter_map(|column| self.render_column(column)),
            )
            .collect()
    }
}

pub(crate) fn unknown_column(table: TableKind, column: &str) -> CoreError {
    CoreError::invalid(format!("{table} does not contain a column whose name matches \"{column}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_parse_case_insensitively() {
        assert_eq!(TableKind::parse("logical_switch").ok(), Some(TableKind::LogicalSwitch));
        assert_eq!(TableKind::parse("ACL").ok(), Some(TableKind::Acl));
        assert_eq!(TableKind::LogicalPort.to_string(), "Logical_Port");
        assert!(TableKind::parse("Bridge").is_err());
    }

    #[test]
    fn only_switches_are_roots() {
        assert!(TableKind::LogicalSwitch.is_root());
        assert!(!TableKind::LogicalPort.is_root());
        assert!(!TableKind::Acl.is_root());
    }
}
