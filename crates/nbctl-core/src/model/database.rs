// ── Database snapshot ──
//
// One immutable generation of the northbound tables. Snapshots are
// shared behind `Arc`; transactions mutate a private clone.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Acl, LogicalPort, LogicalSwitch, Record, TableKind};
use crate::error::{CoreError, LookupKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Bumped on every committed change.
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub switches: IndexMap<Uuid, LogicalSwitch>,
    #[serde(default)]
    pub ports: IndexMap<Uuid, LogicalPort>,
    #[serde(default)]
    pub acls: IndexMap<Uuid, Acl>,
}

impl Database {
    pub fn switch(&self, uuid: Uuid) -> Option<&LogicalSwitch> {
        self.switches.get(&uuid)
    }

    pub fn port(&self, uuid: Uuid) -> Option<&LogicalPort> {
        self.ports.get(&uuid)
    }

    pub fn acl(&self, uuid: Uuid) -> Option<&Acl> {
        self.acls.get(&uuid)
    }

    pub fn contains(&self, table: TableKind, uuid: Uuid) -> bool {
        match table {
            TableKind::LogicalSwitch => self.switches.contains_key(&uuid),
            TableKind::LogicalPort => self.ports.contains_key(&uuid),
            TableKind::Acl => self.acls.contains_key(&uuid),
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Find a switch by UUID, falling back to a name scan.
    ///
    /// More than one switch with the given name is always an error.
    /// Absence is an error only when `must_exist` is set.
    pub fn switch_by_name_or_uuid(
        &self,
        id: &str,
        must_exist: bool,
    ) -> Result<Option<&LogicalSwitch>, CoreError> {
        let parsed = Uuid::parse_str(id).ok();
        if let Some(found) = parsed.and_then(|uuid| self.switches.get(&uuid)) {
            return Ok(Some(found));
        }

        let mut found = None;
        for sw in self.switches.values().filter(|sw| sw.name == id) {
            if found.is_some() {
                return Err(CoreError::Ambiguous { name: id.to_owned() });
            }
            found = Some(sw);
        }

        if found.is_none() && must_exist {
            return Err(not_found("lswitch", id));
        }
        Ok(found)
    }

    /// Like [`Self::switch_by_name_or_uuid`] with `must_exist` set.
    pub fn require_switch(&self, id: &str) -> Result<&LogicalSwitch, CoreError> {
        self.switch_by_name_or_uuid(id, true)?
            .ok_or_else(|| not_found("lswitch", id))
    }

    /// Find a port by UUID, falling back to the first port with that name.
    pub fn port_by_name_or_uuid(
        &self,
        id: &str,
        must_exist: bool,
    ) -> Result<Option<&LogicalPort>, CoreError> {
        let parsed = Uuid::parse_str(id).ok();
        let found = parsed
            .and_then(|uuid| self.ports.get(&uuid))
            .or_else(|| self.ports.values().find(|port| port.name == id));

        if found.is_none() && must_exist {
            return Err(not_found("lport", id));
        }
        Ok(found)
    }

    pub fn require_port(&self, id: &str) -> Result<&LogicalPort, CoreError> {
        self.port_by_name_or_uuid(id, true)?
            .ok_or_else(|| not_found("lport", id))
    }

    /// The switch whose `ports` collection holds `port`.
    ///
    /// Every port must have an owner, so a miss is a schema violation.
    pub fn port_owner(&self, port: &LogicalPort) -> Result<&LogicalSwitch, CoreError> {
        self.switches
            .values()
            .find(|sw| sw.ports.contains(&port.uuid))
            .ok_or_else(|| {
                CoreError::SchemaViolation(format!(
                    "logical port {} is not part of any logical switch",
                    port.name
                ))
            })
    }

    /// Resolve a record argument of the generic database commands.
    ///
    /// Switches and ports accept names; ACLs only UUIDs.
    pub fn find_record(&self, table: TableKind, id: &str) -> Result<Option<Uuid>, CoreError> {
        let found = match table {
            TableKind::LogicalSwitch => self.switch_by_name_or_uuid(id, false)?.map(|sw| sw.uuid),
            TableKind::LogicalPort => self.port_by_name_or_uuid(id, false)?.map(|p| p.uuid),
            TableKind::Acl => Uuid::parse_str(id)
                .ok()
                .filter(|uuid| self.acls.contains_key(uuid)),
        };
        Ok(found)
    }

    /// Every row UUID of `table`, in insertion order.
    pub fn uuids(&self, table: TableKind) -> Vec<Uuid> {
        match table {
            TableKind::LogicalSwitch => self.switches.keys().copied().collect(),
            TableKind::LogicalPort => self.ports.keys().copied().collect(),
            TableKind::Acl => self.acls.keys().copied().collect(),
        }
    }

    /// `_uuid` plus every column of one row, rendered.
    pub fn rendered_row(&self, table: TableKind, uuid: Uuid) -> Option<Vec<String>> {
        match table {
            TableKind::LogicalSwitch => self.switch(uuid).map(Record::rendered_row),
            TableKind::LogicalPort => self.port(uuid).map(Record::rendered_row),
            TableKind::Acl => self.acl(uuid).map(Record::rendered_row),
        }
    }

    /// Render one record's column for `list`/`wait-until`.
    pub fn render_column(&self, table: TableKind, uuid: Uuid, column: &str) -> Option<String> {
        match table {
            TableKind::LogicalSwitch => self.switch(uuid)?.render_column(column),
            TableKind::LogicalPort => self.port(uuid)?.render_column(column),
            TableKind::Acl => self.acl(uuid)?.render_column(column),
        }
    }

    /// The ports a switch references, skipping dangling references.
    pub fn ports_of<'a>(&'a self, sw: &'a LogicalSwitch) -> impl Iterator<Item = &'a LogicalPort> {
        sw.ports.iter().filter_map(|uuid| self.ports.get(uuid))
    }

    /// The ACLs of a switch in listing order.
    pub fn sorted_acls_of(&self, sw: &LogicalSwitch) -> Vec<&Acl> {
        let mut acls: Vec<&Acl> = sw.acls.iter().filter_map(|uuid| self.acls.get(uuid)).collect();
        acls.sort_by(|a, b| a.listing_cmp(b));
        acls
    }

    // ── Integrity ────────────────────────────────────────────────────

    /// Drop ports and ACLs that no switch references. Returns how many
    /// rows were removed.
    pub fn collect_garbage(&mut self) -> usize {
        let live_ports: HashSet<Uuid> =
            self.switches.values().flat_map(|sw| sw.ports.iter().copied()).collect();
        let live_acls: HashSet<Uuid> =
            self.switches.values().flat_map(|sw| sw.acls.iter().copied()).collect();

        let before = self.ports.len() + self.acls.len();
        self.ports.retain(|uuid, _| live_ports.contains(uuid));
        self.acls.retain(|uuid, _| live_acls.contains(uuid));
        before - (self.ports.len() + self.acls.len())
    }

    /// Every reference must resolve and every port or ACL must have
    /// exactly one owning switch.
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut owners: HashMap<Uuid, &LogicalSwitch> = HashMap::new();
        for sw in self.switches.values() {
            let refs = sw
                .ports
                .iter()
                .map(|u| (u, TableKind::LogicalPort))
                .chain(sw.acls.iter().map(|u| (u, TableKind::Acl)));
            for (uuid, table) in refs {
                if !self.contains(table, *uuid) {
                    return Err(format!(
                        "lswitch {} references nonexistent {table} row {uuid}",
                        sw.display_name()
                    ));
                }
                if let Some(previous) = owners.insert(*uuid, sw) {
                    if previous.uuid != sw.uuid {
                        return Err(format!(
                            "{table} row {uuid} is referenced by both lswitch {} and lswitch {}",
                            previous.display_name(),
                            sw.display_name()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn not_found(entity: &'static str, id: &str) -> CoreError {
    CoreError::NotFound {
        entity,
        id: id.to_owned(),
        by: if Uuid::parse_str(id).is_ok() {
            LookupKind::Uuid
        } else {
            LookupKind::Name
        },
    }
}
