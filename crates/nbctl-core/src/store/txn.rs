// ── Transactions ──
//
// A transaction is a private working copy of one snapshot plus a record
// of what was read (`verify`) and written. Nothing is visible to other
// views until the store accepts the transaction in `commit`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{
    Acl, ColumnRef, Database, LogicalPort, LogicalSwitch, PortColumn, SwitchColumn, TableKind,
};

#[derive(Debug)]
pub struct Transaction {
    base: Arc<Database>,
    working: Database,
    verified: BTreeSet<ColumnRef>,
    written: BTreeSet<ColumnRef>,
    inserted: Vec<(TableKind, Uuid)>,
    deleted: Vec<(TableKind, Uuid)>,
    comments: Vec<String>,
    dry_run: bool,
    finished: bool,
}

impl Transaction {
    pub fn new(base: Arc<Database>) -> Self {
        let working = (*base).clone();
        Self {
            base,
            working,
            verified: BTreeSet::new(),
            written: BTreeSet::new(),
            inserted: Vec::new(),
            deleted: Vec::new(),
            comments: Vec::new(),
            dry_run: false,
            finished: false,
        }
    }

    /// The transaction's own view: the base snapshot plus every change
    /// made so far.
    pub fn db(&self) -> &Database {
        &self.working
    }

    pub fn base(&self) -> &Database {
        &self.base
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    pub fn comment(&self) -> String {
        self.comments.join("\n")
    }

    // ── Reads and writes ─────────────────────────────────────────────

    /// Require `column` to be unchanged at commit time.
    pub fn verify(&mut self, column: ColumnRef) {
        self.verified.insert(column);
    }

    /// Mutable access to a switch, recording `column` as written.
    pub fn switch_mut(
        &mut self,
        uuid: Uuid,
        column: SwitchColumn,
    ) -> Result<&mut LogicalSwitch, CoreError> {
        let sw = self
            .working
            .switches
            .get_mut(&uuid)
            .ok_or_else(|| CoreError::Internal(format!("lswitch {uuid} vanished from transaction")))?;
        self.written.insert(ColumnRef::Switch(uuid, column));
        Ok(sw)
    }

    /// Mutable access to a port, recording `column` as written.
    pub fn port_mut(&mut self, uuid: Uuid, column: PortColumn) -> Result<&mut LogicalPort, CoreError> {
        let port = self
            .working
            .ports
            .get_mut(&uuid)
            .ok_or_else(|| CoreError::Internal(format!("lport {uuid} vanished from transaction")))?;
        self.written.insert(ColumnRef::Port(uuid, column));
        Ok(port)
    }

    /// Verify `column` of a switch, then take it for writing.
    pub fn verify_switch_mut(
        &mut self,
        uuid: Uuid,
        column: SwitchColumn,
    ) -> Result<&mut LogicalSwitch, CoreError> {
        self.verify(ColumnRef::Switch(uuid, column));
        self.switch_mut(uuid, column)
    }

    /// Verify `column` of a port, then take it for writing.
    pub fn verify_port_mut(
        &mut self,
        uuid: Uuid,
        column: PortColumn,
    ) -> Result<&mut LogicalPort, CoreError> {
        self.verify(ColumnRef::Port(uuid, column));
        self.port_mut(uuid, column)
    }

    pub fn insert_switch(&mut self, sw: LogicalSwitch) -> Uuid {
        let uuid = sw.uuid;
        self.working.switches.insert(uuid, sw);
        self.inserted.push((TableKind::LogicalSwitch, uuid));
        uuid
    }

    pub fn insert_port(&mut self, port: LogicalPort) -> Uuid {
        let uuid = port.uuid;
        self.working.ports.insert(uuid, port);
        self.inserted.push((TableKind::LogicalPort, uuid));
        uuid
    }

    pub fn insert_acl(&mut self, acl: Acl) -> Uuid {
        let uuid = acl.uuid;
        self.working.acls.insert(uuid, acl);
        self.inserted.push((TableKind::Acl, uuid));
        uuid
    }

    pub fn delete_switch(&mut self, uuid: Uuid) {
        if self.working.switches.shift_remove(&uuid).is_some() {
            self.record_delete(TableKind::LogicalSwitch, uuid);
        }
    }

    pub fn delete_port(&mut self, uuid: Uuid) {
        if self.working.ports.shift_remove(&uuid).is_some() {
            self.record_delete(TableKind::LogicalPort, uuid);
        }
    }

    pub fn delete_acl(&mut self, uuid: Uuid) {
        if self.working.acls.shift_remove(&uuid).is_some() {
            self.record_delete(TableKind::Acl, uuid);
        }
    }

    /// The permanent UUID of a row this transaction inserted.
    ///
    /// Rows keep the UUID they were inserted with, so this is only a
    /// membership check.
    pub fn inserted_uuid(&self, uuid: Uuid) -> Option<Uuid> {
        self.inserted
            .iter()
            .any(|(_, inserted)| *inserted == uuid)
            .then_some(uuid)
    }

    /// Discard the transaction without committing.
    pub fn abort(mut self) {
        debug!(writes = self.written.len(), "transaction aborted");
        self.finished = true;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    // ── Commit-side accessors ────────────────────────────────────────

    pub(crate) fn verified(&self) -> &BTreeSet<ColumnRef> {
        &self.verified
    }

    pub(crate) fn written(&self) -> &BTreeSet<ColumnRef> {
        &self.written
    }

    pub(crate) fn inserted(&self) -> &[(TableKind, Uuid)] {
        &self.inserted
    }

    pub(crate) fn deleted(&self) -> &[(TableKind, Uuid)] {
        &self.deleted
    }

    pub(crate) fn is_inserted(&self, uuid: Uuid) -> bool {
        self.inserted.iter().any(|(_, u)| *u == uuid)
    }

    fn record_delete(&mut self, table: TableKind, uuid: Uuid) {
        if let Some(index) = self.inserted.iter().position(|(_, u)| *u == uuid) {
            self.inserted.swap_remove(index);
        } else {
            self.deleted.push((table, uuid));
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                writes = self.written.len(),
                inserts = self.inserted.len(),
                "uncommitted transaction dropped"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inserts_are_visible_only_in_working_copy() {
        let base = Arc::new(Database::default());
        let mut txn = Transaction::new(Arc::clone(&base));
        let uuid = txn.insert_switch(LogicalSwitch::new("sw0"));

        assert!(txn.db().switch(uuid).is_some());
        assert!(txn.base().switch(uuid).is_none());
        assert_eq!(txn.inserted_uuid(uuid), Some(uuid));
        assert!(base.switches.is_empty());
    }

    #[test]
    fn deleting_an_inserted_row_forgets_the_insert() {
        let mut txn = Transaction::new(Arc::new(Database::default()));
        let uuid = txn.insert_port(LogicalPort::new("p"));
        txn.delete_port(uuid);
        assert!(txn.inserted().is_empty());
        assert!(txn.deleted().is_empty());
        assert_eq!(txn.inserted_uuid(uuid), None);
    }

    #[test]
    fn writes_and_verifies_are_recorded() {
        let mut db = Database::default();
        let sw = LogicalSwitch::new("sw0");
        let uuid = sw.uuid;
        db.switches.insert(uuid, sw);

        let mut txn = Transaction::new(Arc::new(db));
        txn.verify_switch_mut(uuid, SwitchColumn::Ports)
            .unwrap()
            .ports
            .push(Uuid::new_v4());

        let column = ColumnRef::Switch(uuid, SwitchColumn::Ports);
        assert!(txn.verified().contains(&column));
        assert!(txn.written().contains(&column));
        assert!(txn.switch_mut(Uuid::new_v4(), SwitchColumn::Name).is_err());
    }
}
