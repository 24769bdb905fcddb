// ── Transaction application ──
//
// Replays a transaction onto the store's current state. Shared by every
// store implementation so commit semantics are identical across them.

use crate::model::{ColumnRef, Database, TableKind};

use super::txn::Transaction;

#[derive(Debug)]
pub(crate) enum Applied {
    /// The transaction changes nothing.
    Unchanged,
    /// The next generation of the database.
    Changed(Database),
    /// Something the transaction depended on changed since its snapshot.
    Conflict(String),
    /// Applying would break referential integrity.
    Invalid(String),
}

pub(crate) fn apply(txn: &Transaction, current: &Database) -> Applied {
    let base = txn.base();
    let working = txn.db();

    // Optimistic check: every verified column must still hold the value
    // the transaction read.
    for column in txn.verified() {
        if txn.is_inserted(column.row()) {
            continue;
        }
        let unchanged = match *column {
            ColumnRef::Switch(uuid, col) => match (base.switch(uuid), current.switch(uuid)) {
                (Some(then), Some(now)) => then.column_eq(now, col),
                (None, None) => true,
                _ => false,
            },
            ColumnRef::Port(uuid, col) => match (base.port(uuid), current.port(uuid)) {
                (Some(then), Some(now)) => then.column_eq(now, col),
                (None, None) => true,
                _ => false,
            },
        };
        if !unchanged {
            return Applied::Conflict(format!("verified column {column:?} changed"));
        }
    }

    let mut next = current.clone();

    for column in txn.written() {
        let uuid = column.row();
        if txn.is_inserted(uuid) {
            continue;
        }
        match *column {
            ColumnRef::Switch(uuid, col) => {
                // Deleted later in the same transaction.
                let Some(source) = working.switch(uuid) else { continue };
                let Some(target) = next.switches.get_mut(&uuid) else {
                    return Applied::Conflict(format!("lswitch {uuid} was deleted"));
                };
                target.copy_column(source, col);
            }
            ColumnRef::Port(uuid, col) => {
                let Some(source) = working.port(uuid) else { continue };
                let Some(target) = next.ports.get_mut(&uuid) else {
                    return Applied::Conflict(format!("lport {uuid} was deleted"));
                };
                target.copy_column(source, col);
            }
        }
    }

    for &(table, uuid) in txn.inserted() {
        match table {
            TableKind::LogicalSwitch => {
                if let Some(row) = working.switch(uuid) {
                    next.switches.insert(uuid, row.clone());
                }
            }
            TableKind::LogicalPort => {
                if let Some(row) = working.port(uuid) {
                    next.ports.insert(uuid, row.clone());
                }
            }
            TableKind::Acl => {
                if let Some(row) = working.acl(uuid) {
                    next.acls.insert(uuid, row.clone());
                }
            }
        }
    }

    for &(table, uuid) in txn.deleted() {
        let removed = match table {
            TableKind::LogicalSwitch => next.switches.shift_remove(&uuid).is_some(),
            TableKind::LogicalPort => next.ports.shift_remove(&uuid).is_some(),
            TableKind::Acl => next.acls.shift_remove(&uuid).is_some(),
        };
        if !removed {
            return Applied::Conflict(format!("{table} row {uuid} was already deleted"));
        }
    }

    next.collect_garbage();

    if let Err(reason) = next.check_integrity() {
        return Applied::Invalid(reason);
    }

    if next.switches == current.switches && next.ports == current.ports && next.acls == current.acls {
        return Applied::Unchanged;
    }
    next.generation = current.generation + 1;
    Applied::Changed(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::model::{LogicalPort, LogicalSwitch, SwitchColumn};

    fn one_switch() -> (Database, Uuid) {
        let mut db = Database::default();
        let sw = LogicalSwitch::new("sw0");
        let uuid = sw.uuid;
        db.switches.insert(uuid, sw);
        (db, uuid)
    }

    fn add_port(txn: &mut Transaction, sw: Uuid, name: &str) {
        let port = txn.insert_port(LogicalPort::new(name));
        txn.verify_switch_mut(sw, SwitchColumn::Ports).unwrap().ports.push(port);
    }

    #[test]
    fn empty_transaction_is_unchanged() {
        let (db, _) = one_switch();
        let txn = Transaction::new(Arc::new(db.clone()));
        assert!(matches!(apply(&txn, &db), Applied::Unchanged));
    }

    #[test]
    fn insert_bumps_generation() {
        let (db, sw) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        add_port(&mut txn, sw, "p1");

        let Applied::Changed(next) = apply(&txn, &db) else { panic!("expected change") };
        assert_eq!(next.generation, db.generation + 1);
        assert_eq!(next.ports.len(), 1);
        assert_eq!(next.switch(sw).unwrap().ports.len(), 1);
    }

    #[test]
    fn concurrent_change_to_verified_column_conflicts() {
        let (db, sw) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        add_port(&mut txn, sw, "p1");

        // Another client adds a port first.
        let mut other = Transaction::new(Arc::new(db.clone()));
        add_port(&mut other, sw, "p2");
        let Applied::Changed(current) = apply(&other, &db) else { panic!("expected change") };

        assert!(matches!(apply(&txn, &current), Applied::Conflict(_)));
    }

    #[test]
    fn unverified_write_to_unrelated_column_merges() {
        let (db, sw) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        txn.switch_mut(sw, SwitchColumn::Name).unwrap().name = "renamed".into();

        let mut other = Transaction::new(Arc::new(db.clone()));
        add_port(&mut other, sw, "p2");
        let Applied::Changed(current) = apply(&other, &db) else { panic!("expected change") };

        let Applied::Changed(next) = apply(&txn, &current) else { panic!("expected change") };
        let merged = next.switch(sw).unwrap();
        assert_eq!(merged.name, "renamed");
        assert_eq!(merged.ports.len(), 1);
    }

    #[test]
    fn write_to_concurrently_deleted_row_conflicts() {
        let (db, sw) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        txn.switch_mut(sw, SwitchColumn::Name).unwrap().name = "x".into();

        let mut current = db.clone();
        current.switches.clear();
        assert!(matches!(apply(&txn, &current), Applied::Conflict(_)));
    }

    #[test]
    fn orphaned_inserts_are_collected() {
        let (db, _) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        txn.insert_port(LogicalPort::new("orphan"));
        assert!(matches!(apply(&txn, &db), Applied::Unchanged));
    }

    #[test]
    fn dangling_reference_is_invalid() {
        let (db, sw) = one_switch();
        let mut txn = Transaction::new(Arc::new(db.clone()));
        txn.switch_mut(sw, SwitchColumn::Ports).unwrap().ports.push(Uuid::new_v4());
        assert!(matches!(apply(&txn, &db), Applied::Invalid(_)));
    }
}
