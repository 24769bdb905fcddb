// ── Generic database commands ──
//
// `list`, `create`, `add` and `wait-until` work on any managed table by
// column name, using the text forms in `model::datum`. References to
// rows created earlier in the batch go through the symbol table as
// `@name`.

use std::fmt::Write as _;

use tracing::warn;
use uuid::Uuid;

use super::dedup;
use crate::command::{Context, Handler, PostContext, PrereqContext, Table};
use crate::error::CoreError;
use crate::model::datum::{parse_map, parse_set, value_matches};
use crate::model::{
    Acl, Database, LogicalPort, LogicalSwitch, PortColumn, Record, SwitchColumn, TableKind,
};
use crate::symbol::SymbolTable;

pub struct List;
pub struct Create;
pub struct Add;
pub struct WaitUntil;

fn no_row(table: TableKind, id: &str) -> CoreError {
    CoreError::invalid(format!("no row \"{id}\" in table {table}"))
}

fn split_assignment(arg: &str) -> Result<(&str, &str), CoreError> {
    arg.split_once('=').ok_or_else(|| {
        CoreError::invalid(format!("{arg}: argument does not end in \"=\" followed by a value."))
    })
}

/// Resolve reference values: UUIDs, or `@name` symbols which count as
/// strong references because only switches hold references.
fn resolve_refs(symbols: &mut SymbolTable, raw: &str) -> Result<Vec<Uuid>, CoreError> {
    parse_set(raw)?
        .iter()
        .map(|atom| {
            if atom.starts_with('@') {
                let symbol = symbols.declare(atom);
                symbol.mark_strong_reference();
                Ok(symbol.uuid)
            } else {
                Uuid::parse_str(atom)
                    .map_err(|_| CoreError::invalid(format!("\"{atom}\" is not a valid UUID")))
            }
        })
        .collect()
}

// ── list ─────────────────────────────────────────────────────────────

impl Handler for List {
    fn prerequisites(&self, ctx: &PrereqContext<'_>) -> Result<(), CoreError> {
        TableKind::parse(ctx.arg(0)).map(|_| ())
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let table = TableKind::parse(ctx.arg(0))?;
        let db = ctx.db();
        let uuids = if ctx.args.len() > 1 {
            ctx.args[1..]
                .iter()
                .map(|id| db.find_record(table, id)?.ok_or_else(|| no_row(table, id)))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            db.uuids(table)
        };

        let mut out = Table::new(std::iter::once("_uuid").chain(table.column_names().iter().copied()));
        for uuid in uuids {
            if let Some(row) = db.rendered_row(table, uuid) {
                out.add_row(row);
            }
        }
        ctx.set_table(out);
        Ok(())
    }
}

// ── create ───────────────────────────────────────────────────────────

impl Handler for Create {
    fn prerequisites(&self, ctx: &PrereqContext<'_>) -> Result<(), CoreError> {
        let table = TableKind::parse(ctx.arg(0))?;
        for arg in &ctx.args[1..] {
            let (column, _) = split_assignment(arg)?;
            table.check_column(column)?;
        }
        Ok(())
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let table = TableKind::parse(ctx.arg(0))?;
        let options = ctx.options;
        let uuid = match options.get("--id").and_then(Option::as_deref) {
            Some(id) => {
                let symbol = ctx.symbols.create(id)?;
                // Root rows persist without being referenced.
                if table.is_root() {
                    symbol.mark_strong_reference();
                }
                symbol.uuid
            }
            None => {
                if !table.is_root() {
                    warn!(
                        "applying \"create\" command to table {table} without --id option will have no effect"
                    );
                }
                Uuid::new_v4()
            }
        };

        let args = ctx.args;
        match table {
            TableKind::LogicalSwitch => {
                let mut sw = LogicalSwitch::new("");
                sw.uuid = uuid;
                for arg in &args[1..] {
                    let (column, value) = split_assignment(arg)?;
                    match column {
                        "ports" => sw.ports = resolve_refs(ctx.symbols, value)?,
                        "acls" => sw.acls = resolve_refs(ctx.symbols, value)?,
                        _ => sw.set_column(column, value)?,
                    }
                }
                ctx.txn.insert_switch(sw);
            }
            TableKind::LogicalPort => {
                let mut port = LogicalPort::new("");
                port.uuid = uuid;
                assign_all(&mut port, &args[1..])?;
                ctx.txn.insert_port(port);
            }
            TableKind::Acl => {
                let mut acl = Acl {
                    uuid,
                    ..Acl::default()
                };
                assign_all(&mut acl, &args[1..])?;
                ctx.txn.insert_acl(acl);
            }
        }

        ctx.write_line(uuid.to_string());
        Ok(())
    }

    fn postprocess(&self, ctx: &mut PostContext<'_>) -> Result<(), CoreError> {
        let Ok(uuid) = Uuid::parse_str(ctx.output.output.trim()) else {
            return Ok(());
        };
        if let Some(permanent) = ctx.txn.inserted_uuid(uuid) {
            ctx.output.output.clear();
            let _ = writeln!(ctx.output.output, "{permanent}");
        }
        Ok(())
    }
}

fn assign_all<R: Record>(row: &mut R, assignments: &[String]) -> Result<(), CoreError> {
    for arg in assignments {
        let (column, value) = split_assignment(arg)?;
        row.set_column(column, value)?;
    }
    Ok(())
}

// ── add ──────────────────────────────────────────────────────────────

impl Handler for Add {
    fn prerequisites(&self, ctx: &PrereqContext<'_>) -> Result<(), CoreError> {
        TableKind::parse(ctx.arg(0))?.check_column(ctx.arg(2))
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let args = ctx.args;
        let table = TableKind::parse(&args[0])?;
        let (record, column) = (args[1].as_str(), args[2].as_str());
        let uuid = ctx.db().find_record(table, record)?.ok_or_else(|| no_row(table, record))?;
        let values = &args[3..];

        match (table, column) {
            (TableKind::LogicalSwitch, "ports" | "acls") => {
                let mut refs = Vec::new();
                for value in values {
                    refs.extend(resolve_refs(ctx.symbols, value)?);
                }
                let column = if column == "ports" { SwitchColumn::Ports } else { SwitchColumn::Acls };
                let sw = ctx.txn.verify_switch_mut(uuid, column)?;
                let list = match column {
                    SwitchColumn::Ports => &mut sw.ports,
                    _ => &mut sw.acls,
                };
                for r in refs {
                    if !list.contains(&r) {
                        list.push(r);
                    }
                }
            }
            (TableKind::LogicalPort, "addresses" | "port_security") => {
                let mut added = Vec::new();
                for value in values {
                    added.extend(parse_set(value)?);
                }
                let (column, current) = match column {
                    "addresses" => {
                        for address in &added {
                            crate::model::port::validate_address(address)?;
                        }
                        (PortColumn::Addresses, current_set(ctx.db(), uuid, |p| &p.addresses))
                    }
                    _ => (PortColumn::PortSecurity, current_set(ctx.db(), uuid, |p| &p.port_security)),
                };
                let merged = dedup(&[current, added].concat());
                let port = ctx.txn.verify_port_mut(uuid, column)?;
                match column {
                    PortColumn::Addresses => port.addresses = merged,
                    _ => port.port_security = merged,
                }
            }
            (TableKind::LogicalPort, "options") => {
                let mut added = Vec::new();
                for value in values {
                    added.extend(parse_map(value)?);
                }
                let options = &mut ctx.txn.verify_port_mut(uuid, PortColumn::Options)?.options;
                // Existing keys win, as with any map `add`.
                for (key, value) in added {
                    options.entry(key).or_insert(value);
                }
            }
            _ => {
                return Err(CoreError::invalid(format!(
                    "cannot add to column {column} of table {table}: not a set or map column"
                )));
            }
        }
        Ok(())
    }
}

fn current_set<F>(db: &Database, uuid: Uuid, column: F) -> Vec<String>
where
    F: Fn(&LogicalPort) -> &Vec<String>,
{
    db.port(uuid).map(|p| column(p).clone()).unwrap_or_default()
}

// ── wait-until ───────────────────────────────────────────────────────

impl Handler for WaitUntil {
    fn prerequisites(&self, ctx: &PrereqContext<'_>) -> Result<(), CoreError> {
        let table = TableKind::parse(ctx.arg(0))?;
        for arg in &ctx.args[2..] {
            let (column, _) = split_assignment(arg)?;
            table.check_column(column)?;
        }
        Ok(())
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let table = TableKind::parse(ctx.arg(0))?;
        ctx.try_again = !conditions_hold(ctx.db(), table, ctx.arg(1), &ctx.args[2..])?;
        Ok(())
    }
}

/// Whether `record` exists and every `COLUMN=VALUE` holds.
fn conditions_hold(
    db: &Database,
    table: TableKind,
    record: &str,
    conditions: &[String],
) -> Result<bool, CoreError> {
    let Some(uuid) = db.find_record(table, record)? else {
        return Ok(false);
    };
    for condition in conditions {
        let (column, expected) = split_assignment(condition)?;
        let Some(actual) = db.render_column(table, uuid, column) else {
            return Err(crate::model::unknown_column(table, column));
        };
        if !value_matches(&actual, expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::testing::Harness;

    #[test]
    fn list_renders_all_columns() {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        let ran = h.run(&["list", "Logical_Switch"]).unwrap();
        let table = ran.output.table.unwrap();
        assert_eq!(table.headings, vec!["_uuid", "acls", "name", "ports"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1..], ["[]", "sw0", "[]"]);

        let err = h.run(&["list", "Logical_Switch", "ghost"]).unwrap_err();
        assert_eq!(err.to_string(), "no row \"ghost\" in table Logical_Switch");
        assert!(h.run(&["list", "Bridge"]).is_err());
    }

    #[test]
    fn create_with_symbol_reference_links_rows() {
        let mut h = Harness::new(Database::default());
        let ran = h
            .run(&[
                "--id=@p",
                "create",
                "Logical_Port",
                "name=p1",
                "--",
                "create",
                "Logical_Switch",
                "name=sw0",
                "ports=@p",
            ])
            .unwrap();

        let port = h.db().require_port("p1").unwrap();
        let sw = h.db().require_switch("sw0").unwrap();
        assert_eq!(sw.ports, vec![port.uuid]);
        assert!(ran.output.output.contains(&port.uuid.to_string()));
        assert!(h.symbols.audit().unwrap().is_empty());
    }

    #[test]
    fn unreferenced_created_port_warns() {
        let mut h = Harness::new(Database::default());
        h.run(&["--id=@p", "create", "Logical_Port", "name=p1"]).unwrap();
        let warnings = h.symbols.audit().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn reference_to_uncreated_symbol_fails_audit() {
        let mut h = Harness::new(Database::default());
        h.run(&["create", "Logical_Switch", "name=sw0", "ports=@ghost"]).unwrap();
        assert!(matches!(
            h.symbols.audit(),
            Err(CoreError::UnresolvedSymbol { ref name }) if name == "@ghost"
        ));
    }

    #[test]
    fn create_validates_columns_up_front() {
        let mut h = Harness::new(Database::default());
        let err = h.run(&["create", "ACL", "colour=red"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ACL does not contain a column whose name matches \"colour\""
        );
        let err = h.run(&["create", "ACL", "priority"]).unwrap_err();
        assert!(err.to_string().contains("does not end in \"=\""));
        let err = h.run(&["--id=p", "create", "ACL"]).unwrap_err();
        assert_eq!(err.to_string(), "row id \"p\" does not begin with \"@\"");
    }

    #[test]
    fn add_appends_with_set_semantics() {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        h.run(&[
            "--id=@a",
            "create",
            "ACL",
            "direction=to-lport",
            "priority=5",
            "match=ip4",
            "action=drop",
            "--",
            "add",
            "Logical_Switch",
            "sw0",
            "acls",
            "@a",
        ])
        .unwrap();
        let acl_uuid = h.db().acls.keys().next().copied().unwrap();
        h.run(&["add", "Logical_Switch", "sw0", "acls", &acl_uuid.to_string()]).unwrap();
        assert_eq!(h.db().require_switch("sw0").unwrap().acls, vec![acl_uuid]);

        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&["add", "Logical_Port", "p1", "port_security", "aa", "[bb, aa]"]).unwrap();
        assert_eq!(h.db().require_port("p1").unwrap().port_security, vec!["aa", "bb"]);

        h.run(&["add", "Logical_Port", "p1", "options", "k=v"]).unwrap();
        h.run(&["add", "Logical_Port", "p1", "options", "k=other"]).unwrap();
        assert_eq!(
            h.db().require_port("p1").unwrap().options.get("k").map(String::as_str),
            Some("v")
        );

        let err = h.run(&["add", "Logical_Port", "p1", "type", "x"]).unwrap_err();
        assert!(err.to_string().contains("not a set or map column"));
    }

    #[test]
    fn wait_until_requests_retry_until_condition_holds() {
        let mut h = Harness::new(Database::default());
        assert!(h.run(&["wait-until", "Logical_Switch", "sw0"]).unwrap().try_again);

        h.run(&["lswitch-add", "sw0"]).unwrap();
        assert!(!h.run(&["wait-until", "Logical_Switch", "sw0"]).unwrap().try_again);

        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        assert!(h.run(&["wait-until", "Logical_Port", "p1", "up=true"]).unwrap().try_again);
        h.run(&["lport-set-type", "p1", "router"]).unwrap();
        assert!(!h.run(&["wait-until", "Logical_Port", "p1", "type=router"]).unwrap().try_again);

        assert!(h.run(&["wait-until", "Logical_Port", "p1", "bogus=1"]).is_err());
    }
}
