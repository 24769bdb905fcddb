// ── Logical switch commands ──

use std::fmt::Write as _;

use tracing::debug;

use super::must_exist;
use crate::command::{Context, Handler};
use crate::error::CoreError;
use crate::model::{Database, LogicalSwitch};

pub struct Show;
pub struct LswitchAdd;
pub struct LswitchDel;
pub struct LswitchList;

fn print_switch(db: &Database, sw: &LogicalSwitch, out: &mut String) {
    let _ = writeln!(out, "    lswitch {} ({})", sw.uuid, sw.name);
    for port in db.ports_of(sw) {
        let _ = writeln!(out, "        lport {}", port.name);
        if let Some(parent) = &port.parent_name {
            let _ = writeln!(out, "            parent: {parent}");
        }
        if let Some(tag) = port.tag {
            let _ = writeln!(out, "            tag: {tag}");
        }
        if !port.addresses.is_empty() {
            let quoted: Vec<String> = port.addresses.iter().map(|a| format!("\"{a}\"")).collect();
            let _ = writeln!(out, "            addresses: [{}]", quoted.join(", "));
        }
    }
}

impl Handler for Show {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let db = ctx.db();
        let mut out = String::new();
        if let Some(id) = ctx.args.first() {
            if let Some(sw) = db.switch_by_name_or_uuid(id, false)? {
                print_switch(db, sw, &mut out);
            }
        } else {
            for sw in db.switches.values() {
                print_switch(db, sw, &mut out);
            }
        }
        ctx.output.output.push_str(&out);
        Ok(())
    }
}

impl Handler for LswitchAdd {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let name = ctx.args.first().cloned();
        let may_exist = ctx.has_option("--may-exist");
        let add_duplicate = ctx.has_option("--add-duplicate");
        if may_exist && add_duplicate {
            return Err(CoreError::invalid(
                "--may-exist and --add-duplicate may not be used together",
            ));
        }

        match &name {
            Some(name) if !add_duplicate => {
                if ctx.db().switches.values().any(|sw| sw.name == *name) {
                    if may_exist {
                        debug!(%name, "lswitch already exists");
                        return Ok(());
                    }
                    return Err(CoreError::AlreadyExists {
                        entity: "lswitch",
                        name: name.clone(),
                    });
                }
            }
            Some(_) => {}
            None if may_exist => {
                return Err(CoreError::invalid("--may-exist requires specifying a name"));
            }
            None if add_duplicate => {
                return Err(CoreError::invalid("--add-duplicate requires specifying a name"));
            }
            None => {}
        }

        ctx.txn.insert_switch(LogicalSwitch::new(name.unwrap_or_default()));
        Ok(())
    }
}

impl Handler for LswitchDel {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let found = ctx
            .db()
            .switch_by_name_or_uuid(ctx.arg(0), must_exist(ctx))?
            .map(|sw| sw.uuid);
        if let Some(uuid) = found {
            // Its ports and ACLs go with it at garbage collection.
            ctx.txn.delete_switch(uuid);
        }
        Ok(())
    }
}

impl Handler for LswitchList {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let mut lines: Vec<(&str, String)> = ctx
            .db()
            .switches
            .values()
            .map(|sw| (sw.name.as_str(), format!("{} ({})", sw.uuid, sw.name)))
            .collect();
        lines.sort_by(|a, b| a.0.cmp(b.0));
        let out: String = lines.into_iter().map(|(_, line)| line + "\n").collect();
        ctx.output.output.push_str(&out);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::CoreError;
    use crate::handlers::testing::Harness;
    use crate::model::Database;

    #[test]
    fn add_twice_fails_without_may_exist() {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        let err = h.run(&["lswitch-add", "sw0"]).unwrap_err();
        assert_eq!(err.to_string(), "sw0: an lswitch with this name already exists");

        h.run(&["--may-exist", "lswitch-add", "sw0"]).unwrap();
        assert_eq!(h.db().switches.len(), 1);
    }

    #[test]
    fn add_duplicate_makes_names_ambiguous() {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        h.run(&["--add-duplicate", "lswitch-add", "sw0"]).unwrap();
        assert_eq!(h.db().switches.len(), 2);

        let err = h.run(&["lswitch-del", "sw0"]).unwrap_err();
        assert!(matches!(err, CoreError::Ambiguous { .. }));
    }

    #[test]
    fn option_combinations_are_validated() {
        let mut h = Harness::new(Database::default());
        let err = h
            .run(&["--may-exist", "--add-duplicate", "lswitch-add", "sw0"])
            .unwrap_err();
        assert_eq!(err.to_string(), "--may-exist and --add-duplicate may not be used together");

        let err = h.run(&["--may-exist", "lswitch-add"]).unwrap_err();
        assert_eq!(err.to_string(), "--may-exist requires specifying a name");
        let err = h.run(&["--add-duplicate", "lswitch-add"]).unwrap_err();
        assert_eq!(err.to_string(), "--add-duplicate requires specifying a name");

        h.run(&["lswitch-add"]).unwrap();
        assert_eq!(h.db().switches.values().next().unwrap().name, "");
    }

    #[test]
    fn delete_respects_if_exists() {
        let mut h = Harness::new(Database::default());
        let err = h.run(&["lswitch-del", "ghost"]).unwrap_err();
        assert_eq!(err.to_string(), "ghost: lswitch name not found");
        h.run(&["--if-exists", "lswitch-del", "ghost"]).unwrap();

        h.run(&["lswitch-add", "sw0"]).unwrap();
        h.run(&["lswitch-del", "sw0"]).unwrap();
        assert!(h.db().switches.is_empty());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let mut h = Harness::new(Database::default());
        for name in ["beta", "alpha", "gamma"] {
            h.run(&["lswitch-add", name]).unwrap();
        }
        let out = h.out(&["lswitch-list"]).unwrap();
        let names: Vec<&str> = out
            .lines()
            .map(|line| line.rsplit_once('(').unwrap().1.trim_end_matches(')'))
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn show_prints_ports_with_parent_tag_and_addresses() {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        h.run(&["lport-add", "sw0", "vm1"]).unwrap();
        h.run(&["lport-add", "sw0", "vif1", "vm1", "42"]).unwrap();
        h.run(&["lport-set-addresses", "vm1", "aa:bb:cc:dd:ee:ff 10.0.0.1"])
            .unwrap();

        let out = h.out(&["show", "sw0"]).unwrap();
        let uuid = h.db().switches.keys().next().unwrap();
        assert_eq!(
            out,
            format!(
                "    lswitch {uuid} (sw0)\n\
                 \x20       lport vm1\n\
                 \x20           addresses: [\"aa:bb:cc:dd:ee:ff 10.0.0.1\"]\n\
                 \x20       lport vif1\n\
                 \x20           parent: vm1\n\
                 \x20           tag: 42\n"
            )
        );
        assert_eq!(h.out(&["show", "nope"]).unwrap(), "");
    }
}
