// ── Logical port commands ──

use std::collections::BTreeMap;

use tracing::debug;

use super::{dedup, must_exist};
use crate::command::{Context, Handler};
use crate::error::CoreError;
use crate::model::port::{parse_tag, validate_address};
use crate::model::{LogicalPort, PortColumn, SwitchColumn};

pub struct LportAdd;
pub struct LportDel;
pub struct LportList;
pub struct LportGetParent;
pub struct LportGetTag;
pub struct LportSetAddresses;
pub struct LportGetAddresses;
pub struct LportSetPortSecurity;
pub struct LportGetPortSecurity;
pub struct LportGetUp;
pub struct LportSetEnabled;
pub struct LportGetEnabled;
pub struct LportSetType;
pub struct LportGetType;
pub struct LportSetOptions;
pub struct LportGetOptions;

impl Handler for LportAdd {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let may_exist = ctx.has_option("--may-exist");
        let sw_uuid = ctx.db().require_switch(ctx.arg(0))?.uuid;

        let (parent, tag) = match ctx.args.len() {
            2 => (None, None),
            4 => (Some(ctx.arg(2).to_owned()), Some(parse_tag(ctx.arg(3))?)),
            _ => {
                return Err(CoreError::invalid(
                    "lport-add with parent must also specify a tag",
                ));
            }
        };

        let name = ctx.arg(1).to_owned();
        if let Some(existing) = ctx.db().port_by_name_or_uuid(&name, false)? {
            if !may_exist {
                return Err(CoreError::AlreadyExists { entity: "lport", name });
            }
            let owner = ctx.db().port_owner(existing)?;
            if owner.uuid != sw_uuid {
                return Err(CoreError::conflict(
                    name,
                    format!("lport already exists but in lswitch {}", owner.display_name()),
                ));
            }
            check_existing_parent(&name, existing, parent.as_deref(), tag)?;
            debug!(%name, "lport already exists");
            return Ok(());
        }

        let mut port = LogicalPort::new(name);
        port.parent_name = parent;
        port.tag = tag;
        let port_uuid = ctx.txn.insert_port(port);
        ctx.txn
            .verify_switch_mut(sw_uuid, SwitchColumn::Ports)?
            .ports
            .push(port_uuid);
        Ok(())
    }
}

/// `--may-exist` only succeeds if the existing port has the same
/// parent and tag as requested.
fn check_existing_parent(
    name: &str,
    existing: &LogicalPort,
    parent: Option<&str>,
    tag: Option<u16>,
) -> Result<(), CoreError> {
    match (parent, tag) {
        (Some(parent), Some(tag)) => {
            match existing.parent_name.as_deref() {
                None => {
                    return Err(CoreError::conflict(name, "lport already exists but has no parent"));
                }
                Some(current) if current != parent => {
                    return Err(CoreError::conflict(
                        name,
                        format!("lport already exists with different parent {current}"),
                    ));
                }
                Some(_) => {}
            }
            match existing.tag {
                None => Err(CoreError::conflict(name, "lport already exists but has no tag")),
                Some(current) if current != tag => Err(CoreError::conflict(
                    name,
                    format!("lport already exists with different tag {current}"),
                )),
                Some(_) => Ok(()),
            }
        }
        _ => match &existing.parent_name {
            Some(current) => Err(CoreError::conflict(
                name,
                format!("lport already exists but has parent {current}"),
            )),
            None => Ok(()),
        },
    }
}

impl Handler for LportDel {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let db = ctx.db();
        let Some(port) = db.port_by_name_or_uuid(ctx.arg(0), must_exist(ctx))? else {
            return Ok(());
        };
        let port_uuid = port.uuid;
        let owner = db.port_owner(port)?.uuid;

        // Removing the reference is what deletes the row once the store
        // collects garbage; the explicit delete hides it from later
        // commands in this batch.
        ctx.txn
            .verify_switch_mut(owner, SwitchColumn::Ports)?
            .swap_remove_port(port_uuid);
        ctx.txn.delete_port(port_uuid);
        Ok(())
    }
}

impl Handler for LportList {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let db = ctx.db();
        let sw = db.require_switch(ctx.arg(0))?;
        let mut lines: Vec<(&str, String)> = db
            .ports_of(sw)
            .map(|port| (port.name.as_str(), format!("{} ({})", port.uuid, port.name)))
            .collect();
        lines.sort_by(|a, b| a.0.cmp(b.0));
        let out: String = lines.into_iter().map(|(_, line)| line + "\n").collect();
        ctx.output.output.push_str(&out);
        Ok(())
    }
}

/// Look up the port named by the first argument and render something
/// from it as output lines.
fn get_lines<F>(ctx: &mut Context<'_>, render: F) -> Result<(), CoreError>
where
    F: FnOnce(&LogicalPort) -> Vec<String>,
{
    let lines = render(ctx.db().require_port(ctx.arg(0))?);
    for line in lines {
        ctx.write_line(line);
    }
    Ok(())
}

/// Resolve the port named by the first argument and open `column` for
/// writing.
fn set_column<'c>(
    ctx: &'c mut Context<'_>,
    column: PortColumn,
) -> Result<&'c mut LogicalPort, CoreError> {
    let uuid = ctx.db().require_port(ctx.arg(0))?.uuid;
    ctx.txn.port_mut(uuid, column)
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values
}

impl Handler for LportGetParent {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| port.parent_name.iter().cloned().collect())
    }
}

impl Handler for LportGetTag {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| port.tag.iter().map(u16::to_string).collect())
    }
}

impl Handler for LportSetAddresses {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let addresses = &ctx.args[1..];
        for address in addresses {
            validate_address(address)?;
        }
        let addresses = dedup(addresses);
        set_column(ctx, PortColumn::Addresses)?.addresses = addresses;
        Ok(())
    }
}

impl Handler for LportGetAddresses {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| sorted(&port.addresses))
    }
}

impl Handler for LportSetPortSecurity {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let addrs = dedup(&ctx.args[1..]);
        set_column(ctx, PortColumn::PortSecurity)?.port_security = addrs;
        Ok(())
    }
}

impl Handler for LportGetPortSecurity {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| sorted(&port.port_security))
    }
}

impl Handler for LportGetUp {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| {
            vec![if port.is_up() { "up" } else { "down" }.to_owned()]
        })
    }
}

impl Handler for LportSetEnabled {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let state = ctx.arg(1);
        let enabled = if state.eq_ignore_ascii_case("enabled") {
            true
        } else if state.eq_ignore_ascii_case("disabled") {
            false
        } else {
            return Err(CoreError::invalid(format!(
                "{state}: state must be \"enabled\" or \"disabled\""
            )));
        };
        set_column(ctx, PortColumn::Enabled)?.enabled = Some(enabled);
        Ok(())
    }
}

impl Handler for LportGetEnabled {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| {
            vec![if port.is_enabled() { "enabled" } else { "disabled" }.to_owned()]
        })
    }
}

impl Handler for LportSetType {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let port_type = ctx.arg(1).to_owned();
        set_column(ctx, PortColumn::Type)?.port_type = port_type;
        Ok(())
    }
}

impl Handler for LportGetType {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| vec![port.port_type.clone()])
    }
}

impl Handler for LportSetOptions {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        // Arguments without `=` are ignored.
        let options: BTreeMap<String, String> = ctx.args[1..]
            .iter()
            .filter_map(|arg| arg.split_once('='))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        set_column(ctx, PortColumn::Options)?.options = options;
        Ok(())
    }
}

impl Handler for LportGetOptions {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        get_lines(ctx, |port| {
            port.options
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::CoreError;
    use crate::handlers::testing::Harness;
    use crate::model::{Database, LogicalPort};

    fn with_switch(names: &[&str]) -> Harness {
        let mut h = Harness::new(Database::default());
        for name in names {
            h.run(&["lswitch-add", name]).unwrap();
        }
        h
    }

    fn port<'a>(h: &'a Harness, name: &str) -> &'a LogicalPort {
        h.db().port_by_name_or_uuid(name, true).unwrap().unwrap()
    }

    #[test]
    fn add_attaches_port_to_switch() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        let sw = h.db().require_switch("sw0").unwrap();
        assert_eq!(sw.ports, vec![port(&h, "p1").uuid]);
    }

    #[test]
    fn tag_requires_parent_and_range() {
        let mut h = with_switch(&["sw0"]);
        let err = h.run(&["lport-add", "sw0", "p1", "parent"]).unwrap_err();
        assert_eq!(err.to_string(), "lport-add with parent must also specify a tag");
        for bad in ["4096", "-1"] {
            let err = h.run(&["lport-add", "sw0", "p1", "parent", bad]).unwrap_err();
            assert_eq!(err.to_string(), format!("{bad}: invalid tag"));
        }
        h.run(&["lport-add", "sw0", "p1", "parent", "4095"]).unwrap();
        assert_eq!(port(&h, "p1").tag, Some(4095));
        assert_eq!(port(&h, "p1").parent_name.as_deref(), Some("parent"));
    }

    #[test]
    fn may_exist_is_idempotent_with_matching_arguments() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        let err = h.run(&["lport-add", "sw0", "p1"]).unwrap_err();
        assert_eq!(err.to_string(), "p1: an lport with this name already exists");

        h.run(&["--may-exist", "lport-add", "sw0", "p1"]).unwrap();
        assert_eq!(h.db().require_switch("sw0").unwrap().ports.len(), 1);
        assert_eq!(h.db().ports.len(), 1);
    }

    #[test]
    fn may_exist_rejects_mismatches() {
        let mut h = with_switch(&["sw0", "sw1"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&["lport-add", "sw0", "c1", "p1", "10"]).unwrap();

        let err = |h: &mut Harness, words: &[&str]| h.run(words).unwrap_err().to_string();
        assert_eq!(
            err(&mut h, &["--may-exist", "lport-add", "sw1", "p1"]),
            "p1: lport already exists but in lswitch sw0"
        );
        assert_eq!(
            err(&mut h, &["--may-exist", "lport-add", "sw0", "p1", "x", "1"]),
            "p1: lport already exists but has no parent"
        );
        assert_eq!(
            err(&mut h, &["--may-exist", "lport-add", "sw0", "c1", "p2", "10"]),
            "c1: lport already exists with different parent p1"
        );
        assert_eq!(
            err(&mut h, &["--may-exist", "lport-add", "sw0", "c1", "p1", "11"]),
            "c1: lport already exists with different tag 10"
        );
        assert_eq!(
            err(&mut h, &["--may-exist", "lport-add", "sw0", "c1"]),
            "c1: lport already exists but has parent p1"
        );
        h.run(&["--may-exist", "lport-add", "sw0", "c1", "p1", "10"]).unwrap();
    }

    #[test]
    fn delete_swaps_last_into_hole() {
        let mut h = with_switch(&["sw0"]);
        for name in ["a", "b", "c"] {
            h.run(&["lport-add", "sw0", name]).unwrap();
        }
        let c = port(&h, "c").uuid;
        let b = port(&h, "b").uuid;
        h.run(&["lport-del", "a"]).unwrap();

        assert_eq!(h.db().require_switch("sw0").unwrap().ports, vec![c, b]);
        assert!(h.db().port_by_name_or_uuid("a", false).unwrap().is_none());

        let err = h.run(&["lport-del", "a"]).unwrap_err();
        assert_eq!(err.to_string(), "a: lport name not found");
        h.run(&["--if-exists", "lport-del", "a"]).unwrap();
    }

    #[test]
    fn delete_of_orphan_is_schema_violation() {
        let mut db = Database::default();
        let orphan = LogicalPort::new("lost");
        db.ports.insert(orphan.uuid, orphan);
        let mut h = Harness::new(db);
        let err = h.run(&["lport-del", "lost"]).unwrap_err();
        assert!(matches!(err, CoreError::SchemaViolation(_)));
    }

    #[test]
    fn addresses_round_trip_sorted() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&[
            "lport-set-addresses",
            "p1",
            "unknown",
            "aa:bb:cc:dd:ee:ff 10.0.0.1",
        ])
        .unwrap();
        assert_eq!(
            h.out(&["lport-get-addresses", "p1"]).unwrap(),
            "aa:bb:cc:dd:ee:ff 10.0.0.1\nunknown\n"
        );

        let err = h.run(&["lport-set-addresses", "p1", "10.0.0.1"]).unwrap_err();
        assert!(err.to_string().contains("Invalid address format"));
        // A failed set leaves the previous value alone.
        assert_eq!(port(&h, "p1").addresses.len(), 2);

        h.run(&["lport-set-addresses", "p1"]).unwrap();
        assert_eq!(h.out(&["lport-get-addresses", "p1"]).unwrap(), "");
    }

    #[test]
    fn port_security_round_trip() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&["lport-set-port-security", "p1", "zz", "aa", "zz"]).unwrap();
        assert_eq!(h.out(&["lport-get-port-security", "p1"]).unwrap(), "aa\nzz\n");
    }

    #[test]
    fn enabled_and_up_defaults() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        assert_eq!(h.out(&["lport-get-enabled", "p1"]).unwrap(), "enabled\n");
        assert_eq!(h.out(&["lport-get-up", "p1"]).unwrap(), "down\n");

        h.run(&["lport-set-enabled", "p1", "DISABLED"]).unwrap();
        assert_eq!(h.out(&["lport-get-enabled", "p1"]).unwrap(), "disabled\n");

        let err = h.run(&["lport-set-enabled", "p1", "off"]).unwrap_err();
        assert_eq!(err.to_string(), "off: state must be \"enabled\" or \"disabled\"");
    }

    #[test]
    fn type_parent_and_tag_getters() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&["lport-add", "sw0", "c1", "p1", "7"]).unwrap();
        h.run(&["lport-set-type", "p1", "router"]).unwrap();

        assert_eq!(h.out(&["lport-get-type", "p1"]).unwrap(), "router\n");
        assert_eq!(h.out(&["lport-get-type", "c1"]).unwrap(), "\n");
        assert_eq!(h.out(&["lport-get-parent", "c1"]).unwrap(), "p1\n");
        assert_eq!(h.out(&["lport-get-parent", "p1"]).unwrap(), "");
        assert_eq!(h.out(&["lport-get-tag", "c1"]).unwrap(), "7\n");
        assert_eq!(h.out(&["lport-get-tag", "p1"]).unwrap(), "");
    }

    #[test]
    fn options_skip_arguments_without_equals() {
        let mut h = with_switch(&["sw0"]);
        h.run(&["lport-add", "sw0", "p1"]).unwrap();
        h.run(&["lport-set-options", "p1", "b=2", "junk", "a=1"]).unwrap();
        assert_eq!(h.out(&["lport-get-options", "p1"]).unwrap(), "a=1\nb=2\n");
    }

    #[test]
    fn list_ports_sorted() {
        let mut h = with_switch(&["sw0"]);
        for name in ["zeta", "alpha"] {
            h.run(&["lport-add", "sw0", name]).unwrap();
        }
        let out = h.out(&["lport-list", "sw0"]).unwrap();
        let first = out.lines().next().unwrap();
        assert!(first.ends_with("(alpha)"));
        assert_eq!(out.lines().count(), 2);
    }
}
