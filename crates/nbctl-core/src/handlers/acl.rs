// ── ACL commands ──

use uuid::Uuid;

use crate::command::{Context, Handler};
use crate::error::CoreError;
use crate::model::acl::parse_priority;
use crate::model::{Acl, AclAction, Direction, SwitchColumn};

pub struct AclAdd;
pub struct AclDel;
pub struct AclList;

impl Handler for AclList {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let db = ctx.db();
        let sw = db.require_switch(ctx.arg(0))?;
        let lines: Vec<String> = db
            .sorted_acls_of(sw)
            .into_iter()
            .map(|acl| {
                format!(
                    "{:>10} {:>5} ({}) {}{}",
                    acl.direction.to_string(),
                    acl.priority,
                    acl.match_expr,
                    acl.action,
                    if acl.log { " log" } else { "" }
                )
            })
            .collect();
        for line in lines {
            ctx.write_line(line);
        }
        Ok(())
    }
}

impl Handler for AclAdd {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let sw_uuid = ctx.db().require_switch(ctx.arg(0))?.uuid;
        let direction = Direction::parse_loose(ctx.arg(1))?;
        let priority = parse_priority(ctx.arg(2))?;
        let action = AclAction::parse_strict(ctx.arg(4))?;

        let mut acl = Acl::new(direction, priority, ctx.arg(3), action);
        acl.log = ctx.has_option("--log");

        let acl_uuid = ctx.txn.insert_acl(acl);
        ctx.txn
            .verify_switch_mut(sw_uuid, SwitchColumn::Acls)?
            .acls
            .push(acl_uuid);
        Ok(())
    }
}

impl Handler for AclDel {
    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError> {
        let db = ctx.db();
        let sw = db.require_switch(ctx.arg(0))?;
        let sw_uuid = sw.uuid;

        match ctx.args.len() {
            // Everything.
            1 => {
                ctx.txn.verify_switch_mut(sw_uuid, SwitchColumn::Acls)?.acls.clear();
            }
            // Everything in one direction.
            2 => {
                let direction = Direction::parse_loose(ctx.arg(1))?;
                let keep: Vec<Uuid> = sw
                    .acls
                    .iter()
                    .copied()
                    .filter(|uuid| db.acl(*uuid).is_none_or(|acl| acl.direction != direction))
                    .collect();
                ctx.txn.verify_switch_mut(sw_uuid, SwitchColumn::Acls)?.acls = keep;
            }
            // The first exact match only; later duplicates stay.
            4 => {
                let direction = Direction::parse_loose(ctx.arg(1))?;
                let priority = parse_priority(ctx.arg(2))?;
                let match_expr = ctx.arg(3);
                let hit = sw.acls.iter().copied().find(|uuid| {
                    db.acl(*uuid)
                        .is_some_and(|acl| acl.matches_key(direction, priority, match_expr))
                });
                if let Some(hit) = hit {
                    ctx.txn
                        .verify_switch_mut(sw_uuid, SwitchColumn::Acls)?
                        .swap_remove_acl(hit);
                }
            }
            _ => return Err(CoreError::invalid("cannot specify priority without match")),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::handlers::testing::Harness;
    use crate::model::{Database, Direction};

    fn switch_with_acls(acls: &[[&str; 4]]) -> Harness {
        let mut h = Harness::new(Database::default());
        h.run(&["lswitch-add", "sw0"]).unwrap();
        for [dir, prio, m, action] in acls {
            h.run(&["acl-add", "sw0", dir, prio, m, action]).unwrap();
        }
        h
    }

    fn remaining(h: &Harness) -> Vec<(Direction, u16, String)> {
        let db = h.db();
        let sw = db.require_switch("sw0").unwrap();
        db.sorted_acls_of(sw)
            .into_iter()
            .map(|acl| (acl.direction, acl.priority, acl.match_expr.clone()))
            .collect()
    }

    #[test]
    fn list_orders_by_direction_priority_match() {
        let mut h = switch_with_acls(&[
            ["to-lport", "10", "m1", "allow"],
            ["from-lport", "20", "m2", "drop"],
            ["from-lport", "20", "m1", "allow-related"],
        ]);
        h.run(&["--log", "acl-add", "sw0", "to", "5", "ip4", "reject"]).unwrap();

        let out = h.out(&["acl-list", "sw0"]).unwrap();
        assert_eq!(
            out,
            "from-lport    20 (m1) allow-related\n\
             from-lport    20 (m2) drop\n  \
             to-lport    10 (m1) allow\n  \
             to-lport     5 (ip4) reject log\n"
        );
    }

    #[test]
    fn add_validates_arguments() {
        let mut h = switch_with_acls(&[]);
        let err = |h: &mut Harness, words: &[&str]| h.run(words).unwrap_err().to_string();
        assert_eq!(
            err(&mut h, &["acl-add", "sw0", "sideways", "1", "ip", "allow"]),
            "sideways: direction must be \"to-lport\" or \"from-lport\""
        );
        assert_eq!(
            err(&mut h, &["acl-add", "sw0", "to", "40000", "ip", "allow"]),
            "40000: priority must in range 0...32767"
        );
        assert_eq!(
            err(&mut h, &["acl-add", "sw0", "to", "1", "ip", "accept"]),
            "accept: action must be one of \"allow\", \"allow-related\", \"drop\", and \"reject\""
        );
        assert_eq!(
            err(&mut h, &["acl-add", "nope", "to", "1", "ip", "allow"]),
            "nope: lswitch name not found"
        );
    }

    #[test]
    fn delete_by_direction_keeps_other_direction() {
        let mut h = switch_with_acls(&[
            ["to-lport", "1", "a", "allow"],
            ["from-lport", "2", "b", "allow"],
            ["to-lport", "3", "c", "allow"],
        ]);
        h.run(&["acl-del", "sw0", "to-lport"]).unwrap();
        assert_eq!(remaining(&h), vec![(Direction::FromLport, 2, "b".to_owned())]);
    }

    #[test]
    fn delete_all() {
        let mut h = switch_with_acls(&[["to-lport", "1", "a", "allow"]]);
        h.run(&["acl-del", "sw0"]).unwrap();
        assert!(remaining(&h).is_empty());
    }

    /// Exact-match delete removes only the first hit, even when
    /// identical entries exist. This is long-standing behavior that
    /// scripts may rely on, so it is pinned here rather than changed.
    #[test]
    fn exact_delete_removes_first_duplicate_only() {
        let mut h = switch_with_acls(&[
            ["to-lport", "100", "ip4", "drop"],
            ["to-lport", "100", "ip4", "drop"],
            ["from-lport", "100", "ip4", "drop"],
        ]);
        h.run(&["acl-del", "sw0", "to-lport", "100", "ip4"]).unwrap();
        assert_eq!(
            remaining(&h),
            vec![
                (Direction::FromLport, 100, "ip4".to_owned()),
                (Direction::ToLport, 100, "ip4".to_owned()),
            ]
        );

        // No match is a silent no-op.
        h.run(&["acl-del", "sw0", "to-lport", "1", "nothing"]).unwrap();
        assert_eq!(remaining(&h).len(), 2);
    }

    #[test]
    fn priority_without_match_is_rejected() {
        let mut h = switch_with_acls(&[]);
        let err = h.run(&["acl-del", "sw0", "to-lport", "100"]).unwrap_err();
        assert_eq!(err.to_string(), "cannot specify priority without match");
    }
}
