// ── Command handlers ──
//
// One unit struct per command, registered in `COMMANDS`. Handlers read
// through the transaction's working view so earlier commands in the same
// batch are visible to later ones.

pub mod acl;
pub mod db;
pub mod port;
pub mod switch;

use crate::command::{CommandSyntax, Context, Mode};

const UNBOUNDED: usize = usize::MAX;

pub(crate) static COMMANDS: &[CommandSyntax] = &[
    // ── Switches ─────────────────────────────────────────────────────
    CommandSyntax {
        name: "show",
        min_args: 0,
        max_args: 1,
        arguments: "[LSWITCH]",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &switch::Show,
    },
    CommandSyntax {
        name: "lswitch-add",
        min_args: 0,
        max_args: 1,
        arguments: "[LSWITCH]",
        options: &["--may-exist", "--add-duplicate"],
        mode: Mode::ReadWrite,
        handler: &switch::LswitchAdd,
    },
    CommandSyntax {
        name: "lswitch-del",
        min_args: 1,
        max_args: 1,
        arguments: "LSWITCH",
        options: &["--if-exists"],
        mode: Mode::ReadWrite,
        handler: &switch::LswitchDel,
    },
    CommandSyntax {
        name: "lswitch-list",
        min_args: 0,
        max_args: 0,
        arguments: "",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &switch::LswitchList,
    },
    // ── ACLs ─────────────────────────────────────────────────────────
    CommandSyntax {
        name: "acl-add",
        min_args: 5,
        max_args: 5,
        arguments: "LSWITCH DIRECTION PRIORITY MATCH ACTION",
        options: &["--log"],
        mode: Mode::ReadWrite,
        handler: &acl::AclAdd,
    },
    CommandSyntax {
        name: "acl-del",
        min_args: 1,
        max_args: 4,
        arguments: "LSWITCH [DIRECTION [PRIORITY MATCH]]",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &acl::AclDel,
    },
    CommandSyntax {
        name: "acl-list",
        min_args: 1,
        max_args: 1,
        arguments: "LSWITCH",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &acl::AclList,
    },
    // ── Ports ────────────────────────────────────────────────────────
    CommandSyntax {
        name: "lport-add",
        min_args: 2,
        max_args: 4,
        arguments: "LSWITCH LPORT [PARENT] [TAG]",
        options: &["--may-exist"],
        mode: Mode::ReadWrite,
        handler: &port::LportAdd,
    },
    CommandSyntax {
        name: "lport-del",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &["--if-exists"],
        mode: Mode::ReadWrite,
        handler: &port::LportDel,
    },
    CommandSyntax {
        name: "lport-list",
        min_args: 1,
        max_args: 1,
        arguments: "LSWITCH",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportList,
    },
    CommandSyntax {
        name: "lport-get-parent",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetParent,
    },
    CommandSyntax {
        name: "lport-get-tag",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetTag,
    },
    CommandSyntax {
        name: "lport-set-addresses",
        min_args: 1,
        max_args: UNBOUNDED,
        arguments: "LPORT [ADDRESS]...",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &port::LportSetAddresses,
    },
    CommandSyntax {
        name: "lport-get-addresses",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetAddresses,
    },
    CommandSyntax {
        name: "lport-set-port-security",
        min_args: 1,
        max_args: UNBOUNDED,
        arguments: "LPORT [ADDRS]...",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &port::LportSetPortSecurity,
    },
    CommandSyntax {
        name: "lport-get-port-security",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetPortSecurity,
    },
    CommandSyntax {
        name: "lport-get-up",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetUp,
    },
    CommandSyntax {
        name: "lport-set-enabled",
        min_args: 2,
        max_args: 2,
        arguments: "LPORT STATE",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &port::LportSetEnabled,
    },
    CommandSyntax {
        name: "lport-get-enabled",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetEnabled,
    },
    CommandSyntax {
        name: "lport-set-type",
        min_args: 2,
        max_args: 2,
        arguments: "LPORT TYPE",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &port::LportSetType,
    },
    CommandSyntax {
        name: "lport-get-type",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetType,
    },
    CommandSyntax {
        name: "lport-set-options",
        min_args: 1,
        max_args: UNBOUNDED,
        arguments: "LPORT KEY=VALUE...",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &port::LportSetOptions,
    },
    CommandSyntax {
        name: "lport-get-options",
        min_args: 1,
        max_args: 1,
        arguments: "LPORT",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &port::LportGetOptions,
    },
    // ── Generic database commands ────────────────────────────────────
    CommandSyntax {
        name: "list",
        min_args: 1,
        max_args: UNBOUNDED,
        arguments: "TABLE [RECORD]...",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &db::List,
    },
    CommandSyntax {
        name: "create",
        min_args: 1,
        max_args: UNBOUNDED,
        arguments: "TABLE COLUMN=VALUE...",
        options: &["--id="],
        mode: Mode::ReadWrite,
        handler: &db::Create,
    },
    CommandSyntax {
        name: "add",
        min_args: 4,
        max_args: UNBOUNDED,
        arguments: "TABLE RECORD COLUMN VALUE...",
        options: &[],
        mode: Mode::ReadWrite,
        handler: &db::Add,
    },
    CommandSyntax {
        name: "wait-until",
        min_args: 2,
        max_args: UNBOUNDED,
        arguments: "TABLE RECORD [COLUMN=VALUE]...",
        options: &[],
        mode: Mode::ReadOnly,
        handler: &db::WaitUntil,
    },
];

/// `--if-exists` turns a missing target into a no-op.
fn must_exist(ctx: &Context<'_>) -> bool {
    !ctx.has_option("--if-exists")
}

/// Set semantics: drop repeats, keep first-seen order.
fn dedup<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.as_ref();
        if !out.iter().any(|v| v == value) {
            out.push(value.to_owned());
        }
    }
    out
}
