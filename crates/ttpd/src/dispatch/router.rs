//! Two-tier command lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::debug;

use super::DISPATCH_TARGET;
use super::request::Request;

/// Handler of a daemon-specific command; returns the answer text.
pub type CommandHandler = Box<dyn Fn(&Request) -> String>;

/// Commands every daemon answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Help,
    Status,
    Terminate,
}

impl Builtin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// What the built-in commands need from the runtime.
pub trait DispatchContext {
    /// Current status fields keyed by name, including `status`.
    fn status_fields(&self) -> BTreeMap<String, String>;

    /// Raises the terminating flag.
    fn request_termination(&mut self);
}

/// Daemon-specific commands, consulted before the built-ins.
#[derive(Default)]
pub struct CommandTable {
    handlers: BTreeMap<String, CommandHandler>,
}

impl CommandTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> String + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.handlers.keys())
            .finish()
    }
}

/// Resolves `request` and returns the answer text.
pub fn dispatch(request: &Request, table: &CommandTable, context: &mut dyn DispatchContext) -> String {
    let command = request.command();
    if let Some(handler) = table.get(command) {
        debug!(target: DISPATCH_TARGET, command, tier = "daemon", "dispatching command");
        return handler(request);
    }
    match command.parse::<Builtin>() {
        Ok(builtin) => {
            debug!(target: DISPATCH_TARGET, command, tier = "builtin", "dispatching command");
            run_builtin(builtin, table, context)
        }
        Err(_) => {
            debug!(target: DISPATCH_TARGET, command, "unknown command");
            format!("unknowned command '{command}'\n")
        }
    }
}

fn run_builtin(builtin: Builtin, table: &CommandTable, context: &mut dyn DispatchContext) -> String {
    match builtin {
        Builtin::Help => help(table),
        Builtin::Status => status(&context.status_fields()),
        Builtin::Terminate => {
            context.request_termination();
            String::new()
        }
    }
}

fn help(table: &CommandTable) -> String {
    let names: BTreeSet<&str> = table
        .names()
        .chain(Builtin::iter().map(|builtin| builtin.as_str()))
        .collect();
    names.into_iter().map(|name| format!("{name}\n")).collect()
}

fn status(fields: &BTreeMap<String, String>) -> String {
    let mut text = String::new();
    if let Some(status) = fields.get("status") {
        text.push_str(&format!("status: {status}\n"));
    }
    for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != "status") {
        text.push_str(&format!("{key}: {value}\n"));
    }
    text
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use rstest::{fixture, rstest};

    use super::*;

    #[derive(Default)]
    struct FakeRuntime {
        terminating: bool,
    }

    impl DispatchContext for FakeRuntime {
        fn status_fields(&self) -> BTreeMap<String, String> {
            [
                ("status", "running since 2026-10-19T08:00:00Z"),
                ("pid", "77"),
                ("execPath", "/opt/ttp/bin/backup"),
                ("enabled", "true"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
        }

        fn request_termination(&mut self) {
            self.terminating = true;
        }
    }

    #[fixture]
    fn table() -> CommandTable {
        let mut table = CommandTable::new();
        table.insert("backup", |request: &Request| {
            format!("backing up {}\n", request.args().join(" "))
        });
        table
    }

    fn run(table: &CommandTable, line: &str) -> (String, FakeRuntime) {
        let mut runtime = FakeRuntime::default();
        let answer = dispatch(&Request::parse(line.as_bytes(), None), table, &mut runtime);
        (answer, runtime)
    }

    #[rstest]
    fn daemon_commands_receive_arguments(table: CommandTable) {
        assert_eq!(run(&table, "backup /srv\n").0, "backing up /srv\n");
    }

    #[rstest]
    fn daemon_table_shadows_builtins() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut table = CommandTable::new();
        table.insert("status", move |_: &Request| {
            seen.set(seen.get() + 1);
            "custom\n".to_string()
        });
        assert_eq!(run(&table, "status").0, "custom\n");
        assert_eq!(calls.get(), 1);
    }

    #[rstest]
    fn help_lists_sorted_union(mut table: CommandTable) {
        table.insert("status", |_: &Request| String::new());
        table.insert("archive", |_: &Request| String::new());
        assert_eq!(
            run(&table, "help").0,
            "archive\nbackup\nhelp\nstatus\nterminate\n"
        );
    }

    #[rstest]
    fn status_leads_with_running_since(table: CommandTable) {
        let (answer, _) = run(&table, "status");
        assert_eq!(
            answer,
            "status: running since 2026-10-19T08:00:00Z\n\
             enabled: true\n\
             execPath: /opt/ttp/bin/backup\n\
             pid: 77\n"
        );
    }

    #[rstest]
    fn terminate_raises_flag_silently(table: CommandTable) {
        let (answer, runtime) = run(&table, "terminate\n");
        assert!(answer.is_empty());
        assert!(runtime.terminating);
    }

    #[rstest]
    #[case::bogus("bogus\n", "unknowned command 'bogus'\n")]
    #[case::case_sensitive("STATUS", "unknowned command 'STATUS'\n")]
    #[case::empty("\n", "unknowned command ''\n")]
    fn unknown_commands_fall_back(table: CommandTable, #[case] line: &str, #[case] expected: &str) {
        assert_eq!(run(&table, line).0, expected);
    }
}
