//! Wire command construction.
//!
//! Commands are ephemeral: built, encoded to one line, sent (or queued)
//! and discarded.

use std::fmt;

use crate::path::RemotePath;

/// A value encoded into a command line.
///
/// Strings pass through unquoted exactly as given (the caller supplies
/// any protocol-required literal quoting); numbers use their canonical
/// decimal form.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A single protocol line.
#[derive(Debug, Clone)]
pub enum Command {
    /// `path=value`
    Assign { path: RemotePath, value: Arg },
    /// `path(arg,arg,...)`
    Call { path: RemotePath, args: Vec<Arg> },
    /// `Ref& name=expr` - binds a new addressable alias to the result of
    /// an expression, so a transient result can be treated as a
    /// long-lived path.
    RefAlias { name: String, expr: String },
    /// `Set name=expr` - value-copy counterpart of [`Command::RefAlias`].
    SetAlias { name: String, expr: String },
    /// Raw read of a path.
    Read { path: RemotePath },
    /// `help path` introspection query.
    Help { path: RemotePath },
}

impl Command {
    /// The single-line wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// The call expression `path(a,b)` on its own, for wrapping inside an
    /// alias declaration.
    #[must_use]
    pub fn call_expr(path: &RemotePath, args: &[Arg]) -> String {
        format!("{path}({})", join_args(args))
    }
}

fn join_args(args: &[Arg]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { path, value } => write!(f, "{path}={value}"),
            Self::Call { path, args } => write!(f, "{path}({})", join_args(args)),
            Self::RefAlias { name, expr } => write!(f, "Ref& {name}={expr}"),
            Self::SetAlias { name, expr } => write!(f, "Set {name}={expr}"),
            Self::Read { path } => write!(f, "{path}"),
            Self::Help { path } => write!(f, "help {path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> RemotePath {
        RemotePath::root("app")
    }

    #[test]
    fn encodes_assignment() {
        let cmd = Command::Assign {
            path: root().child("wdir"),
            value: Arg::from("C:\\work"),
        };
        assert_eq!(cmd.encode(), "app.wdir=C:\\work");
    }

    #[test]
    fn encodes_call_with_mixed_args() {
        let cmd = Command::Call {
            path: root().child("addsubnode"),
            args: vec![Arg::from("rwguideNode"), Arg::from("wg"), Arg::from(1.5)],
        };
        assert_eq!(cmd.encode(), "app.addsubnode(rwguideNode,wg,1.5)");
    }

    #[test]
    fn encodes_aliases() {
        let by_ref = Command::RefAlias {
            name: "ref1".into(),
            expr: "app.findorcreateview(1)".into(),
        };
        assert_eq!(by_ref.encode(), "Ref& ref1=app.findorcreateview(1)");

        let by_value = Command::SetAlias {
            name: "ref2".into(),
            expr: "app.subnodes[1]".into(),
        };
        assert_eq!(by_value.encode(), "Set ref2=app.subnodes[1]");
    }

    #[test]
    fn encodes_read_and_help() {
        assert_eq!(Command::Read { path: root() }.encode(), "app");
        assert_eq!(
            Command::Help { path: root().child("subnodes").index(2) }.encode(),
            "help app.subnodes[2]"
        );
    }

    #[test]
    fn strings_pass_through_unquoted() {
        assert_eq!(Arg::from("a b,c").to_string(), "a b,c");
        assert_eq!(Arg::from(3_i64).to_string(), "3");
        assert_eq!(Arg::from(0.25).to_string(), "0.25");
    }
}
