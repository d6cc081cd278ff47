//! Line commands read from stdin.

use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  insert <offset> <text>   type text at a char offset (\\n for newline)
  delete <offset> <len>    delete chars, backspace style
  select <start> <end>     select a char range (end < start selects backwards)
  text                     print the document
  nodes                    print the node list, tombstones included
  state                    print the connection state
  help                     show this message
  quit                     leave";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Insert { offset: usize, text: String },
    Delete { offset: usize, len: usize },
    Select { anchor: usize, head: usize },
    Text,
    Nodes,
    State,
    Help,
    Quit,
}

#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    #[diagnostic(code(weft::cli::unknown), help("type `help` for the list of commands"))]
    Unknown(String),

    #[error("`{command}` is missing its {arg} argument")]
    #[diagnostic(code(weft::cli::missing_arg), help("type `help` for usage"))]
    MissingArg {
        command: &'static str,
        arg: &'static str,
    },

    #[error("`{command}`: {arg} must be a non-negative number, got {value:?}")]
    #[diagnostic(code(weft::cli::bad_number))]
    BadNumber {
        command: &'static str,
        arg: &'static str,
        value: String,
    },

    #[error("empty command")]
    #[diagnostic(code(weft::cli::empty))]
    Empty,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (name, rest) = line.split_once(' ').unwrap_or((line.trim_end(), ""));
        match name {
            "" => Err(CommandError::Empty),
            "insert" | "i" => {
                let (offset, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let offset = number("insert", "offset", offset)?;
                if text.is_empty() {
                    return Err(CommandError::MissingArg {
                        command: "insert",
                        arg: "text",
                    });
                }
                Ok(Self::Insert {
                    offset,
                    text: unescape(text),
                })
            }
            "delete" | "d" => {
                let mut args = rest.split_whitespace();
                let offset = number("delete", "offset", args.next().unwrap_or(""))?;
                let len = number("delete", "len", args.next().unwrap_or(""))?;
                Ok(Self::Delete { offset, len })
            }
            "select" | "s" => {
                let mut args = rest.split_whitespace();
                let anchor = number("select", "start", args.next().unwrap_or(""))?;
                let head = number("select", "end", args.next().unwrap_or(""))?;
                Ok(Self::Select { anchor, head })
            }
            "text" => Ok(Self::Text),
            "nodes" => Ok(Self::Nodes),
            "state" => Ok(Self::State),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn number(command: &'static str, arg: &'static str, raw: &str) -> Result<usize, CommandError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CommandError::MissingArg { command, arg });
    }
    raw.parse().map_err(|_| CommandError::BadNumber {
        command,
        arg,
        value: raw.to_string(),
    })
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}
