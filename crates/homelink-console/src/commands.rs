//! Console line commands

use std::str::FromStr;

use thiserror::Error;

/// Board selector for `connect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    AirConditioner,
    Curtain,
}

/// One parsed console line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    /// `temp <value>`
    SetTemperature(f64),
    /// `curtain <value>`
    SetCurtain(f64),
    /// `sim on|off`
    Simulation(bool),
    /// `connect ac|curtain`
    Connect(Board),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

pub const HELP: &str = "\
commands:
  temp <value>         set the air conditioner target (10-50)
  curtain <value>      move the curtain (0 open, 100 closed)
  sim on|off           toggle curtain simulation
  connect ac|curtain   reopen a board link
  status               print both snapshots
  quit";

impl ConsoleCommand {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match head.to_ascii_lowercase().as_str() {
            "temp" => ConsoleCommand::SetTemperature(number("temp", arg)?),
            "curtain" => ConsoleCommand::SetCurtain(number("curtain", arg)?),
            "sim" => match arg {
                Some("on") => ConsoleCommand::Simulation(true),
                Some("off") => ConsoleCommand::Simulation(false),
                _ => {
                    return Err(ParseError::MissingArgument {
                        command: "sim",
                        expected: "on or off",
                    })
                }
            },
            "connect" => match arg {
                Some("ac") => ConsoleCommand::Connect(Board::AirConditioner),
                Some("curtain") => ConsoleCommand::Connect(Board::Curtain),
                _ => {
                    return Err(ParseError::MissingArgument {
                        command: "connect",
                        expected: "ac or curtain",
                    })
                }
            },
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn number(command: &'static str, arg: Option<&str>) -> Result<f64, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument {
        command,
        expected: "a number",
    })?;
    match f64::from_str(arg) {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::NotANumber(arg.to_string())),
    }
}
