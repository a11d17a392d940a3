//! Compilation of declared component variables into a command-line flag set.
//!
//! Components declare which named variables their check/execute phases need;
//! each is bound to a flag definition. The flag set is compiled into a
//! dynamic `clap::Command` and parsed from the arguments following `--` on
//! the install command line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WeftError;

/// Command-line flag definition for one component variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagSpec {
    /// Long flag name, without the leading `--`.
    pub long: String,
    /// Placeholder shown in help output.
    pub value_name: String,
    /// One-line help text.
    pub help: String,
    /// Whether installation must fail when the flag is absent.
    pub required: bool,
}

impl FlagSpec {
    pub fn required(long: impl Into<String>, value_name: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            value_name: value_name.into(),
            help: String::new(),
            required: true,
        }
    }

    pub fn optional(long: impl Into<String>, value_name: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            value_name: value_name.into(),
            help: String::new(),
            required: false,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

/// A named variable a component binds before check/execute, paired with its
/// flag definition. Order is preserved as declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableOption {
    pub variable: String,
    pub flag: FlagSpec,
}

impl VariableOption {
    pub fn new(variable: impl Into<String>, flag: FlagSpec) -> Self {
        Self {
            variable: variable.into(),
            flag,
        }
    }
}

/// Build the clap command for a component's declared variables.
pub fn compile_command(component: &str, options: &[VariableOption]) -> clap::Command {
    let mut command = clap::Command::new(component.to_string())
        .no_binary_name(true)
        .disable_help_flag(true);
    for option in options {
        command = command.arg(
            clap::Arg::new(option.variable.clone())
                .long(option.flag.long.clone())
                .value_name(option.flag.value_name.clone())
                .help(option.flag.help.clone())
                .required(option.flag.required),
        );
    }
    command
}

/// Parse component arguments against the compiled flag set, yielding the
/// variable bindings for the hook environment.
pub fn parse_variables(
    component: &str,
    options: &[VariableOption],
    args: &[String],
) -> Result<BTreeMap<String, String>, WeftError> {
    let command = compile_command(component, options);
    let matches = command
        .try_get_matches_from(args)
        .map_err(|e| WeftError::CommandLine {
            message: e.to_string(),
        })?;

    let mut variables = BTreeMap::new();
    for option in options {
        if let Some(value) = matches.get_one::<String>(&option.variable) {
            variables.insert(option.variable.clone(), value.clone());
        }
    }
    Ok(variables)
}
