use crate::cli::{ClaimsCommand, Commands, ReferenceCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Claims { command } => match command {
            ClaimsCommand::List { json, .. } => *json,
        },
        Commands::Reference { command } => match command {
            ReferenceCommand::Check { json, .. } | ReferenceCommand::Resolve { json, .. } => *json,
        },
    };
    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
