//! Command-line interface

pub mod commands;

pub use commands::{
    cmd_backups, cmd_deploy, cmd_events, cmd_export, cmd_import, cmd_invoke, cmd_list, cmd_query,
    cmd_restore, AppState, CliResult,
};
