//! Alarm Call Core - shared logic for the Alarm Call bot.
//!
//! - **config**: state directory layout, environment profiles and settings
//! - **call_command**: parsing of the `/call N` duration command

pub mod call_command;
pub mod config;

pub use call_command::{
    command_mention, is_addressed_to, is_call_command, parse_call_hours, CallCommandError,
    DEFAULT_MAX_CALL_HOURS,
};
pub use config::{
    config_dir, database_file, db_dir, ensure_all_dirs, env_file, load_env_files,
    load_env_files_from, state_dir, ConfigError, EnvFilesReport, Environment, Settings,
};
