//! CLI probe entry point.
//!
//! # Responsibility
//! - Verify `taskboard_core` linkage, configuration and database bootstrap.
//! - Keep output deterministic `key=value` lines for quick local checks.

use log::info;
use std::process::ExitCode;
use taskboard_core::db::migrations::current_version;
use taskboard_core::{
    init_from_config, open_db_at, CoreConfig, SqliteStore, TaskService, UserService,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskboard error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    let file_logging = init_from_config(&config)?;

    println!("taskboard_core ping={}", taskboard_core::ping());
    println!("taskboard_core version={}", taskboard_core::core_version());
    println!("taskboard database={}", config.database);
    println!("taskboard file_logging={file_logging}");

    let conn = open_db_at(&config.database)?;
    let store = SqliteStore::try_new(&conn)?;
    let tasks = TaskService::new(store).with_unknown_id_policy(config.unknown_ids);
    let users = UserService::new(store).with_unknown_id_policy(config.unknown_ids);

    let schema_version = current_version(&conn)?;
    let task_count = tasks.count()?;
    let user_count = users.count()?;
    println!("taskboard schema_version={schema_version}");
    println!("taskboard tasks={task_count} users={user_count}");
    println!("taskboard unknown_ids={}", config.unknown_ids);

    info!(
        "event=cli_probe module=cli status=ok schema_version={schema_version} tasks={task_count} users={user_count}"
    );
    Ok(())
}
