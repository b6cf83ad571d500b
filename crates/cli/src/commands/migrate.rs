use crate::commands::{with_migrated_database, CommandFailure, CommandResult};
use timeclerk_db::migrations;

pub fn run() -> CommandResult {
    let applied = with_migrated_database(|pool| async move {
        migrations::applied_count(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))
    });

    match applied {
        Ok(applied) => CommandResult::success(
            "migrate",
            format!("schema is current; {applied} migration(s) applied"),
        ),
        Err(failure) => CommandResult::failure("migrate", failure),
    }
}
