use crate::commands::{run_with_database, CommandResult, Failure, Success};

pub fn run() -> CommandResult {
    run_with_database("migrate", |_config, _pool| async {
        Ok::<_, Failure>(Success::message("applied pending migrations"))
    })
}
