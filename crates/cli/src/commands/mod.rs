pub mod config;
pub mod defaults;
pub mod migrate;
pub mod overrides;
pub mod purge;
pub mod seed;
pub mod settings;
pub mod suggest;
pub mod track;

use std::future::Future;

use brewline_core::config::{AppConfig, LoadOptions};
use brewline_core::ApplicationError;
use brewline_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Error class, message and process exit code of a failed command.
pub(crate) type Failure = (&'static str, String, u8);

/// Command output: a human message plus an optional structured payload.
pub(crate) struct Success {
    message: String,
    data: Option<Value>,
}

impl Success {
    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), data: None }
    }

    pub(crate) fn with_data(
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Result<Self, Failure> {
        let data = serde_json::to_value(data)
            .map_err(|error| ("serialization", error.to_string(), 9u8))?;
        Ok(Self { message: message.into(), data: Some(data) })
    }
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads configuration, opens and migrates the database, then hands the pool
/// to `work`. Exit codes: 2 config, 3 runtime, 4 connectivity, 5 migration.
pub(crate) fn run_with_database<F, Fut>(command: &str, work: F) -> CommandResult
where
    F: FnOnce(AppConfig, DbPool) -> Fut,
    Fut: Future<Output = Result<Success, Failure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = work(config, pool.clone()).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(success) => CommandResult::success_with_data(command, success.message, success.data),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

/// Maps a service error to a CLI failure: 7 for rejected input, 8 for
/// storage problems.
pub(crate) fn application_failure(command: &str, error: ApplicationError) -> Failure {
    let exit_code = match error {
        ApplicationError::Domain(_) => 7,
        ApplicationError::Persistence(_) => 8,
    };
    let interface = error.into_interface(format!("cli-{command}"));
    (interface.error_class(), interface.to_string(), exit_code)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use brewline_core::{ApplicationError, DomainError, StoreError};
    use serde_json::Value;

    use super::{application_failure, CommandResult};

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("suggest", "db_connectivity", "database is locked", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn application_errors_map_to_exit_codes() {
        let (class, message, code) = application_failure(
            "defaults",
            DomainError::Validation("at least 3 distinct product ids are required".to_string())
                .into(),
        );
        assert_eq!((class, code), ("validation", 7));
        assert!(message.contains("3 distinct"));

        let (class, _, code) = application_failure(
            "suggest",
            ApplicationError::from(StoreError::Unavailable("disk full".to_string())),
        );
        assert_eq!((class, code), ("internal", 8));
    }
}
