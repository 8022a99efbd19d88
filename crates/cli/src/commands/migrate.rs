use crate::commands::{build_runtime, load_config, CommandResult};
use basket_db::{connect_with_config, migrations, SqlTransactionRepository, TransactionRepository};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let lines = SqlTransactionRepository::new(pool.clone())
            .count_lines()
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8));
        pool.close().await;
        Ok::<u64, (&'static str, String, u8)>(lines?)
    });

    match result {
        Ok(lines) => CommandResult::success(
            "migrate",
            format!("applied pending migrations; invoice_itemized holds {lines} lines"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
