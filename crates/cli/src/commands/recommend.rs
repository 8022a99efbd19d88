use basket_core::mining::MarketBasketEngine;

use crate::commands::{load_config, load_records, mining_failure, CommandResult, MiningArgs};

pub fn run(item: &str, args: &MiningArgs) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let records = match load_records("recommend", &config, args.input.as_deref()) {
        Ok(records) => records,
        Err(failure) => return failure,
    };

    let engine = MarketBasketEngine::new(args.params(&config));
    match engine.recommendations_response(&records, item) {
        Ok(response) => CommandResult::payload("recommend", &response),
        Err(error) => mining_failure("recommend", error),
    }
}
