use basket_core::mining::MarketBasketEngine;

use crate::commands::{load_config, load_records, mining_failure, CommandResult, MiningArgs};

pub fn run(args: &MiningArgs) -> CommandResult {
    let config = match load_config("rules") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let records = match load_records("rules", &config, args.input.as_deref()) {
        Ok(records) => records,
        Err(failure) => return failure,
    };

    let engine = MarketBasketEngine::new(args.params(&config));
    match engine.rules_response(&records) {
        Ok(response) => CommandResult::payload("rules", &response),
        Err(error) => mining_failure("rules", error),
    }
}
