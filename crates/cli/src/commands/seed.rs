use brewline_db::{CatalogSeedDataset, VerificationResult};

use crate::commands::{run_with_database, CommandResult, Failure, Success};

pub fn run() -> CommandResult {
    run_with_database("seed", |_config, pool| async move {
        let seed_result = CatalogSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = CatalogSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        if !verification.all_present {
            return Err(("seed_verification", verification_failure_message(&verification), 6u8));
        }

        Ok::<_, Failure>(Success::message(format!(
            "demo cafe seeded: {} products, {} orders, defaults [{}]",
            seed_result.products_seeded,
            seed_result.orders_seeded,
            seed_result.default_product_ids.join(", ")
        )))
    })
}

fn verification_failure_message(verification: &VerificationResult) -> String {
    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use brewline_db::VerificationResult;

    use super::verification_failure_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![
                ("catalog-products", true),
                ("order-1002", false),
                ("default-suggestions", false),
            ],
        };

        assert_eq!(
            verification_failure_message(&verification),
            "Seed verification failed for checks: order-1002, default-suggestions"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let verification = VerificationResult { all_present: false, checks: Vec::new() };

        assert_eq!(verification_failure_message(&verification), "Some seed data failed to load");
    }
}
