use crate::commands::{with_migrated_database, CommandFailure, CommandResult};
use timeclerk_db::{DemoDataset, TimesheetSeedInfo};

pub fn run() -> CommandResult {
    let seeded = with_migrated_database(|pool| async move {
        let seed_result = DemoDataset::load(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 5))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 6))?;

        if !verification.all_present {
            return Err(CommandFailure::new(
                "seed_verification",
                verification_message(&verification.checks),
                6,
            ));
        }

        Ok(seed_result.timesheets_seeded)
    });

    match seeded {
        Ok(timesheets) => CommandResult::success("seed", summary_message(&timesheets)),
        Err(failure) => CommandResult::failure("seed", failure),
    }
}

fn summary_message(timesheets: &[TimesheetSeedInfo]) -> String {
    let lines: Vec<String> = timesheets
        .iter()
        .map(|info| format!("  - {} [{}]: {}", info.timesheet_id, info.status, info.description))
        .collect();

    format!("demo dataset loaded with {} timesheets:\n{}", timesheets.len(), lines.join("\n"))
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "seed verification reported a failure without naming a check".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{summary_message, verification_message};
    use timeclerk_db::TimesheetSeedInfo;

    #[test]
    fn summary_lists_one_line_per_timesheet() {
        let timesheets = [
            TimesheetSeedInfo {
                timesheet_id: "ts-draft-001",
                status: "draft",
                description: "Draft week, not yet submitted",
            },
            TimesheetSeedInfo {
                timesheet_id: "ts-approved-001",
                status: "approved",
                description: "Approved week",
            },
        ];

        let message = summary_message(&timesheets);

        assert!(message.starts_with("demo dataset loaded with 2 timesheets:\n"));
        assert!(message.contains("  - ts-draft-001 [draft]: Draft week, not yet submitted"));
        assert!(message.contains("  - ts-approved-001 [approved]: Approved week"));
    }

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [
            ("accounts", true),
            ("ts-submitted-001-entry-count", false),
            ("mgr-002-manages-gamma", false),
        ];

        assert_eq!(
            verification_message(&checks),
            "seed verification failed for checks: ts-submitted-001-entry-count, mgr-002-manages-gamma"
        );
    }

    #[test]
    fn verification_error_message_survives_empty_label_list() {
        let checks = [("accounts", true), ("projects", true)];

        assert_eq!(
            verification_message(&checks),
            "seed verification reported a failure without naming a check"
        );
    }
}
