//! CronJob checks

use crate::error::ScoreError;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::{CronJobObject, TestScore};

pub fn register(checks: &mut CheckRegistry) -> Result<(), ScoreError> {
    checks.register_cron_job_check(
        "CronJob has deadline",
        "Makes sure that all CronJobs has a configured deadline",
        cron_job_has_deadline(),
    )?;
    Ok(())
}

fn cron_job_has_deadline() -> CheckFn<CronJobObject> {
    Box::new(move |cron_job| {
        let has_deadline = cron_job
            .cron_job
            .spec
            .as_ref()
            .is_some_and(|s| s.starting_deadline_seconds.is_some());
        if has_deadline {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "The CronJob should have startingDeadlineSeconds configured",
                "Jobs that miss their schedule and have no deadline configured are never started, without any error reported.",
            ))
        }
    })
}
