use integration_service::service::processor::{backoff_delay_ms, classify_failure, AttemptOutcome};

#[test]
fn first_failure_is_retried() {
    let outcome = classify_failure(0, 3);
    assert_eq!(outcome, AttemptOutcome::Retry { attempts: 1 });
}

#[test]
fn budget_exhausts_after_exactly_max_attempts() {
    let max_attempts = 3;
    let mut attempts_made = 0;
    let mut dead_lettered = 0;

    loop {
        match classify_failure(attempts_made, max_attempts) {
            AttemptOutcome::Retry { attempts } => attempts_made = attempts,
            AttemptOutcome::DeadLetter { attempts } => {
                attempts_made = attempts;
                dead_lettered += 1;
                break;
            }
            AttemptOutcome::Completed => unreachable!(),
        }
    }

    assert_eq!(attempts_made, max_attempts);
    assert_eq!(dead_lettered, 1);
}

#[test]
fn single_attempt_budget_dead_letters_immediately() {
    let outcome = classify_failure(0, 1);
    assert_eq!(outcome, AttemptOutcome::DeadLetter { attempts: 1 });
}

#[test]
fn zero_budget_is_treated_as_one_attempt() {
    let outcome = classify_failure(0, 0);
    assert_eq!(outcome, AttemptOutcome::DeadLetter { attempts: 1 });
}

#[test]
fn backoff_doubles_per_attempt() {
    assert_eq!(backoff_delay_ms(1000, 1), 1000);
    assert_eq!(backoff_delay_ms(1000, 2), 2000);
    assert_eq!(backoff_delay_ms(1000, 3), 4000);
}

#[test]
fn backoff_is_capped() {
    assert_eq!(backoff_delay_ms(1000, 20), 300_000);
    assert_eq!(backoff_delay_ms(i64::MAX / 2, 3), 300_000);
}
