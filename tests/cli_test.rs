use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/seed.json")
        .arg("tests/fixtures/requests.jsonl");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "booking,status,verification_status,payment_status,pending_charges,charges_waived",
        ))
        // Collected in full
        .stdout(predicate::str::contains(
            "00000000-0000-4000-8000-000000000001,COMPLETED,COMPLETED,CHARGES_PAID,,",
        ))
        // Approved before the trip
        .stdout(predicate::str::contains(
            "00000000-0000-4000-8000-000000000002,CONFIRMED,APPROVED,PAID,,",
        ))
        // Half waived, remainder collected
        .stdout(predicate::str::contains(
            "00000000-0000-4000-8000-000000000003,COMPLETED,COMPLETED,PARTIAL_PAID,,35",
        ))
        // Declined card leaves the charge pending
        .stdout(predicate::str::contains(
            "00000000-0000-4000-8000-000000000004,CONFIRMED,PENDING_CHARGES,PAYMENT_FAILED,70,",
        ));

    Ok(())
}

#[test]
fn test_cli_rejected_request_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let requests = dir.path().join("requests.jsonl");
    std::fs::write(
        &requests,
        concat!(
            r#"{"bookingId":"00000000-0000-4000-8000-000000000002","actor":"admin","action":"process_charges"}"#,
            "\n",
            r#"{"bookingId":"00000000-0000-4000-8000-000000000002","actor":"admin","action":"reject"}"#,
            "\n"
        ),
    )?;

    let mut cmd = Command::new(cargo_bin!("trip-settlement"));
    cmd.arg("tests/fixtures/seed.json").arg(&requests);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing request"))
        .stderr(predicate::str::contains("not valid for the pre-trip phase"))
        .stdout(predicate::str::contains(
            "00000000-0000-4000-8000-000000000002,CANCELLED,REJECTED,PENDING,,",
        ));

    Ok(())
}
