mod site_stub;

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use predicates::prelude::*;
use site_stub::SiteStub;

fn classroom_cmd(stub: &SiteStub, session_file: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("classroom");
    cmd.env_remove("CLASSROOM_CONFIG")
        .args(stub.site_args())
        .arg("--session-file")
        .arg(session_file);
    cmd
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_millis() as i64
}

fn write_session(path: &Path, last_name: &str, dob: &str, expires_at: i64) {
    let payload = serde_json::json!({
        "lastName": last_name,
        "dob": dob,
        "createdAt": expires_at - 30 * 60 * 1000,
        "expiresAt": expires_at,
    });
    fs::write(path, payload.to_string()).expect("write session file");
}

#[test]
fn lookup_reports_weighted_progress_and_saves_session() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("state").join("session.json");

    classroom_cmd(&stub, &session_file)
        .args([
            "progress",
            "lookup",
            "--last-name",
            "  haddad ",
            "--dob-year",
            "2012",
            "--dob-month",
            "3",
            "--dob-day",
            "4",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Progress for Lina Haddad"))
        .stdout(predicate::str::contains("**E** · **92%** overall"))
        .stdout(predicate::str::contains("| Quiz | 88% M | 30% | 26% |"))
        .stdout(predicate::str::contains("| Test | N/A | 40% | 0% |"))
        .stdout(predicate::str::contains("Present"))
        .stdout(predicate::str::contains("Hidden quiz").not())
        .stdout(predicate::str::contains("Great focus, keep it up"))
        .stdout(predicate::str::contains("Session will reset in"));

    let raw = fs::read_to_string(&session_file)?;
    let session: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(session["lastName"], "haddad");
    assert_eq!(session["dob"], "2012-03-04");
    let created = session["createdAt"].as_i64().unwrap_or_default();
    let expires = session["expiresAt"].as_i64().unwrap_or_default();
    assert_eq!(expires - created, 30 * 60 * 1000);
    Ok(())
}

#[test]
fn lookup_category_filter_limits_records_only() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;

    classroom_cmd(&stub, &tmp.path().join("session.json"))
        .args([
            "progress",
            "lookup",
            "--last-name",
            "Haddad",
            "--dob-year",
            "2012",
            "--dob-month",
            "03",
            "--dob-day",
            "04",
            "--category",
            "quiz",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("### Records (quiz)"))
        .stdout(predicate::str::contains("88% (M)"))
        .stdout(predicate::str::contains("Worksheet 1").not())
        .stdout(predicate::str::contains("| Homework | 95% E | 20% | 19% |"));
    Ok(())
}

#[test]
fn lookup_rejects_impossible_dates_without_a_session() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");

    classroom_cmd(&stub, &session_file)
        .args([
            "progress",
            "lookup",
            "--last-name",
            "Haddad",
            "--dob-year",
            "2012",
            "--dob-month",
            "2",
            "--dob-day",
            "30",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Invalid date of birth. Please check the day, month, and year.",
        ));
    assert!(!session_file.exists());
    Ok(())
}

#[test]
fn lookup_with_blank_fields_asks_for_everything() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;

    classroom_cmd(&stub, &tmp.path().join("session.json"))
        .args([
            "progress",
            "lookup",
            "--last-name",
            "   ",
            "--dob-year",
            "2012",
            "--dob-month",
            "3",
            "--dob-day",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please fill in all fields."));
    Ok(())
}

#[test]
fn unknown_student_is_not_found() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;

    classroom_cmd(&stub, &tmp.path().join("session.json"))
        .args([
            "progress",
            "lookup",
            "--last-name",
            "Haddad",
            "--dob-year",
            "2013",
            "--dob-month",
            "3",
            "--dob-day",
            "4",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "We could not find a student with that last name and date of birth.",
        ));
    Ok(())
}

#[test]
fn roster_student_missing_from_sheet_gets_generic_error() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");

    classroom_cmd(&stub, &session_file)
        .args([
            "progress",
            "lookup",
            "--last-name",
            "Nasser",
            "--dob-year",
            "2012",
            "--dob-month",
            "1",
            "--dob-day",
            "15",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Something went wrong while loading progress. Please refresh and try again.",
        ));
    assert!(!session_file.exists());
    Ok(())
}

#[test]
fn resume_replays_a_live_session() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");
    write_session(&session_file, "Saleh", "2011-11-30", now_ms() + 10 * 60 * 1000);

    classroom_cmd(&stub, &session_file)
        .args(["progress", "resume"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Progress for Omar Saleh"))
        .stdout(predicate::str::contains("Needs to practice letters"))
        .stdout(predicate::str::contains("Session will reset in"));
    assert!(session_file.exists());
    Ok(())
}

#[test]
fn resume_clears_the_session_when_the_replay_fails() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");
    write_session(&session_file, "Nasser", "2012-01-15", now_ms() + 10 * 60 * 1000);

    classroom_cmd(&stub, &session_file)
        .args(["progress", "resume"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Something went wrong while loading progress. Please refresh and try again.",
        ));
    assert!(!session_file.exists());
    Ok(())
}

#[test]
fn resume_discards_an_expired_session_silently() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");
    write_session(&session_file, "Saleh", "2011-11-30", now_ms() - 1000);

    classroom_cmd(&stub, &session_file)
        .args(["progress", "resume"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(!session_file.exists());
    Ok(())
}

#[test]
fn resume_discards_a_malformed_session() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");
    fs::write(&session_file, "{not json")?;

    classroom_cmd(&stub, &session_file)
        .args(["progress", "resume"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(!session_file.exists());
    Ok(())
}

#[test]
fn clear_forgets_the_session() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let tmp = tempfile::tempdir()?;
    let session_file = tmp.path().join("session.json");
    write_session(&session_file, "Saleh", "2011-11-30", now_ms() + 60_000);

    classroom_cmd(&stub, &session_file)
        .args(["progress", "clear"])
        .assert()
        .success();
    assert!(!session_file.exists());

    classroom_cmd(&stub, &session_file)
        .args(["progress", "clear"])
        .assert()
        .success();
    Ok(())
}
