mod fixtures;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

use fixtures::{API_KEY, STREAM_PATH, base_url, text_response, verdict, write_short_scenario};

fn request_bodies(requests: &[wiremock::Request]) -> Vec<serde_json::Value> {
    requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn system_text(body: &serde_json::Value) -> &str {
    body["systemInstruction"]["parts"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_scenario_passes_every_line_then_disables_input() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_short_scenario(home.path());

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(text_response(&verdict(true, "翻譯得很好！", "午後なら空いてるよ。")))
        .expect(2)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .env("GEMINI_BASE_URL", base_url(&mock_server.uri()))
        .args(["scenario", "--id", "short", "--role", "A"])
        .write_stdin("今週の土曜日、暇？\nじゃあ、当日ね！\nもう一回\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/2] 友人A: 這禮拜六有空嗎？"))
        .stdout(predicate::str::contains("✓ Passed").count(2))
        .stdout(predicate::str::contains("友人B> 午後なら空いてるよ。"))
        .stdout(predicate::str::contains("[2/2] 友人A: 那就當天見啦！"))
        .stdout(predicate::str::contains("Scenario complete! (2/2)"))
        .stdout(predicate::str::contains("Input disabled"));

    let bodies = request_bodies(&mock_server.received_requests().await.unwrap());
    assert_eq!(bodies.len(), 2);
    for body in &bodies {
        // Each request carries only the newest submission
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }
    assert!(system_text(&bodies[0]).contains("「這禮拜六有空嗎？」"));
    assert!(system_text(&bodies[0]).contains("「下午應該有空。」"));
    assert!(system_text(&bodies[1]).contains("「那就當天見啦！」"));
    assert!(!system_text(&bodies[1]).contains("對方角色的下一句中文台詞"));
}

#[tokio::test]
async fn test_scenario_failed_verdict_retries_same_line() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_short_scenario(home.path());

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(text_response(&verdict(false, "意思不太對，再試一次。", "")))
        .expect(2)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .env("GEMINI_BASE_URL", base_url(&mock_server.uri()))
        .args(["scenario", "--id", "short"])
        .write_stdin("週末はひま？\n週末はひまですか？\n:history\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ Not quite").count(2))
        .stdout(predicate::str::contains("週末はひま？ → 今週の土曜日、暇？"))
        .stdout(predicate::str::contains("you> 週末はひま？"))
        .stdout(predicate::str::contains("tutor> 意思不太對，再試一次。 [corrections]"));

    let bodies = request_bodies(&mock_server.received_requests().await.unwrap());
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["contents"].as_array().unwrap().len(), 1);
    assert_eq!(bodies[1]["contents"][0]["parts"][0]["text"], "週末はひまですか？");
    assert!(system_text(&bodies[1]).contains("「這禮拜六有空嗎？」"));
}

#[tokio::test]
async fn test_scenario_unreadable_verdict_keeps_input_disabled() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_short_scenario(home.path());

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(text_response(r#"{"reply":"嗯……"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .env("GEMINI_BASE_URL", base_url(&mock_server.uri()))
        .args(["scenario", "--id", "short"])
        .write_stdin("今週の土曜日、暇？\nもう一度\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Could not read the verdict"))
        .stdout(predicate::str::contains("Still waiting for the verdict"));
}

#[tokio::test]
async fn test_scenario_role_switch_restarts_session() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_short_scenario(home.path());

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .env("GEMINI_BASE_URL", base_url(&mock_server.uri()))
        .args(["scenario", "--id", "short"])
        .write_stdin(":role B\n:script\n:role C\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("You are B（友人B）"))
        .stdout(predicate::str::contains("[1/1] 友人B: 下午應該有空。"))
        .stdout(predicate::str::contains("▶* B（友人B）: 下午應該有空。"))
        .stdout(predicate::str::contains("Unknown role: C"));
}

#[tokio::test]
async fn test_scenario_defaults_to_builtin_weekend_plan() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .env("GEMINI_BASE_URL", base_url(&mock_server.uri()))
        .args(["scenario", "--role", "b"])
        .write_stdin(":q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("討論週末計畫 (weekend-plan)"))
        .stdout(predicate::str::contains("[1/6] 友人B: 禮拜六喔？"));
}

#[test]
fn test_unknown_scenario_lists_available_ids() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kaiwa")
        .env("KAIWA_HOME", home.path())
        .env("GEMINI_API_KEY", API_KEY)
        .args(["scenario", "--id", "missing"])
        .write_stdin(":q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown scenario: missing"))
        .stderr(predicate::str::contains("weekend-plan"));
}
