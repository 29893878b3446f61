mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

fn player() -> String {
    format!("test-player-{}", Uuid::new_v4())
}

async fn start(app: &axum::Router, player_id: &str) -> serde_json::Value {
    let (status, json) = common::send(
        app,
        "POST",
        "/api/v1/games",
        Some(json!({ "player_id": player_id, "display_name": "Tester" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

async fn answer(app: &axum::Router, player_id: &str, selected: usize) -> (StatusCode, serde_json::Value) {
    common::send(
        app,
        "POST",
        &format!("/api/v1/games/{}/answers", player_id),
        Some(json!({ "selected_index": selected, "response_time_seconds": 3.0 })),
    )
    .await
}

async fn advance(app: &axum::Router, player_id: &str) -> (StatusCode, serde_json::Value) {
    common::send(app, "POST", &format!("/api/v1/games/{}/advance", player_id), None).await
}

#[tokio::test]
async fn test_start_game_shows_first_question_without_answer() {
    let app = common::create_test_app();
    let player_id = player();

    let json = start(&app, &player_id).await;

    assert_eq!(json["state"], "awaiting_answer");
    assert_eq!(json["index"], 0);
    assert_eq!(json["restored"], false);
    assert_eq!(json["persistence"], "saved");
    assert_eq!(json["stats"]["score"], 0);
    assert!(json["question"]["prompt"].is_string());
    assert!(json["question"].get("correct_index").is_none());
}

#[tokio::test]
async fn test_correct_answer_scores_and_streak_multiplier_kicks_in() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let mut last = serde_json::Value::Null;
    for i in 0..3 {
        let (status, json) = answer(&app, &player_id, common::correct_index(i)).await;
        assert_eq!(status, StatusCode::OK);
        last = json;
        let (status, _) = advance(&app, &player_id).await;
        assert_eq!(status, StatusCode::OK);
    }

    // 15 + 15 + round(15 * 1.1)
    assert_eq!(last["event"]["points_awarded"], 17);
    assert_eq!(last["stats"]["score"], 47);
    assert_eq!(last["stats"]["streak"], 3);
    let kinds: Vec<&str> = last["signals"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"correct"));
    assert!(kinds.contains(&"streak_banner"));
}

#[tokio::test]
async fn test_wrong_answer_reveals_correct_option() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let correct = common::correct_index(0);
    let wrong = (correct + 1) % 4;
    let (status, json) = answer(&app, &player_id, wrong).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["is_correct"], false);
    assert_eq!(json["event"]["points_awarded"], 0);
    assert_eq!(json["correct_index"], correct);
    assert_eq!(json["stats"]["streak"], 0);
}

#[tokio::test]
async fn test_second_submission_is_conflict() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let (status, _) = answer(&app, &player_id, common::correct_index(0)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = answer(&app, &player_id, common::correct_index(0)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_out_of_range_selection_is_bad_request() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let (status, _) = answer(&app, &player_id, 9).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, state) = common::send(&app, "GET", &format!("/api/v1/games/{}", player_id), None).await;
    assert_eq!(state["state"], "awaiting_answer");
    assert_eq!(state["stats"]["attempts"], 0);
}

#[tokio::test]
async fn test_advance_before_answer_is_conflict() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let (status, _) = advance(&app, &player_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_full_game_completes_with_leaderboard() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let total = common::question_count();
    let mut last = serde_json::Value::Null;
    for i in 0..total {
        let (status, _) = answer(&app, &player_id, common::correct_index(i)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = advance(&app, &player_id).await;
        assert_eq!(status, StatusCode::OK);
        last = json;
    }

    assert_eq!(last["completed"], true);
    assert_eq!(last["state"], "completed");
    assert_eq!(last["stats"]["progress"], 100.0);
    assert_eq!(last["leaderboard"]["entries"][0]["player_id"], player_id.as_str());
    assert_eq!(last["leaderboard"]["stale"], false);

    let (status, _) = answer(&app, &player_id, 0).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, board) = common::send(&app, "GET", "/api/v1/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["entries"][0]["score"], last["stats"]["score"]);
}

#[tokio::test]
async fn test_starting_again_after_completion_is_a_new_game() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;
    for i in 0..common::question_count() {
        answer(&app, &player_id, common::correct_index(i)).await;
        advance(&app, &player_id).await;
    }

    let json = start(&app, &player_id).await;

    assert_eq!(json["state"], "awaiting_answer");
    assert_eq!(json["index"], 0);
    assert_eq!(json["restored"], false);
    assert_eq!(json["stats"]["score"], 0);

    let (status, _) = answer(&app, &player_id, common::correct_index(0)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_restart_resets_progress() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;
    answer(&app, &player_id, common::correct_index(0)).await;

    let (status, json) = common::send(
        &app,
        "POST",
        &format!("/api/v1/games/{}/restart", player_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "awaiting_answer");
    assert_eq!(json["index"], 0);
    assert_eq!(json["stats"]["score"], 0);
    assert_eq!(json["stats"]["attempts"], 0);
}

#[tokio::test]
async fn test_end_game_then_unknown_player_is_not_found() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let (status, _) =
        common::send(&app, "DELETE", &format!("/api/v1/games/{}", player_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(&app, "GET", &format!("/api/v1/games/{}", player_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = answer(&app, &player_id, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ended_game_resumes_from_store() {
    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;
    answer(&app, &player_id, common::correct_index(0)).await;
    common::send(&app, "DELETE", &format!("/api/v1/games/{}", player_id), None).await;

    let (status, json) = common::send(
        &app,
        "POST",
        "/api/v1/games",
        Some(json!({ "player_id": player_id })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["restored"], true);
    assert_eq!(json["state"], "answered");
    assert_eq!(json["stats"]["score"], 15);
    assert_eq!(json["display_name"], "Tester");

    // the restored question was already scored
    let (status, _) = answer(&app, &player_id, common::correct_index(0)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_start_request_is_unprocessable() {
    let app = common::create_test_app();

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/games",
        Some(json!({ "player_id": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_questions_endpoint_hides_answers() {
    let app = common::create_test_app();

    let (status, json) = common::send(&app, "GET", "/api/v1/questions", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_questions"], common::question_count());
    let first = &json["questions"][0];
    assert!(first["options"].is_array());
    assert!(first.get("correct_index").is_none());
    assert!(first.get("explanation").is_none());
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let app = common::create_test_app();

    let (status, json) = common::send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage_backend"], "memory");
}

#[tokio::test]
async fn test_metrics_requires_basic_auth() {
    let app = common::create_test_app();

    let (status, _) = common::send(&app, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_requires_active_game() {
    let app = common::create_test_app();

    let (status, _) = common::send(&app, "GET", "/api/v1/games/nobody/stream", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_emits_timer_ticks() {
    use axum::body::Body;
    use axum::http::Request;
    use futures::StreamExt;
    use tower::ServiceExt;

    let app = common::create_test_app();
    let player_id = player();
    start(&app, &player_id).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/games/{}/stream", player_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = body.next().await.unwrap().unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: timer-tick"));
    assert!(text.contains(&player_id));
}
