use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use kalima::db::{self, DbPool, SqliteStore};
use kalima::engine::{KeyValueStore, ManualScheduler, Scheduler};
use kalima::handlers;
use kalima::session::DeckRegistry;
use kalima::state::AppState;

struct Harness {
  server: TestServer,
  scheduler: Arc<ManualScheduler>,
  pool: DbPool,
}

fn state_for(pool: &DbPool, scheduler: &Arc<ManualScheduler>) -> AppState {
  let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(pool.clone()));
  let clock: Arc<dyn Scheduler> = scheduler.clone();
  AppState::with_parts(pool.clone(), DeckRegistry::new(store, clock.clone()), clock)
}

fn harness() -> Harness {
  let pool = db::open_in_memory().unwrap();
  db::seed_starter_lessons(&pool.lock().unwrap()).unwrap();
  let scheduler = Arc::new(ManualScheduler::new());
  let server = TestServer::new(handlers::router(state_for(&pool, &scheduler))).unwrap();
  Harness {
    server,
    scheduler,
    pool,
  }
}

/// A fresh server over the same database, as after a restart.
fn restarted(h: &Harness) -> TestServer {
  TestServer::new(handlers::router(state_for(&h.pool, &h.scheduler))).unwrap()
}

fn card_ids(view: &Value) -> Vec<String> {
  view["cards"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["item"]["id"].as_str().unwrap().to_string())
    .collect()
}

fn queue_ids(view: &Value) -> Vec<String> {
  view["queue"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["itemId"].as_str().unwrap().to_string())
    .collect()
}

// ==================== Items ====================

#[tokio::test]
async fn test_items_and_lessons() {
  let h = harness();

  let lessons: Value = h.server.get("/api/lessons").await.json();
  assert_eq!(lessons.as_array().unwrap().len(), 2);
  assert_eq!(lessons[0]["language"], "arabic");

  let res: Value = h.server.get("/api/items").add_query_param("deck", "lesson:2").await.json();
  assert_eq!(res["deck"], "lesson:2");
  let items = res["items"].as_array().unwrap();
  assert_eq!(items.len(), 3);
  assert!(items.iter().all(|i| i["language"] == "spanish"));
  assert_eq!(items[0]["origin"]["type"], "lesson_vocab_item");
}

#[tokio::test]
async fn test_bad_and_unknown_decks() {
  let h = harness();

  let res = h.server.get("/api/cards/everything").await;
  res.assert_status(StatusCode::BAD_REQUEST);
  assert!(res.json::<Value>()["error"].as_str().unwrap().contains("everything"));

  h.server
    .get("/api/exercises/lesson:99")
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_saved_word_joins_saved_deck() {
  let h = harness();

  let res = h
    .server
    .post("/api/saved-words")
    .json(&json!({
      "word": "عين",
      "translation": "eye",
      "hebrewCognate": {"word": "עין", "transliteration": "ayin"},
      "sourceLookupId": "lookup-7"
    }))
    .await;
  res.assert_status(StatusCode::CREATED);
  let saved: Value = res.json();
  assert_eq!(saved["created"], true);
  let item_id = saved["itemId"].as_str().unwrap().to_string();

  // Saving the same word again returns the existing row
  let again = h
    .server
    .post("/api/saved-words")
    .json(&json!({"word": "عين", "translation": "eye"}))
    .await;
  again.assert_status_ok();
  assert_eq!(again.json::<Value>()["id"], saved["id"]);

  let items: Value = h.server.get("/api/items?deck=saved").await.json();
  let items = items["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["id"], item_id.as_str());
  assert_eq!(items[0]["linkage"]["lookupId"], "lookup-7");
  assert_eq!(items[0]["cognate"]["word"], "עין");

  h.server
    .post("/api/saved-words")
    .json(&json!({"word": "  ", "translation": "blank"}))
    .await
    .assert_status(StatusCode::BAD_REQUEST);
}

// ==================== Cards ====================

#[tokio::test]
async fn test_card_actions_and_undo() {
  let h = harness();

  let view: Value = h.server.get("/api/cards/lesson:1").await.json();
  assert_eq!(view["totalCards"], 6);
  assert_eq!(view["remainingCards"], 6);
  assert_eq!(view["canUndo"], false);

  let view: Value = h
    .server
    .post("/api/cards/lesson:1/action")
    .json(&json!({"type": "dismiss", "itemId": "vocab-1"}))
    .await
    .json();
  assert_eq!(view["dismissedCount"], 1);
  assert_eq!(view["remainingCards"], 5);
  assert_eq!(view["canUndo"], true);
  assert_eq!(view["undoAction"]["type"], "dismiss");

  let view: Value = h.server.post("/api/cards/lesson:1/undo").await.json();
  assert_eq!(view["dismissedCount"], 0);
  assert_eq!(view["canUndo"], false);
  assert_eq!(card_ids(&view)[0], "vocab-1");

  // A second undo is a no-op
  h.server.post("/api/cards/lesson:1/undo").await.assert_status_ok();
}

#[tokio::test]
async fn test_undo_expires_after_window() {
  let h = harness();

  h.server
    .post("/api/cards/lesson:1/action")
    .json(&json!({"type": "save", "itemId": "vocab-2"}))
    .await
    .assert_status_ok();

  h.scheduler.advance(Duration::from_millis(4999));
  let view: Value = h.server.get("/api/cards/lesson:1").await.json();
  assert_eq!(view["canUndo"], true);

  h.scheduler.advance(Duration::from_millis(1));
  let view: Value = h.server.post("/api/cards/lesson:1/undo").await.json();
  assert_eq!(view["canUndo"], false);
  assert_eq!(view["saved"].as_array().unwrap().len(), 1);
  assert_eq!(view["saved"][0]["item"]["id"], "vocab-2");
}

#[tokio::test]
async fn test_later_moves_card_to_end_and_survives_restart() {
  let h = harness();

  let view: Value = h
    .server
    .post("/api/cards/lesson:2/action")
    .json(&json!({"type": "later", "itemId": "vocab-7"}))
    .await
    .json();
  assert_eq!(card_ids(&view), ["vocab-8", "vocab-9", "vocab-7"]);
  assert_eq!(view["cards"][2]["status"], "later");

  let view: Value = restarted(&h).get("/api/cards/lesson:2").await.json();
  assert_eq!(card_ids(&view), ["vocab-8", "vocab-9", "vocab-7"]);
  assert_eq!(view["canUndo"], false);
}

#[tokio::test]
async fn test_unknown_card_and_start_change_nothing() {
  let h = harness();

  for action in [
    json!({"type": "dismiss", "itemId": "vocab-404"}),
    json!({"type": "start", "itemId": "vocab-7"}),
  ] {
    let view: Value = h.server.post("/api/cards/lesson:2/action").json(&action).await.json();
    assert_eq!(view["remainingCards"], 3);
    assert_eq!(view["canUndo"], false);
  }
}

#[tokio::test]
async fn test_dismissed_card_cannot_come_back() {
  let h = harness();

  h.server
    .post("/api/cards/lesson:2/action")
    .json(&json!({"type": "dismiss", "itemId": "vocab-7"}))
    .await
    .assert_status_ok();
  let view: Value = h
    .server
    .post("/api/cards/lesson:2/action")
    .json(&json!({"type": "later", "itemId": "vocab-7"}))
    .await
    .json();
  assert_eq!(view["dismissedCount"], 1);
  assert_eq!(card_ids(&view), ["vocab-8", "vocab-9"]);
  assert_eq!(view["undoAction"]["type"], "dismiss");

  let view: Value = h.server.post("/api/cards/lesson:2/undo").await.json();
  assert_eq!(view["dismissedCount"], 0);
  assert_eq!(card_ids(&view), ["vocab-7", "vocab-8", "vocab-9"]);
}

#[tokio::test]
async fn test_reset_restores_every_card() {
  let h = harness();

  for id in ["vocab-7", "vocab-8"] {
    h.server
      .post("/api/cards/lesson:2/action")
      .json(&json!({"type": "dismiss", "itemId": id}))
      .await
      .assert_status_ok();
  }
  let view: Value = h.server.post("/api/cards/lesson:2/reset").await.json();
  assert_eq!(view["remainingCards"], 3);
  assert_eq!(view["dismissedCount"], 0);
  assert_eq!(card_ids(&view), ["vocab-7", "vocab-8", "vocab-9"]);
}

#[tokio::test]
async fn test_refresh_picks_up_new_saved_words() {
  let h = harness();

  h.server
    .post("/api/cards/saved/action")
    .json(&json!({"type": "dismiss", "itemId": "nothing-yet"}))
    .await
    .assert_status_ok();
  h.server
    .post("/api/saved-words")
    .json(&json!({"word": "ملك", "translation": "king"}))
    .await
    .assert_status(StatusCode::CREATED);

  let view: Value = h.server.get("/api/cards/saved").await.json();
  assert_eq!(view["totalCards"], 0);

  let view: Value = h.server.post("/api/cards/saved/refresh").await.json();
  assert_eq!(view["totalCards"], 1);
  assert_eq!(card_ids(&view), ["saved-1"]);
}

// ==================== Cognate gating ====================

#[tokio::test]
async fn test_hebrew_cognates_follow_setting() {
  let h = harness();

  let settings: Value = h.server.get("/api/settings").await.json();
  assert_eq!(settings["knowsHebrew"], false);

  let view: Value = h.server.get("/api/cards/lesson:1").await.json();
  assert!(view["cards"][0].get("hebrewCognate").is_none());
  assert!(view["cards"][0]["item"].get("cognate").is_none());

  let settings: Value = h
    .server
    .post("/api/settings")
    .json(&json!({"knowsHebrew": true}))
    .await
    .json();
  assert_eq!(settings["knowsHebrew"], true);

  let view: Value = h.server.get("/api/cards/lesson:1").await.json();
  assert_eq!(view["cards"][0]["hebrewCognate"]["word"], "שלום");
  // Built-in lookup covers words without stored enrichment
  assert_eq!(view["cards"][2]["hebrewCognate"]["word"], "כתב");
  // Sentences get per-word hints instead
  assert!(view["cards"][5].get("hebrewCognate").is_none());
  assert_eq!(view["cards"][5]["cognateHints"][0]["word"], "بيت");

  // Spanish never shows Hebrew cognates
  let view: Value = h.server.get("/api/exercises/lesson:2").await.json();
  assert!(view["current"].get("hebrewCognate").is_none());
}

// ==================== Exercises ====================

#[tokio::test]
async fn test_exercise_flow() {
  let h = harness();

  let view: Value = h.server.get("/api/exercises/lesson:2").await.json();
  assert_eq!(view["phase"], "prompting");
  assert_eq!(view["isHydrated"], true);
  assert_eq!(view["current"]["itemId"], "vocab-7");
  assert_eq!(view["current"]["prompt"], "hola");
  assert_eq!(view["current"]["tokens"][0]["type"], "word");

  let view: Value = h.server.post("/api/exercises/lesson:2/skip").await.json();
  assert_eq!(queue_ids(&view), ["vocab-8", "vocab-9", "vocab-7"]);
  assert_eq!(view["current"]["itemId"], "vocab-8");

  let res: Value = h
    .server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({"answer": "thank you"}))
    .await
    .json();
  assert_eq!(res["result"], "correct");
  assert_eq!(res["recorded"], true);
  assert_eq!(res["exercise"]["phase"], "feedback");
  assert_eq!(res["exercise"]["feedback"]["correct"], true);

  // Answers are ignored while showing feedback
  let res: Value = h
    .server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({"answer": "again"}))
    .await
    .json();
  assert!(res["result"].is_null());
  assert_eq!(res["exercise"]["progress"]["answered"], 1);

  let view: Value = h.server.post("/api/exercises/lesson:2/continue").await.json();
  assert_eq!(view["phase"], "prompting");
  assert_eq!(view["current"]["itemId"], "vocab-9");

  let res: Value = h
    .server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({"answer": "goodbye"}))
    .await
    .json();
  assert_eq!(res["result"], "incorrect");
  assert_eq!(res["exercise"]["feedback"]["expectedAnswer"], "how are you");

  h.server.post("/api/exercises/lesson:2/continue").await.assert_status_ok();
  h.server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({"answer": "hello"}))
    .await
    .assert_status_ok();
  let view: Value = h.server.post("/api/exercises/lesson:2/continue").await.json();
  assert_eq!(view["phase"], "complete");
  assert!(view.get("current").is_none());
  assert_eq!(view["progress"], json!({"answered": 3, "correct": 2, "total": 3}));

  let view: Value = h.server.post("/api/exercises/lesson:2/restart").await.json();
  assert_eq!(view["phase"], "prompting");
  assert_eq!(view["progress"]["answered"], 0);
  assert_eq!(queue_ids(&view), ["vocab-7", "vocab-8", "vocab-9"]);
}

#[tokio::test]
async fn test_answer_is_written_back_to_lesson_row() {
  let h = harness();

  h.server
    .post("/api/exercises/lesson:1/answer")
    .json(&json!({"answer": "peace"}))
    .await
    .assert_status_ok();

  let conn = h.pool.lock().unwrap();
  let row = &db::get_lesson_vocab(&conn, 1).unwrap()[0];
  assert_eq!(row.times_correct, 1);
  assert!(row.next_review.is_some());
}

#[tokio::test]
async fn test_exercise_resumes_after_restart() {
  let h = harness();

  h.server.post("/api/exercises/lesson:2/skip").await.assert_status_ok();
  h.server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({"answer": "thank you"}))
    .await
    .assert_status_ok();

  let view: Value = restarted(&h).get("/api/exercises/lesson:2").await.json();
  assert_eq!(view["isHydrated"], true);
  assert_eq!(view["phase"], "feedback");
  assert_eq!(view["current"]["itemId"], "vocab-8");
  assert_eq!(queue_ids(&view), ["vocab-8", "vocab-9", "vocab-7"]);
  assert_eq!(view["feedback"]["correct"], true);
}

#[tokio::test]
async fn test_overlong_answer_rejected() {
  let h = harness();

  let answer = "x".repeat(501);
  h.server
    .post("/api/exercises/lesson:2/answer")
    .json(&json!({ "answer": answer }))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  let view: Value = h.server.get("/api/exercises/lesson:2").await.json();
  assert_eq!(view["phase"], "prompting");
}
