//! Tests for database repository operations.

use tempfile::NamedTempFile;

use side_stacker::{
    Color, CompletionRecord, GameRepository, NewGameRecord, Outcome, ResultSink, SqliteResultSink,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn board_with_red_column() -> String {
    let mut board = "o".repeat(49);
    for row in 0..4 {
        board.replace_range(row * 7..row * 7 + 1, "R");
    }
    board
}

#[test]
fn test_new_rejects_empty_path() {
    assert!(GameRepository::new(String::new()).is_err());
}

#[test]
fn test_unreachable_database_reports_connection_error() {
    let repo = GameRepository::new("/definitely/not/here/games.db".to_string())
        .expect("Path accepted");
    let error = repo.run_migrations().expect_err("Connection should fail");
    assert!(error.message.contains("Connection error"));
}

#[test]
fn test_migrations_are_idempotent() {
    let (_db, repo) = setup_test_db();
    let applied = repo.run_migrations().expect("Second run failed");
    assert_eq!(applied, 0);
}

#[test]
fn test_record_game() {
    let (_db, repo) = setup_test_db();
    let stored = repo
        .record_game(NewGameRecord::new(
            "game-1".to_string(),
            "RED".to_string(),
            board_with_red_column(),
            "2024-03-09 17:05:02".to_string(),
        ))
        .expect("Insert failed");

    assert_eq!(stored.id(), "game-1");
    assert_eq!(stored.board().len(), 49);
    assert_eq!(
        stored.parse_winner().expect("Bad winner"),
        Outcome::Won(Color::Red)
    );
}

#[test]
fn test_record_game_duplicate_id_fails() {
    let (_db, repo) = setup_test_db();
    let row = NewGameRecord::new(
        "dup".to_string(),
        "TIE".to_string(),
        "o".repeat(49),
        "2024-03-09 17:05:02".to_string(),
    );
    repo.record_game(row.clone()).expect("First insert failed");
    let result = repo.record_game(row);
    assert!(result.is_err(), "Duplicate id should fail");
}

#[test]
fn test_get_game_found_and_missing() {
    let (_db, repo) = setup_test_db();
    repo.record_game(NewGameRecord::new(
        "present".to_string(),
        "YELLOW".to_string(),
        "o".repeat(49),
        "2024-03-09 17:05:02".to_string(),
    ))
    .expect("Insert failed");

    let found = repo.get_game("present").expect("Query failed");
    assert_eq!(found.map(|g| g.winner().clone()), Some("YELLOW".to_string()));

    let missing = repo.get_game("absent").expect("Query failed");
    assert!(missing.is_none());
}

#[test]
fn test_list_games_newest_first_with_limit() {
    let (_db, repo) = setup_test_db();
    for (id, timestamp) in [
        ("a", "2024-03-09 10:00:00"),
        ("b", "2024-03-09 12:00:00"),
        ("c", "2024-03-09 11:00:00"),
    ] {
        repo.record_game(NewGameRecord::new(
            id.to_string(),
            "TIE".to_string(),
            "o".repeat(49),
            timestamp.to_string(),
        ))
        .expect("Insert failed");
    }

    let games = repo.list_games(10).expect("List failed");
    let ids: Vec<&str> = games.iter().map(|g| g.id().as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);

    let limited = repo.list_games(2).expect("List failed");
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_parse_winner_rejects_unknown_label() {
    let (_db, repo) = setup_test_db();
    let stored = repo
        .record_game(NewGameRecord::new(
            "odd".to_string(),
            "GREEN".to_string(),
            "o".repeat(49),
            "2024-03-09 17:05:02".to_string(),
        ))
        .expect("Insert failed");
    assert!(stored.parse_winner().is_err());
}

#[tokio::test]
async fn test_sqlite_sink_writes_record() {
    let (_db, repo) = setup_test_db();
    let sink = SqliteResultSink::new(repo.clone());

    sink.record(CompletionRecord::new(
        "sunk".to_string(),
        Outcome::Tie,
        "o".repeat(49),
        "2024-03-09 17:05:02".to_string(),
    ))
    .await
    .expect("Sink write failed");

    let stored = repo
        .get_game("sunk")
        .expect("Query failed")
        .expect("Record missing");
    assert_eq!(stored.winner(), "TIE");
    assert_eq!(stored.timestamp(), "2024-03-09 17:05:02");
}
