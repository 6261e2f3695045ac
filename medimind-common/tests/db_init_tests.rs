//! Tests for database initialization and row decoding

use medimind_common::db::{init_database, init_memory_database, ScheduleRow, UserRow};
use sqlx::Row;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("data").join("medimind.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("medimind.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();

    for table in ["prescriptions", "schedules", "users"] {
        assert!(names.contains(&table.to_string()), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_email_is_unique() {
    let pool = init_memory_database().await.unwrap();

    let insert = "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, 'x', '2025-01-01T00:00:00Z')";
    sqlx::query(insert).bind("u1").bind("a@b.co").execute(&pool).await.unwrap();
    let dup = sqlx::query(insert).bind("u2").bind("a@b.co").execute(&pool).await;

    assert!(dup.is_err(), "duplicate email must be rejected");
}

#[tokio::test]
async fn test_schedule_row_decodes_json_columns() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES ('u1', 'a@b.co', 'x', '2025-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        r#"INSERT INTO schedules (id, user_id, medicine_name, timings, custom_times,
               reminders_sent_today, created_at)
           VALUES ('s1', 'u1', 'Paracetamol', '["morning","night"]', '{"night":"22:15"}',
               '{"morning":"2025-01-02T02:31:00Z"}', '2025-01-01T00:00:00Z')"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let row = sqlx::query("SELECT * FROM schedules WHERE id = 's1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let schedule = ScheduleRow::from_row(&row).unwrap();

    assert_eq!(schedule.timings, vec!["morning", "night"]);
    assert_eq!(schedule.custom_times.get("night").map(String::as_str), Some("22:15"));
    assert!(schedule.reminders_sent_today.contains_key("morning"));
    assert!(schedule.enabled, "enabled defaults to true");
    assert_eq!(schedule.dosage, "N/A");
    assert!(schedule.prescription_id.is_none());
}

#[tokio::test]
async fn test_malformed_json_column_decodes_as_empty() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES ('u1', 'a@b.co', 'x', '2025-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO schedules (id, user_id, medicine_name, timings, created_at) VALUES ('s1', 'u1', 'X', 'not json', '2025-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let row = sqlx::query("SELECT * FROM schedules").fetch_one(&pool).await.unwrap();
    let schedule = ScheduleRow::from_row(&row).unwrap();
    assert!(schedule.timings.is_empty());

    let row = sqlx::query("SELECT * FROM users").fetch_one(&pool).await.unwrap();
    let user = UserRow::from_row(&row).unwrap();
    assert_eq!(user.full_name, "");
    assert!(user.fcm_token.is_none());
}
