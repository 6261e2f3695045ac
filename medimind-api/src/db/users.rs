//! User persistence

use chrono::{DateTime, Utc};
use medimind_common::db::UserRow;
use medimind_common::time::to_rfc3339;
use medimind_common::uuid_utils::new_id;
use medimind_common::Result;
use sqlx::SqlitePool;

/// Insert a new user and return the stored row
pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    full_name: &str,
    now: DateTime<Utc>,
) -> Result<UserRow> {
    let id = new_id();
    let ts = to_rfc3339(now);

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, fcm_token, created_at, last_login)
        VALUES (?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await?;

    Ok(UserRow {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        full_name: full_name.to_string(),
        fcm_token: None,
        fcm_updated_at: None,
        created_at: now,
        last_login: Some(now),
    })
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(UserRow::from_row).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(UserRow::from_row).transpose()
}

pub async fn touch_last_login(pool: &SqlitePool, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(to_rfc3339(now))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store a device token; returns false if the user does not exist
pub async fn set_fcm_token(
    pool: &SqlitePool,
    user_id: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET fcm_token = ?, fcm_updated_at = ? WHERE id = ?")
        .bind(token)
        .bind(to_rfc3339(now))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a token FCM reported as invalid, unless the user has since replaced it
pub async fn clear_fcm_token(pool: &SqlitePool, user_id: &str, token: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET fcm_token = NULL WHERE id = ? AND fcm_token = ?")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimind_common::db::init_memory_database;

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = init_memory_database().await.unwrap();
        let now = Utc::now();

        let user = insert_user(&pool, "a@b.co", "hash", "Asha", now).await.unwrap();
        let by_email = find_by_email(&pool, "a@b.co").await.unwrap().unwrap();
        let by_id = find_by_id(&pool, &user.id).await.unwrap().unwrap();

        assert_eq!(by_email.id, user.id);
        assert_eq!(by_id.full_name, "Asha");
        assert!(by_id.last_login.is_some());
        assert!(find_by_email(&pool, "x@y.co").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fcm_token_set_and_clear() {
        let pool = init_memory_database().await.unwrap();
        let user = insert_user(&pool, "a@b.co", "hash", "", Utc::now()).await.unwrap();

        assert!(set_fcm_token(&pool, &user.id, "tok-1", Utc::now()).await.unwrap());
        assert!(!set_fcm_token(&pool, "missing", "tok", Utc::now()).await.unwrap());

        // Stale token does not clear a newer one
        assert!(!clear_fcm_token(&pool, &user.id, "tok-0").await.unwrap());
        assert!(clear_fcm_token(&pool, &user.id, "tok-1").await.unwrap());

        let user = find_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert!(user.fcm_token.is_none());
        assert!(user.fcm_updated_at.is_some());
    }
}
