//! Email verification tokens.
//!
//! Tokens are single use: consuming one deletes it. Expired rows are left
//! for the cleanup task.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sqlx::sqlite::SqlitePool;

/// How long a verification link stays usable.
pub const VERIFICATION_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct VerificationStore {
    pool: SqlitePool,
}

impl VerificationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a verification token for a user and return it.
    pub async fn create(&self, user_id: i64) -> Result<String, sqlx::Error> {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO email_verifications (token, user_id, expires_at)
             VALUES (?, ?, datetime('now', '+' || ? || ' hours'))",
        )
        .bind(&token)
        .bind(user_id)
        .bind(VERIFICATION_TTL_HOURS)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    /// Consume a token. Returns the owning user ID if the token existed and had not expired.
    pub async fn consume(&self, token: &str) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "DELETE FROM email_verifications
             WHERE token = ? AND expires_at > datetime('now')
             RETURNING user_id",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Most recent live token for a user, if any.
    pub async fn latest_for_user(&self, user_id: i64) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT token FROM email_verifications
             WHERE user_id = ? AND expires_at > datetime('now')
             ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Delete every token belonging to a user.
    pub async fn delete_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired tokens.
    pub async fn cleanup_expired(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM email_verifications WHERE expires_at <= datetime('now')")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    async fn expire_all(&self) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE email_verifications SET expires_at = datetime('now', '-1 hours')")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, NewUser, UserRole};

    async fn setup() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&NewUser {
                uuid: "uuid-bob",
                name: "Bob",
                email: "bob@example.com",
                password_hash: "hash",
                role: UserRole::User,
            })
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let (db, user_id) = setup().await;
        let token = db.verifications().create(user_id).await.unwrap();
        assert_eq!(token.len(), 43);

        assert_eq!(db.verifications().consume(&token).await.unwrap(), Some(user_id));
        assert_eq!(db.verifications().consume(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (db, _) = setup().await;
        assert_eq!(db.verifications().consume("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_token_rejected_and_cleaned() {
        let (db, user_id) = setup().await;
        let token = db.verifications().create(user_id).await.unwrap();
        db.verifications().expire_all().await.unwrap();

        assert_eq!(db.verifications().latest_for_user(user_id).await.unwrap(), None);
        assert_eq!(db.verifications().consume(&token).await.unwrap(), None);
        assert_eq!(db.verifications().cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_for_user() {
        let (db, user_id) = setup().await;
        db.verifications().create(user_id).await.unwrap();
        let second = db.verifications().create(user_id).await.unwrap();

        assert_eq!(
            db.verifications().latest_for_user(user_id).await.unwrap(),
            Some(second)
        );
        assert_eq!(db.verifications().delete_for_user(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_tokens_removed_with_user() {
        let (db, user_id) = setup().await;
        let token = db.verifications().create(user_id).await.unwrap();
        db.users().delete(user_id).await.unwrap();
        assert_eq!(db.verifications().consume(&token).await.unwrap(), None);
    }
}
