//! Session record persistence
//!
//! The session lives in a single row: encrypted token, IV, and the user
//! profile JSON written together in one statement. There is never a state
//! where the token exists without its user or vice versa.

use crate::encryption::EncryptedToken;
use relay_core::{Error, Result};
use sqlx::SqlitePool;

/// Raw persisted session record (token still encrypted)
#[derive(Debug)]
pub struct SessionRecord {
    pub token: EncryptedToken,
    pub user_json: String,
}

/// Write the combined session record, replacing any previous one
pub async fn save_session(
    pool: &SqlitePool,
    encrypted: &EncryptedToken,
    user_json: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session (id, token_encrypted, iv, user_json, saved_at)
        VALUES (1, ?1, ?2, ?3, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            token_encrypted = ?1,
            iv = ?2,
            user_json = ?3,
            saved_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&encrypted.ciphertext)
    .bind(&encrypted.iv[..])
    .bind(user_json)
    .execute(pool)
    .await
    .map_err(|e| Error::StorageError(e.to_string()))?;

    Ok(())
}

/// Load the persisted session record, if any
pub async fn load_session(pool: &SqlitePool) -> Result<Option<SessionRecord>> {
    let row: Option<(Vec<u8>, Vec<u8>, String)> = sqlx::query_as(
        r#"
        SELECT token_encrypted, iv, user_json
        FROM session
        WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::StorageError(e.to_string()))?;

    match row {
        Some((ciphertext, iv_vec, user_json)) => {
            if iv_vec.len() != 12 {
                return Err(Error::StorageError("Invalid IV length".to_string()));
            }
            let mut iv = [0u8; 12];
            iv.copy_from_slice(&iv_vec);
            Ok(Some(SessionRecord {
                token: EncryptedToken { ciphertext, iv },
                user_json,
            }))
        }
        None => Ok(None),
    }
}

/// Remove the persisted session record
pub async fn clear_session(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM session WHERE id = 1")
        .execute(pool)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

    Ok(())
}
