use sqlx::SqlitePool;

use crate::models::{Correction, ProcessingType, TextCorrection};

const SELECT_COLUMNS: &str =
    "id, user_id, original_text, corrected_text, processing_type, corrections_data, words_used, created_at";

pub async fn insert_correction(
    pool: &SqlitePool,
    user_id: &str,
    original_text: &str,
    corrected_text: &str,
    processing_type: ProcessingType,
    corrections: &[Correction],
    words_used: i64,
) -> Result<TextCorrection, sqlx::Error> {
    let id = uuid::Uuid::now_v7().to_string();
    let corrections_data =
        serde_json::to_string(corrections).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO text_corrections
            (id, user_id, original_text, corrected_text, processing_type, corrections_data, words_used)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(original_text)
    .bind(corrected_text)
    .bind(processing_type)
    .bind(&corrections_data)
    .bind(words_used)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, TextCorrection>(&format!(
        "SELECT {SELECT_COLUMNS} FROM text_corrections WHERE id = ?"
    ))
    .bind(&id)
    .fetch_one(pool)
    .await
}

/// 최신순 교정 이력
pub async fn list_corrections(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextCorrection>, sqlx::Error> {
    sqlx::query_as::<_, TextCorrection>(&format!(
        r#"
        SELECT {SELECT_COLUMNS}
        FROM text_corrections
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// 본인 소유 이력만 조회됩니다.
pub async fn get_correction(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<TextCorrection>, sqlx::Error> {
    sqlx::query_as::<_, TextCorrection>(&format!(
        "SELECT {SELECT_COLUMNS} FROM text_corrections WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// 삭제되면 true
pub async fn delete_correction(pool: &SqlitePool, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM text_corrections WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
