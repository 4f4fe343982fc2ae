use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;

/// Inserts or replaces the user's resume. Re-uploads refresh `uploaded_at`.
pub async fn upsert_resume(
    pool: &PgPool,
    user_sub: &str,
    user_email: &str,
    file_url: &str,
) -> Result<ResumeRow, AppError> {
    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (user_sub, user_email, file_url)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_sub) DO UPDATE
            SET file_url = EXCLUDED.file_url,
                user_email = EXCLUDED.user_email,
                uploaded_at = now()
        RETURNING id, user_sub, user_email, file_url, uploaded_at
        "#,
    )
    .bind(user_sub)
    .bind(user_email)
    .bind(file_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn find_resume(pool: &PgPool, user_sub: &str) -> Result<Option<ResumeRow>, AppError> {
    let row = sqlx::query_as::<_, ResumeRow>(
        "SELECT id, user_sub, user_email, file_url, uploaded_at FROM resumes WHERE user_sub = $1",
    )
    .bind(user_sub)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns whether a row was deleted.
pub async fn delete_resume(pool: &PgPool, user_sub: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM resumes WHERE user_sub = $1")
        .bind(user_sub)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
