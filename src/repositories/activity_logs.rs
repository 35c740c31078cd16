use sqlx::PgPool;
use time::PrimitiveDateTime;

pub(crate) struct NewActivityLog<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) participation_id: Option<&'a str>,
    pub(crate) activity_type: &'a str,
    pub(crate) description: &'a str,
    pub(crate) metadata: Option<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert(pool: &PgPool, log: NewActivityLog<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_logs (
            id, user_id, participation_id, activity_type, description, metadata, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(log.id)
    .bind(log.user_id)
    .bind(log.participation_id)
    .bind(log.activity_type)
    .bind(log.description)
    .bind(log.metadata)
    .bind(log.created_at)
    .execute(pool)
    .await?;
    Ok(())
}
