use sqlx::PgPool;

use crate::models::app::App;

pub async fn find_app_by_client_id(
    pool: &PgPool,
    client_id: &str,
) -> Result<Option<App>, sqlx::Error> {
    sqlx::query_as::<_, App>(
        "SELECT id, tenant_id, name, client_id, client_secret, redirect_uri, is_active, \
         created_at, updated_at FROM apps WHERE client_id = $1",
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await
}
