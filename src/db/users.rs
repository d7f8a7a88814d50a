use serde::Deserialize;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{like_pattern, PageRequest, Paged};
use crate::errors::StoreResult;
use crate::models::{Language, User};

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, phone_number, \
                            language, is_active, created_at, updated_at";

/// Fields needed to register a user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub language: Language,
}

/// Partial update of a user; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserChanges {
    pub telegram_id: Option<i64>,
    pub first_name: Option<String>,
    pub phone_number: Option<String>,
    pub language: Option<Language>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn get_user_by_id(pool: &PgPool, user_id: i64) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_telegram_id(pool: &PgPool, telegram_id: i64) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Insert a new user; fails on a duplicate Telegram id
pub async fn create_user(pool: &PgPool, new_user: &NewUser) -> StoreResult<User> {
    info!(telegram_id = new_user.telegram_id, "Creating user");

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (telegram_id, username, first_name, last_name, phone_number, language)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.telegram_id)
    .bind(&new_user.username)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.phone_number)
    .bind(new_user.language.code())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Create the user, or refresh name, language and phone if the Telegram id
/// is already known
pub async fn register_user(pool: &PgPool, new_user: &NewUser) -> StoreResult<User> {
    info!(telegram_id = new_user.telegram_id, "Registering user");

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (telegram_id, username, first_name, last_name, phone_number, language)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (telegram_id) DO UPDATE
         SET first_name = EXCLUDED.first_name,
             language = EXCLUDED.language,
             phone_number = EXCLUDED.phone_number,
             updated_at = NOW()
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.telegram_id)
    .bind(&new_user.username)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.phone_number)
    .bind(new_user.language.code())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn update_user(
    pool: &PgPool,
    user_id: i64,
    changes: &UserChanges,
) -> StoreResult<Option<User>> {
    debug!(user_id, ?changes, "Updating user");

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users
         SET telegram_id = COALESCE($2, telegram_id),
             first_name = COALESCE($3, first_name),
             phone_number = COALESCE($4, phone_number),
             language = COALESCE($5, language),
             is_active = COALESCE($6, is_active),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(changes.telegram_id)
    .bind(&changes.first_name)
    .bind(&changes.phone_number)
    .bind(changes.language.map(Language::code))
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn set_user_language(
    pool: &PgPool,
    user_id: i64,
    language: Language,
) -> StoreResult<Option<User>> {
    let changes = UserChanges {
        language: Some(language),
        ..Default::default()
    };
    update_user(pool, user_id, &changes).await
}

pub async fn set_user_phone(
    pool: &PgPool,
    user_id: i64,
    phone_number: &str,
) -> StoreResult<Option<User>> {
    let changes = UserChanges {
        phone_number: Some(phone_number.to_string()),
        ..Default::default()
    };
    update_user(pool, user_id, &changes).await
}

pub async fn set_user_name(
    pool: &PgPool,
    user_id: i64,
    first_name: &str,
) -> StoreResult<Option<User>> {
    let changes = UserChanges {
        first_name: Some(first_name.to_string()),
        ..Default::default()
    };
    update_user(pool, user_id, &changes).await
}

/// Flip the active flag (block/unblock)
pub async fn toggle_user_active(pool: &PgPool, user_id: i64) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = NOT is_active, updated_at = NOW()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(ref user) = user {
        info!(user_id, is_active = user.is_active, "Toggled user active flag");
    }
    Ok(user)
}

pub async fn delete_user(pool: &PgPool, user_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR CAST(telegram_id AS TEXT) ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_users(
    pool: &PgPool,
    filter: &UserFilter,
    page: PageRequest,
) -> StoreResult<Paged<User>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_user_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
    push_user_filters(&mut select, filter);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<User>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}
