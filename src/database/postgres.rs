use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    Form, FormDraft, NewProfileLink, NewReport, NewUser, ProfileLink, Subscription,
    SubscriptionDraft, SubscriptionReport, User, UserGroup,
};
use super::store::{AccessStore, FormStore, ProfileLinkStore, ReportStore, SubscriptionStore, UserStore};
use super::{DatabaseError, DatabaseManager};
use crate::auth::UserId;

/// One row per (user, permission) chain; EXISTS collapses duplicate join rows
const HAS_PERMISSION: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM permissions
        JOIN group_permissions ON group_permissions.permission_id = permissions.id
        JOIN grouped_users ON grouped_users.group_id = group_permissions.group_id
        JOIN users ON users.id = grouped_users.user_id
        WHERE permissions.name = $1 AND users.id = $2
    )
"#;

const USER_COLUMNS: &str = "id, nickname, email, password, created_at, updated_at";
const FORM_COLUMNS: &str = "id, type, data, author_id, created_at, updated_at";
const SUBSCRIPTION_COLUMNS: &str = "id, email, data, author_id, created_at, updated_at";
const LINK_COLUMNS: &str = "id, hash, author_id, profile_id, created_at, updated_at";
const REPORT_COLUMNS: &str = "id, path, author_id, profile_id, created_at, updated_at";

/// Store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn deleted(rows: u64, what: &str) -> Result<(), DatabaseError> {
    if rows == 0 {
        return Err(DatabaseError::not_found(what));
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: UserId) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("User Not Found"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("User Not Found"))
    }

    async fn list_users(&self, limit: i64) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id DESC LIMIT $1",
            USER_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (nickname, email, password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.nickname)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn update_user(&self, id: UserId, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET nickname = $2, email = $3, password = $4, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&user.nickname)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_write)?
        .ok_or_else(|| DatabaseError::not_found("User Not Found"))
    }

    async fn delete_user(&self, id: UserId) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected(), "User Not Found")
    }
}

#[async_trait]
impl AccessStore for PgStore {
    async fn user_has_permission(&self, user: UserId, permission: &str) -> Result<bool, DatabaseError> {
        let granted: bool = sqlx::query_scalar(HAS_PERMISSION)
            .bind(permission)
            .bind(user)
            .fetch_one(&self.pool)
            .await?;
        Ok(granted)
    }

    async fn permission_names(&self) -> Result<Vec<String>, DatabaseError> {
        let names = sqlx::query_scalar("SELECT name FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn ensure_permission(&self, name: &str) -> Result<i64, DatabaseError> {
        let id = sqlx::query_scalar(
            "INSERT INTO permissions (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn ensure_group(&self, name: &str, email: &str) -> Result<i64, DatabaseError> {
        let id = sqlx::query_scalar(
            "INSERT INTO user_groups (name, email) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
        )
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_group(&self, name: &str) -> Result<Option<UserGroup>, DatabaseError> {
        let group = sqlx::query_as::<_, UserGroup>("SELECT id, name, email FROM user_groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    async fn grant_permission(&self, group_id: i64, permission_id: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO group_permissions (group_id, permission_id) \
             SELECT $1, $2 WHERE NOT EXISTS ( \
                 SELECT 1 FROM group_permissions WHERE group_id = $1 AND permission_id = $2)",
        )
        .bind(group_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_user_to_group(&self, user: UserId, group_id: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO grouped_users (user_id, group_id) \
             SELECT $1, $2 WHERE NOT EXISTS ( \
                 SELECT 1 FROM grouped_users WHERE user_id = $1 AND group_id = $2)",
        )
        .bind(user)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[async_trait]
impl FormStore for PgStore {
    async fn find_form(&self, id: i64) -> Result<Form, DatabaseError> {
        sqlx::query_as::<_, Form>(&format!("SELECT {} FROM forms WHERE id = $1", FORM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Form Not Found"))
    }

    async fn list_forms(&self, limit: i64) -> Result<Vec<Form>, DatabaseError> {
        let forms = sqlx::query_as::<_, Form>(&format!(
            "SELECT {} FROM forms ORDER BY id DESC LIMIT $1",
            FORM_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(forms)
    }

    async fn create_form(&self, draft: FormDraft) -> Result<Form, DatabaseError> {
        sqlx::query_as::<_, Form>(&format!(
            "INSERT INTO forms (type, data, author_id) VALUES ($1, $2, $3) RETURNING {}",
            FORM_COLUMNS
        ))
        .bind(&draft.form_type)
        .bind(&draft.data)
        .bind(draft.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn update_form(&self, id: i64, draft: FormDraft) -> Result<Form, DatabaseError> {
        sqlx::query_as::<_, Form>(&format!(
            "UPDATE forms SET type = $2, data = $3, updated_at = now() WHERE id = $1 RETURNING {}",
            FORM_COLUMNS
        ))
        .bind(id)
        .bind(&draft.form_type)
        .bind(&draft.data)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Form Not Found"))
    }

    async fn delete_form(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected(), "Form Not Found")
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn find_subscription(&self, id: i64) -> Result<Subscription, DatabaseError> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subscription Not Found"))
    }

    async fn list_subscriptions(&self, limit: i64) -> Result<Vec<Subscription>, DatabaseError> {
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions ORDER BY id DESC LIMIT $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_subscription(
        &self,
        draft: SubscriptionDraft,
        link_hash: String,
    ) -> Result<(Subscription, ProfileLink), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "INSERT INTO subscriptions (email, data, author_id) VALUES ($1, $2, $3) RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(&draft.email)
        .bind(&draft.data)
        .bind(draft.author_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_write)?;

        let link = sqlx::query_as::<_, ProfileLink>(&format!(
            "INSERT INTO profile_links (hash, author_id, profile_id) VALUES ($1, $2, $3) RETURNING {}",
            LINK_COLUMNS
        ))
        .bind(&link_hash)
        .bind(subscription.author_id)
        .bind(subscription.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_write)?;

        tx.commit().await?;
        Ok((subscription, link))
    }

    async fn update_subscription(
        &self,
        id: i64,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, DatabaseError> {
        sqlx::query_as::<_, Subscription>(&format!(
            "UPDATE subscriptions SET email = $2, data = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .bind(&draft.email)
        .bind(&draft.data)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subscription Not Found"))
    }

    async fn delete_subscription(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected(), "Subscription Not Found")
    }
}

#[async_trait]
impl ProfileLinkStore for PgStore {
    async fn find_link(&self, id: i64) -> Result<ProfileLink, DatabaseError> {
        sqlx::query_as::<_, ProfileLink>(&format!("SELECT {} FROM profile_links WHERE id = $1", LINK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Profile Link Not Found"))
    }

    async fn find_link_by_hash(&self, hash: &str) -> Result<ProfileLink, DatabaseError> {
        sqlx::query_as::<_, ProfileLink>(&format!("SELECT {} FROM profile_links WHERE hash = $1", LINK_COLUMNS))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Profile Link Not Found"))
    }

    async fn list_links(&self, limit: i64) -> Result<Vec<ProfileLink>, DatabaseError> {
        let rows = sqlx::query_as::<_, ProfileLink>(&format!(
            "SELECT {} FROM profile_links ORDER BY id DESC LIMIT $1",
            LINK_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_link(&self, link: NewProfileLink) -> Result<ProfileLink, DatabaseError> {
        sqlx::query_as::<_, ProfileLink>(&format!(
            "INSERT INTO profile_links (hash, author_id, profile_id) VALUES ($1, $2, $3) RETURNING {}",
            LINK_COLUMNS
        ))
        .bind(&link.hash)
        .bind(link.author_id)
        .bind(link.profile_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn delete_link(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM profile_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected(), "Profile Link Not Found")
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn find_report(&self, id: i64) -> Result<SubscriptionReport, DatabaseError> {
        sqlx::query_as::<_, SubscriptionReport>(&format!(
            "SELECT {} FROM subscription_reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subscription Report Not Found"))
    }

    async fn find_report_by_path(&self, path: &str) -> Result<SubscriptionReport, DatabaseError> {
        sqlx::query_as::<_, SubscriptionReport>(&format!(
            "SELECT {} FROM subscription_reports WHERE path = $1 ORDER BY id DESC LIMIT 1",
            REPORT_COLUMNS
        ))
        .bind(path)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subscription Report Not Found"))
    }

    async fn list_reports(&self, limit: i64) -> Result<Vec<SubscriptionReport>, DatabaseError> {
        let rows = sqlx::query_as::<_, SubscriptionReport>(&format!(
            "SELECT {} FROM subscription_reports ORDER BY id DESC LIMIT $1",
            REPORT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_report(&self, report: NewReport) -> Result<SubscriptionReport, DatabaseError> {
        sqlx::query_as::<_, SubscriptionReport>(&format!(
            "INSERT INTO subscription_reports (path, author_id, profile_id) VALUES ($1, $2, $3) RETURNING {}",
            REPORT_COLUMNS
        ))
        .bind(&report.path)
        .bind(report.author_id)
        .bind(report.profile_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn delete_report(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM subscription_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected(), "Subscription Report Not Found")
    }
}
