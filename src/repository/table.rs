//! Table handlers for opportunities and subscribers.

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::QueryBuilder;
use sqlx::Row;
use sqlx::Sqlite;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteArguments;
use sqlx::sqlite::SqliteRow;

use crate::entity::Category;
use crate::entity::DeadlineQuery;
use crate::entity::InvalidSubscriber;
use crate::entity::NotificationMethod;
use crate::entity::OpportunityModel;
use crate::entity::SubscriberModel;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Schema-level operations shared by every table. The schema itself is owned by `migrations/`.
#[async_trait::async_trait]
pub trait TableBase {
    async fn drop_table(&self) -> Result<(), DatabaseError>;
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Row-level CRUD keyed by `ID`.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    async fn update(&self, model: &T) -> Result<(), DatabaseError>;
    async fn delete(&self, id: &ID) -> Result<(), DatabaseError>;
    async fn replace(&self, model: &T) -> Result<ID, DatabaseError>;
}

/// Lets the table macro bind model fields to both `query` and `query_as`.
pub trait BindParam<'q> {
    fn bind_param<O>(
        self,
        query: sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>;
    fn bind_param_q(
        self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;
}

macro_rules! impl_bind_param {
    ($t:ty) => {
        impl<'q> BindParam<'q> for $t {
            fn bind_param<O>(
                self,
                query: sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
            ) -> sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
                query.bind(self)
            }
            fn bind_param_q(
                self,
                query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
            ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
                query.bind(self)
            }
        }
    };
}

impl_bind_param!(&'q i32);
impl_bind_param!(&'q u32);
impl_bind_param!(&'q bool);
impl_bind_param!(&'q String);
impl_bind_param!(&'q Option<String>);
impl_bind_param!(&'q NaiveDate);
impl_bind_param!(&'q NaiveTime);
impl_bind_param!(&'q DateTime<Utc>);
impl_bind_param!(&'q Category);
impl_bind_param!(&'q NotificationMethod);

macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:expr,
        $pk:ident,
        $id_type:ty,
        $cols:expr,
        $vals:expr,
        $update_set:expr,
        [ $( $field:ident ),+ ]
    ) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn drop_table(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DROP TABLE IF EXISTS ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }

            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table))
                    .fetch_all(&self.base.pool)
                    .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                let query = sqlx::query_as::<_, $model>(concat!(
                    "SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"
                ));
                let query = BindParam::bind_param(id, query);
                Ok(query.fetch_optional(&self.base.pool).await?)
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as(concat!(
                    "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                ));
                $(
                    query = BindParam::bind_param(&model.$field, query);
                )+
                let row: ($id_type,) = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }

            async fn update(&self, model: &$model) -> Result<(), DatabaseError> {
                let mut query = sqlx::query(concat!(
                    "UPDATE ", $table, " SET ", $update_set, " WHERE ", stringify!($pk), " = ?"
                ));
                $(
                    query = BindParam::bind_param_q(&model.$field, query);
                )+
                query = BindParam::bind_param_q(&model.$pk, query);
                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn delete(&self, id: &$id_type) -> Result<(), DatabaseError> {
                let query = sqlx::query(concat!(
                    "DELETE FROM ", $table, " WHERE ", stringify!($pk), " = ?"
                ));
                let query = BindParam::bind_param_q(id, query);
                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn replace(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as(concat!(
                    "REPLACE INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                ));
                $(
                    query = BindParam::bind_param(&model.$field, query);
                )+
                let row: ($id_type,) = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }
        }
    };
}

// ============================================================================
// OpportunityTable
// ============================================================================

impl_table!(
    OpportunityTable,
    OpportunityModel,
    "opportunities",
    id,
    i32,
    "title, deadline, category, notes, posted_by, created_at, updated_at",
    "?, ?, ?, ?, ?, ?, ?",
    "title = ?, deadline = ?, category = ?, notes = ?, posted_by = ?, created_at = ?, updated_at = ?",
    [title, deadline, category, notes, posted_by, created_at, updated_at]
);

impl OpportunityTable {
    /// Opportunities with a deadline in `[from, until]` whose category is in the query,
    /// ordered by deadline then id.
    pub async fn select_by_deadline_query(
        &self,
        query: &DeadlineQuery,
    ) -> Result<Vec<OpportunityModel>, DatabaseError> {
        if query.categories.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM opportunities WHERE deadline >= ");
        builder
            .push_bind(query.from)
            .push(" AND deadline <= ")
            .push_bind(query.until)
            .push(" AND category IN (");

        let mut categories = builder.separated(", ");
        for category in &query.categories {
            categories.push_bind(category.clone());
        }
        categories.push_unseparated(") ORDER BY deadline ASC, id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        Ok(builder
            .build_query_as::<OpportunityModel>()
            .fetch_all(&self.base.pool)
            .await?)
    }
}

// ============================================================================
// SubscriberTable
// ============================================================================

impl_table!(
    SubscriberTable,
    SubscriberModel,
    "subscribers",
    id,
    i32,
    "username, email, enable_notifications, notification_method, chat_account_id, alert_time, alert_days_ahead, alert_types",
    "?, ?, ?, ?, ?, ?, ?, ?",
    "username = ?, email = ?, enable_notifications = ?, notification_method = ?, chat_account_id = ?, alert_time = ?, alert_days_ahead = ?, alert_types = ?",
    [
        username,
        email,
        enable_notifications,
        notification_method,
        chat_account_id,
        alert_time,
        alert_days_ahead,
        alert_types
    ]
);

impl SubscriberTable {
    /// Subscribers with notifications enabled whose alert time falls in `hour`.
    ///
    /// Rows are decoded one by one; a row that cannot be read comes back as an
    /// [`InvalidSubscriber`] instead of failing the whole hour.
    pub async fn select_enabled_by_alert_hour(
        &self,
        hour: u32,
    ) -> Result<Vec<Result<SubscriberModel, InvalidSubscriber>>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM subscribers
            WHERE enable_notifications = 1
                AND CAST(substr(alert_time, 1, 2) AS INTEGER) = ?
            ORDER BY username
            "#,
        )
        .bind(hour)
        .fetch_all(&self.base.pool)
        .await?;

        Ok(rows.iter().map(decode_subscriber).collect())
    }

    pub async fn select_by_username(
        &self,
        username: &str,
    ) -> Result<Option<SubscriberModel>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, SubscriberModel>("SELECT * FROM subscribers WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(&self.base.pool)
                .await?,
        )
    }
}

fn decode_subscriber(row: &SqliteRow) -> Result<SubscriberModel, InvalidSubscriber> {
    SubscriberModel::from_row(row).map_err(|e| InvalidSubscriber {
        username: row
            .try_get::<String, _>("username")
            .unwrap_or_else(|_| format!("#{}", row.try_get::<i32, _>("id").unwrap_or_default())),
        reason: e.to_string(),
    })
}
