use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{NotificationError, NotificationResult},
    models::Notification,
    repository::{NotificationRepository, ensure_id, ensure_user_id},
};

/// Postgres-backed repository. Status changes are conditional updates so two
/// concurrent writers can never move a record out of a terminal state.
#[derive(Clone)]
pub struct PgNotificationRepository {
    db: DatabaseConnection,
}

impl PgNotificationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> NotificationResult<Option<entity::Model>> {
        Ok(entity::Entity::find_by_id(id).one(&self.db).await?)
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: Notification) -> NotificationResult<Notification> {
        ensure_id(notification.id)?;
        ensure_user_id(notification.user_id)?;

        let active_model = entity::ActiveModel::try_from(&notification)?;
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(notification_id = %model.id, user_id = %model.user_id, "Created notification");
        model.try_into()
    }

    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Notification> {
        ensure_id(id)?;
        self.find_model(id)
            .await?
            .ok_or(NotificationError::NotFound(id))?
            .try_into()
    }

    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> NotificationResult<Vec<Notification>> {
        ensure_user_id(user_id)?;

        let models = entity::Entity::find()
            .filter(entity::Column::UserId.eq(user_id))
            .order_by_desc(entity::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        models.into_iter().map(Notification::try_from).collect()
    }

    async fn update(&self, notification: &Notification) -> NotificationResult<Notification> {
        ensure_id(notification.id)?;

        let predecessors: Vec<String> = notification
            .status
            .allowed_predecessors()
            .iter()
            .map(ActiveEnum::to_value)
            .collect();

        let result = entity::Entity::update_many()
            .col_expr(entity::Column::Status, Expr::value(notification.status.to_value()))
            .col_expr(entity::Column::Metadata, Expr::value(notification.metadata.to_json()?))
            .col_expr(entity::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(entity::Column::Id.eq(notification.id))
            .filter(entity::Column::Status.is_in(predecessors))
            .exec(&self.db)
            .await?;

        let model = self
            .find_model(notification.id)
            .await?
            .ok_or(NotificationError::NotFound(notification.id))?;

        if result.rows_affected == 0 {
            return Err(NotificationError::InvalidStatusTransition {
                from: model.status,
                to: notification.status,
            });
        }

        tracing::debug!(notification_id = %notification.id, status = %notification.status, "Updated notification");
        model.try_into()
    }

    async fn mark_as_read(&self, id: Uuid) -> NotificationResult<()> {
        ensure_id(id)?;

        let now = Utc::now().fixed_offset();
        let result = entity::Entity::update_many()
            .col_expr(entity::Column::ReadAt, Expr::value(now))
            .col_expr(entity::Column::UpdatedAt, Expr::value(now))
            .filter(entity::Column::Id.eq(id))
            .filter(entity::Column::ReadAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }

    async fn count_unread_by_user_id(&self, user_id: Uuid) -> NotificationResult<u64> {
        ensure_user_id(user_id)?;

        Ok(entity::Entity::find()
            .filter(entity::Column::UserId.eq(user_id))
            .filter(entity::Column::ReadAt.is_null())
            .count(&self.db)
            .await?)
    }
}
