use crate::error::NotificationError;
use crate::models::{Notification, NotificationMetadata, NotificationStatus, NotificationType};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

/// Sea-ORM Entity for the notifications table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_name = "type")]
    pub kind: NotificationType,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub status: NotificationStatus,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// Metadata is re-hydrated using the row's type, which can fail on foreign rows
impl TryFrom<Model> for Notification {
    type Error = NotificationError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            title: model.title,
            message: model.message,
            metadata: NotificationMetadata::from_json(model.kind, model.metadata)?,
            status: model.status,
            read_at: model.read_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

impl TryFrom<&Notification> for ActiveModel {
    type Error = NotificationError;

    fn try_from(n: &Notification) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            id: Set(n.id),
            user_id: Set(n.user_id),
            kind: Set(n.kind),
            title: Set(n.title.clone()),
            message: Set(n.message.clone()),
            metadata: Set(n.metadata.to_json()?),
            status: Set(n.status),
            read_at: Set(n.read_at.map(Into::into)),
            created_at: Set(n.created_at.into()),
            updated_at: Set(n.updated_at.into()),
        })
    }
}
