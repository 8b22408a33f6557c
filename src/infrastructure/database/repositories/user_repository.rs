//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::domain::{DomainError, DomainResult, User, UserRepository};
use crate::infrastructure::database::entities::user;

use super::db_err;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn user_from_model(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        id_token: model.id_token,
        is_active: model.is_active,
        token_expiry: model.token_expiry,
        created_at: model.created_at,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, u: User) -> DomainResult<()> {
        let exists = user::Entity::find()
            .filter(user::Column::IdToken.eq(u.id_token.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();
        if exists {
            return Err(DomainError::UserAlreadyExists(u.id_token));
        }

        let active = user::ActiveModel {
            id: Set(u.id),
            username: Set(u.username),
            id_token: Set(u.id_token),
            is_active: Set(u.is_active),
            token_expiry: Set(u.token_expiry),
            created_at: Set(u.created_at),
        };
        active.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_token(&self, id_token: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::IdToken.eq(id_token))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(user_from_model).collect())
    }
}
