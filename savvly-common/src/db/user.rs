use async_trait::async_trait;
use chrono::Utc;
use diesel::result::DatabaseErrorKind;
use diesel::{dsl, ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{DaoError, PgStore, UserStore};
use crate::models::user::{NewUser, User};

use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DaoError> {
        let email_lowercase = email.to_lowercase();

        let new_user = NewUser {
            id: Uuid::now_v7(),
            name,
            email: &email_lowercase,
            password_hash,
            created_timestamp: Utc::now(),
        };

        let mut conn = self.db_async_pool.get().await?;

        match dsl::insert_into(users)
            .values(&new_user)
            .get_result::<User>(&mut conn)
            .await
        {
            Ok(user) => Ok(user),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(DaoError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users.find(user_id).first::<User>(&mut conn).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users
            .filter(user_fields::email.eq(email.to_lowercase()))
            .first::<User>(&mut conn)
            .await?)
    }
}
