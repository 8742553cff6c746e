use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    auth::AuthService,
    db::DbPool,
    entities::{
        usuario::{self, Rol},
        Usuario,
    },
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegistroRequest {
    #[validate(length(min = 1, message = "nombre is required"))]
    pub nombre: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub telefono: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: usuario::Model,
}

/// Account management: registration, login, admin listing.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Self-service registration always produces a customer account; staff
    /// accounts are provisioned by an admin.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(
        &self,
        request: RegistroRequest,
        rol: Rol,
    ) -> Result<usuario::Model, ServiceError> {
        request.validate()?;

        let existing = Usuario::find()
            .filter(usuario::Column::Email.eq(request.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an account with email {} already exists",
                request.email
            )));
        }

        let now = Utc::now();
        let model = usuario::ActiveModel {
            nombre: Set(request.nombre),
            email: Set(request.email),
            password_hash: Set(self.auth.hash_password(&request.password)?),
            rol: Set(rol),
            telefono: Set(request.telefono),
            creado_en: Set(now),
            actualizado_en: Set(now),
            ..Default::default()
        };

        let user = model.insert(&*self.db).await?;
        info!(usuario_id = user.id, "account registered");
        Ok(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;

        let user = Usuario::find()
            .filter(usuario::Column::Email.eq(request.email.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".into()))?;

        if !self.auth.verify_password(&request.password, &user.password_hash)? {
            warn!(usuario_id = user.id, "failed login attempt");
            return Err(ServiceError::Unauthorized("invalid credentials".into()));
        }

        let token = self.auth.issue_token(&user)?;
        Ok(LoginResponse {
            token,
            usuario: user,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<usuario::Model>, ServiceError> {
        Ok(Usuario::find_by_id(id).one(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<usuario::Model>, ServiceError> {
        Ok(Usuario::find()
            .order_by_asc(usuario::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let res = Usuario::delete_by_id(id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::UserNotFound(id.to_string()));
        }
        Ok(())
    }
}
