use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{direccion, Direccion},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct DireccionRequest {
    #[validate(length(min = 1, message = "calle is required"))]
    pub calle: String,
    pub colonia: Option<String>,
    #[validate(length(min = 1, message = "ciudad is required"))]
    pub ciudad: String,
    #[validate(length(min = 1, message = "estado is required"))]
    pub estado: String,
    #[validate(length(min = 4, max = 10, message = "codigo_postal must be 4-10 characters"))]
    pub codigo_postal: String,
    #[validate(length(min = 1, message = "pais is required"))]
    pub pais: String,
    pub telefono: Option<String>,
    #[serde(default)]
    pub predeterminada: bool,
}

/// Shipping address management, always scoped to the owning user.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DbPool>,
}

impl AddressService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        usuario_id: i32,
        request: DireccionRequest,
    ) -> Result<direccion::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = direccion::ActiveModel {
            usuario_id: Set(usuario_id),
            calle: Set(request.calle),
            colonia: Set(request.colonia),
            ciudad: Set(request.ciudad),
            estado: Set(request.estado),
            codigo_postal: Set(request.codigo_postal),
            pais: Set(request.pais),
            telefono: Set(request.telefono),
            predeterminada: Set(request.predeterminada),
            creado_en: Set(now),
            actualizado_en: Set(now),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(direccion_id = created.id, usuario_id, "address created");
        Ok(created)
    }

    /// Raw lookup used by checkout validation; ownership is the caller's
    /// concern there.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<direccion::Model>, ServiceError> {
        Ok(Direccion::find_by_id(id).one(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, usuario_id: i32) -> Result<Vec<direccion::Model>, ServiceError> {
        Ok(Direccion::find()
            .filter(direccion::Column::UsuarioId.eq(usuario_id))
            .order_by_asc(direccion::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Fetches an address and checks it belongs to the user.
    #[instrument(skip(self))]
    pub async fn get_owned(
        &self,
        id: i32,
        usuario_id: i32,
    ) -> Result<direccion::Model, ServiceError> {
        let address = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::AddressNotFound(id.to_string()))?;

        if address.usuario_id != usuario_id {
            return Err(ServiceError::AddressUnauthorized(id.to_string()));
        }
        Ok(address)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        usuario_id: i32,
        request: DireccionRequest,
    ) -> Result<direccion::Model, ServiceError> {
        request.validate()?;
        let address = self.get_owned(id, usuario_id).await?;

        let mut active: direccion::ActiveModel = address.into();
        active.calle = Set(request.calle);
        active.colonia = Set(request.colonia);
        active.ciudad = Set(request.ciudad);
        active.estado = Set(request.estado);
        active.codigo_postal = Set(request.codigo_postal);
        active.pais = Set(request.pais);
        active.telefono = Set(request.telefono);
        active.predeterminada = Set(request.predeterminada);
        active.actualizado_en = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, usuario_id: i32) -> Result<(), ServiceError> {
        let address = self.get_owned(id, usuario_id).await?;
        let active: direccion::ActiveModel = address.into();
        active.delete(&*self.db).await?;
        Ok(())
    }
}
