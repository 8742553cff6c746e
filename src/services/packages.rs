use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{paquete, Paquete},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct PaqueteRequest {
    #[validate(length(min = 1, message = "nombre is required"))]
    pub nombre: String,
    pub categoria: Option<String>,
    pub precio: Decimal,
    #[validate(range(min = 1, message = "cantidad_fotos must be positive"))]
    pub cantidad_fotos: i32,
    #[serde(default = "default_activo")]
    pub activo: bool,
}

fn default_activo() -> bool {
    true
}

/// Print package catalog. `find_by_id` is the lookup checkout validates
/// client-claimed prices and photo counts against.
#[derive(Clone)]
pub struct PackageService {
    db: Arc<DbPool>,
}

impl PackageService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<paquete::Model>, ServiceError> {
        Ok(Paquete::find_by_id(id).one(&*self.db).await?)
    }

    /// Active packages only; the storefront listing.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<paquete::Model>, ServiceError> {
        Ok(Paquete::find()
            .filter(paquete::Column::Activo.eq(true))
            .order_by_asc(paquete::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<paquete::Model>, ServiceError> {
        Ok(Paquete::find()
            .order_by_asc(paquete::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, request: PaqueteRequest) -> Result<paquete::Model, ServiceError> {
        request.validate()?;
        if request.precio <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "precio must be positive".into(),
            ));
        }

        let now = Utc::now();
        let model = paquete::ActiveModel {
            nombre: Set(request.nombre),
            categoria: Set(request.categoria),
            precio: Set(request.precio),
            cantidad_fotos: Set(request.cantidad_fotos),
            activo: Set(request.activo),
            creado_en: Set(now),
            actualizado_en: Set(now),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(paquete_id = created.id, "package created");
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: PaqueteRequest,
    ) -> Result<paquete::Model, ServiceError> {
        request.validate()?;
        if request.precio <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "precio must be positive".into(),
            ));
        }

        let package = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::PackageNotFound(id.to_string()))?;

        let mut active: paquete::ActiveModel = package.into();
        active.nombre = Set(request.nombre);
        active.categoria = Set(request.categoria);
        active.precio = Set(request.precio);
        active.cantidad_fotos = Set(request.cantidad_fotos);
        active.activo = Set(request.activo);
        active.actualizado_en = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let res = Paquete::delete_by_id(id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::PackageNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::in_memory_db;
    use rust_decimal_macros::dec;

    fn request(nombre: &str, activo: bool) -> PaqueteRequest {
        PaqueteRequest {
            nombre: nombre.into(),
            categoria: Some("Impresión".into()),
            precio: dec!(299.99),
            cantidad_fotos: 10,
            activo,
        }
    }

    #[tokio::test]
    async fn listing_filters_inactive_packages() {
        let db = in_memory_db().await;
        let service = PackageService::new(db);

        service.create(request("Básico", true)).await.unwrap();
        service.create(request("Retirado", false)).await.unwrap();

        let active = service.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].nombre, "Básico");

        assert_eq!(service.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_positive_price_is_rejected() {
        let db = in_memory_db().await;
        let service = PackageService::new(db);

        let mut bad = request("Gratis", true);
        bad.precio = dec!(0);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
