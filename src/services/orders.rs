use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    db::DbPool,
    entities::{
        pedido::{self, EstadoPago, EstadoPedido},
        pedido_item, Pedido, PedidoItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stripe::CheckoutLineItem,
};

/// Input for creating an order from a reconciled checkout session.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub usuario_id: Option<i32>,
    pub direccion_id: Option<i32>,
    pub id_pago_stripe: Option<String>,
    pub id_sesion_stripe: Option<String>,
    pub nombre_cliente: String,
    pub email_cliente: String,
    pub telefono_cliente: Option<String>,
    pub items: Vec<CheckoutLineItem>,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub estado_pago: EstadoPago,
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct PedidoResponse {
    #[serde(flatten)]
    pub pedido: pedido::Model,
    pub items_pedido: Vec<pedido_item::Model>,
}

#[derive(Debug, Serialize)]
pub struct PedidoListResponse {
    pub pedidos: Vec<PedidoResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order with all its line items in one transaction: either
    /// the full order exists afterwards, or none of it does.
    ///
    /// A unique-constraint violation on the session id column is surfaced as
    /// `Conflict` so the caller can treat a concurrent duplicate as already
    /// reconciled.
    #[instrument(skip(self, input), fields(session_id = input.id_sesion_stripe.as_deref().unwrap_or("-")))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<PedidoResponse, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "an order needs at least one item".into(),
            ));
        }

        let now = Utc::now();
        let session_id = input.id_sesion_stripe.clone();

        let txn = self.db.begin().await?;

        let pedido_model = pedido::ActiveModel {
            usuario_id: Set(input.usuario_id),
            direccion_id: Set(input.direccion_id),
            id_pago_stripe: Set(input.id_pago_stripe),
            id_sesion_stripe: Set(input.id_sesion_stripe),
            nombre_cliente: Set(input.nombre_cliente),
            email_cliente: Set(input.email_cliente),
            telefono_cliente: Set(input.telefono_cliente),
            fecha_pedido: Set(now),
            estado: Set(EstadoPedido::Pendiente),
            estado_pago: Set(input.estado_pago),
            subtotal: Set(input.subtotal),
            iva: Set(input.iva),
            total: Set(input.total),
            imagenes: Set(None),
            creado_en: Set(now),
            actualizado_en: Set(now),
            ..Default::default()
        };

        let pedido = pedido_model.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                warn!("duplicate order insert rejected by unique session index");
                ServiceError::Conflict("an order for this checkout session already exists".into())
            } else {
                error!(error = %e, "failed to insert order");
                ServiceError::DatabaseError(e)
            }
        })?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let item_model = pedido_item::ActiveModel {
                pedido_id: Set(pedido.id),
                paquete_id: Set(item.id_paquete),
                nombre_paquete: Set(item.nombre_paquete.clone()),
                categoria_paquete: Set(item.categoria_paquete.clone()),
                precio_unitario: Set(item.precio_unitario),
                cantidad: Set(item.cantidad),
                num_fotos_requeridas: Set(item.num_fotos_requeridas),
                ..Default::default()
            };
            items.push(item_model.insert(&txn).await?);
        }

        txn.commit().await?;

        info!(pedido_id = pedido.id, "order created");
        self.event_sender
            .send(Event::OrderCreated {
                pedido_id: pedido.id,
                session_id: session_id.unwrap_or_default(),
            })
            .await;

        Ok(PedidoResponse {
            pedido,
            items_pedido: items,
        })
    }

    /// Direct indexed lookup by checkout session id.
    #[instrument(skip(self))]
    pub async fn find_by_stripe_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<PedidoResponse>, ServiceError> {
        let found = Pedido::find()
            .filter(pedido::Column::IdSesionStripe.eq(session_id))
            .one(&*self.db)
            .await?;

        match found {
            Some(p) => Ok(Some(self.with_items(p).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i32) -> Result<PedidoResponse, ServiceError> {
        let pedido = Pedido::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.to_string()))?;

        self.with_items(pedido).await
    }

    /// Lists orders, newest first, with pagination.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<PedidoListResponse, ServiceError> {
        let paginator = Pedido::find()
            .order_by_desc(pedido::Column::FechaPedido)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let pedidos = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut out = Vec::with_capacity(pedidos.len());
        for p in pedidos {
            out.push(self.with_items(p).await?);
        }

        Ok(PedidoListResponse {
            pedidos: out,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_user_id(&self, usuario_id: i32) -> Result<Vec<PedidoResponse>, ServiceError> {
        let pedidos = Pedido::find()
            .filter(pedido::Column::UsuarioId.eq(usuario_id))
            .order_by_desc(pedido::Column::FechaPedido)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(pedidos.len());
        for p in pedidos {
            out.push(self.with_items(p).await?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn find_by_estado(
        &self,
        estado: EstadoPedido,
    ) -> Result<Vec<PedidoResponse>, ServiceError> {
        let pedidos = Pedido::find()
            .filter(pedido::Column::Estado.eq(estado))
            .order_by_desc(pedido::Column::FechaPedido)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(pedidos.len());
        for p in pedidos {
            out.push(self.with_items(p).await?);
        }
        Ok(out)
    }

    /// Sets the fulfillment state. Any named state is accepted; staff drive
    /// the progression.
    #[instrument(skip(self))]
    pub async fn update_estado(
        &self,
        id: i32,
        nuevo_estado: EstadoPedido,
    ) -> Result<PedidoResponse, ServiceError> {
        let pedido = Pedido::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.to_string()))?;

        let old_estado = pedido.estado;

        let mut active: pedido::ActiveModel = pedido.into();
        active.estado = Set(nuevo_estado);
        active.actualizado_en = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(
            pedido_id = id,
            old = old_estado.as_str(),
            new = nuevo_estado.as_str(),
            "order status updated"
        );
        self.event_sender
            .send(Event::OrderStatusChanged {
                pedido_id: id,
                old_estado: old_estado.as_str().to_string(),
                new_estado: nuevo_estado.as_str().to_string(),
            })
            .await;

        self.with_items(updated).await
    }

    async fn with_items(&self, pedido: pedido::Model) -> Result<PedidoResponse, ServiceError> {
        let items = PedidoItem::find()
            .filter(pedido_item::Column::PedidoId.eq(pedido.id))
            .all(&*self.db)
            .await?;

        Ok(PedidoResponse {
            pedido,
            items_pedido: items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{in_memory_db, test_event_sender};
    use rust_decimal_macros::dec;

    fn sample_input(session: &str) -> CreateOrderInput {
        CreateOrderInput {
            usuario_id: Some(1),
            direccion_id: Some(1),
            id_pago_stripe: Some("pi_test_1".into()),
            id_sesion_stripe: Some(session.into()),
            nombre_cliente: "Ana Torres".into(),
            email_cliente: "ana@example.com".into(),
            telefono_cliente: None,
            items: vec![CheckoutLineItem {
                id_paquete: 1,
                nombre_paquete: "Paquete Premium".into(),
                categoria_paquete: None,
                precio_unitario: dec!(299.99),
                cantidad: 2,
                num_fotos_requeridas: 20,
            }],
            subtotal: dec!(599.98),
            iva: dec!(96.00),
            total: dec!(695.98),
            estado_pago: EstadoPago::Pagado,
        }
    }

    #[tokio::test]
    async fn create_order_persists_order_with_items() {
        let db = in_memory_db().await;
        let service = OrderService::new(db, test_event_sender());

        let created = service.create_order(sample_input("cs_test_1")).await.unwrap();
        assert_eq!(created.pedido.estado, EstadoPedido::Pendiente);
        assert_eq!(created.pedido.estado_pago, EstadoPago::Pagado);
        assert_eq!(created.items_pedido.len(), 1);
        assert_eq!(created.items_pedido[0].cantidad, 2);

        let fetched = service.get_order(created.pedido.id).await.unwrap();
        assert_eq!(fetched.pedido.id_sesion_stripe.as_deref(), Some("cs_test_1"));
    }

    #[tokio::test]
    async fn duplicate_session_id_is_a_conflict() {
        let db = in_memory_db().await;
        let service = OrderService::new(db, test_event_sender());

        service.create_order(sample_input("cs_test_dup")).await.unwrap();
        let err = service
            .create_order(sample_input("cs_test_dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn orders_without_items_are_rejected() {
        let db = in_memory_db().await;
        let service = OrderService::new(db, test_event_sender());

        let mut input = sample_input("cs_test_2");
        input.items.clear();
        let err = service.create_order(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn session_lookup_finds_the_order() {
        let db = in_memory_db().await;
        let service = OrderService::new(db, test_event_sender());

        assert!(service
            .find_by_stripe_session_id("cs_missing")
            .await
            .unwrap()
            .is_none());

        service.create_order(sample_input("cs_test_3")).await.unwrap();
        let found = service
            .find_by_stripe_session_id("cs_test_3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.items_pedido.len(), 1);
    }

    #[tokio::test]
    async fn estado_update_accepts_any_named_state() {
        let db = in_memory_db().await;
        let service = OrderService::new(db, test_event_sender());

        let created = service.create_order(sample_input("cs_test_4")).await.unwrap();
        let updated = service
            .update_estado(created.pedido.id, EstadoPedido::EnReparto)
            .await
            .unwrap();
        assert_eq!(updated.pedido.estado, EstadoPedido::EnReparto);

        // Backwards movement is allowed too; staff drive the progression.
        let updated = service
            .update_estado(created.pedido.id, EstadoPedido::Imprimiendo)
            .await
            .unwrap();
        assert_eq!(updated.pedido.estado, EstadoPedido::Imprimiendo);
    }
}
