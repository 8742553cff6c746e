use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fulfillment state of an order. Transitions are driven by store/admin
/// staff; no transition table is enforced, any named state may be set.
/// Orders always start in `Pendiente`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum EstadoPedido {
    #[sea_orm(string_value = "Pendiente")]
    #[serde(rename = "Pendiente")]
    Pendiente,
    #[sea_orm(string_value = "Enviado")]
    #[serde(rename = "Enviado")]
    Enviado,
    #[sea_orm(string_value = "Imprimiendo")]
    #[serde(rename = "Imprimiendo")]
    Imprimiendo,
    #[sea_orm(string_value = "Empaquetado")]
    #[serde(rename = "Empaquetado")]
    Empaquetado,
    #[sea_orm(string_value = "En reparto")]
    #[serde(rename = "En reparto")]
    EnReparto,
    #[sea_orm(string_value = "Entregado")]
    #[serde(rename = "Entregado")]
    Entregado,
    #[sea_orm(string_value = "Archivado")]
    #[serde(rename = "Archivado")]
    Archivado,
}

impl EstadoPedido {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoPedido::Pendiente => "Pendiente",
            EstadoPedido::Enviado => "Enviado",
            EstadoPedido::Imprimiendo => "Imprimiendo",
            EstadoPedido::Empaquetado => "Empaquetado",
            EstadoPedido::EnReparto => "En reparto",
            EstadoPedido::Entregado => "Entregado",
            EstadoPedido::Archivado => "Archivado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pendiente" => Some(EstadoPedido::Pendiente),
            "Enviado" => Some(EstadoPedido::Enviado),
            "Imprimiendo" => Some(EstadoPedido::Imprimiendo),
            "Empaquetado" => Some(EstadoPedido::Empaquetado),
            "En reparto" => Some(EstadoPedido::EnReparto),
            "Entregado" => Some(EstadoPedido::Entregado),
            "Archivado" => Some(EstadoPedido::Archivado),
            _ => None,
        }
    }
}

/// Payment state as reported by the payment provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum EstadoPago {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pendiente,
    #[sea_orm(string_value = "paid")]
    #[serde(rename = "paid")]
    Pagado,
    #[sea_orm(string_value = "failed")]
    #[serde(rename = "failed")]
    Fallido,
    #[sea_orm(string_value = "refunded")]
    #[serde(rename = "refunded")]
    Reembolsado,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pedidos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(nullable)]
    pub usuario_id: Option<i32>,
    #[sea_orm(nullable)]
    pub direccion_id: Option<i32>,
    #[sea_orm(nullable)]
    pub id_pago_stripe: Option<String>,
    /// Checkout session that produced this order. Unique at the storage
    /// layer: the second insert for the same session is rejected.
    #[sea_orm(nullable, unique)]
    pub id_sesion_stripe: Option<String>,
    pub nombre_cliente: String,
    pub email_cliente: String,
    #[sea_orm(nullable)]
    pub telefono_cliente: Option<String>,
    pub fecha_pedido: DateTime<Utc>,
    pub estado: EstadoPedido,
    pub estado_pago: EstadoPago,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub iva: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,
    /// References to already uploaded photos for this order.
    #[sea_orm(column_type = "Json", nullable)]
    pub imagenes: Option<Json>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pedido_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::usuario::Entity",
        from = "Column::UsuarioId",
        to = "super::usuario::Column::Id"
    )]
    Usuario,
    #[sea_orm(
        belongs_to = "super::direccion::Entity",
        from = "Column::DireccionId",
        to = "super::direccion::Column::Id"
    )]
    Direccion,
}

impl Related<super::pedido_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl Related<super::direccion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Direccion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
