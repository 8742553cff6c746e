use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Confirmed order line. Copied verbatim from the checkout session metadata
/// at reconciliation time; never re-read from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pedido_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub pedido_id: i32,
    pub paquete_id: i32,
    pub nombre_paquete: String,
    #[sea_orm(nullable)]
    pub categoria_paquete: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub precio_unitario: Decimal,
    pub cantidad: i32,
    pub num_fotos_requeridas: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pedido::Entity",
        from = "Column::PedidoId",
        to = "super::pedido::Column::Id"
    )]
    Pedido,
}

impl Related<super::pedido::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pedido.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
