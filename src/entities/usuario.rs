use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role. `Store` covers shop staff who move orders through the
/// fulfillment states; `Admin` can additionally manage accounts and catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Rol {
    #[sea_orm(string_value = "cliente")]
    #[serde(rename = "cliente")]
    Cliente,
    #[sea_orm(string_value = "store")]
    #[serde(rename = "store")]
    Store,
    #[sea_orm(string_value = "admin")]
    #[serde(rename = "admin")]
    Admin,
}

impl Rol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rol::Cliente => "cliente",
            Rol::Store => "store",
            Rol::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cliente" => Some(Rol::Cliente),
            "store" => Some(Rol::Store),
            "admin" => Some(Rol::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombre: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub rol: Rol,
    #[sea_orm(nullable)]
    pub telefono: Option<String>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::direccion::Entity")]
    Direcciones,
    #[sea_orm(has_many = "super::pedido::Entity")]
    Pedidos,
}

impl Related<super::direccion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Direcciones.def()
    }
}

impl Related<super::pedido::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pedidos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
