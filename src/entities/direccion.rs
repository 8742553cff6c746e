use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipping address entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "direcciones")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub usuario_id: i32,
    pub calle: String,
    #[sea_orm(nullable)]
    pub colonia: Option<String>,
    pub ciudad: String,
    pub estado: String,
    pub codigo_postal: String,
    pub pais: String,
    #[sea_orm(nullable)]
    pub telefono: Option<String>,
    pub predeterminada: bool,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::usuario::Entity",
        from = "Column::UsuarioId",
        to = "super::usuario::Column::Id"
    )]
    Usuario,
}

impl Related<super::usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
