use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_usuarios_table::Migration),
            Box::new(m20240101_000002_create_direcciones_table::Migration),
            Box::new(m20240101_000003_create_paquetes_table::Migration),
            Box::new(m20240101_000004_create_pedidos_table::Migration),
            Box::new(m20240101_000005_create_pedido_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_usuarios_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_usuarios_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Usuarios::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Usuarios::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Usuarios::Nombre).string().not_null())
                        .col(ColumnDef::new(Usuarios::Email).string().not_null())
                        .col(ColumnDef::new(Usuarios::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Usuarios::Rol).string_len(20).not_null())
                        .col(ColumnDef::new(Usuarios::Telefono).string().null())
                        .col(
                            ColumnDef::new(Usuarios::CreadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Usuarios::ActualizadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_usuarios_email")
                        .table(Usuarios::Table)
                        .col(Usuarios::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Usuarios::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Usuarios {
        Table,
        Id,
        Nombre,
        Email,
        PasswordHash,
        Rol,
        Telefono,
        CreadoEn,
        ActualizadoEn,
    }
}

mod m20240101_000002_create_direcciones_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_direcciones_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Direcciones::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Direcciones::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Direcciones::UsuarioId).integer().not_null())
                        .col(ColumnDef::new(Direcciones::Calle).string().not_null())
                        .col(ColumnDef::new(Direcciones::Colonia).string().null())
                        .col(ColumnDef::new(Direcciones::Ciudad).string().not_null())
                        .col(ColumnDef::new(Direcciones::Estado).string().not_null())
                        .col(
                            ColumnDef::new(Direcciones::CodigoPostal)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Direcciones::Pais).string().not_null())
                        .col(ColumnDef::new(Direcciones::Telefono).string().null())
                        .col(
                            ColumnDef::new(Direcciones::Predeterminada)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Direcciones::CreadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Direcciones::ActualizadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_direcciones_usuario")
                                .from(Direcciones::Table, Direcciones::UsuarioId)
                                .to(Usuarios::Table, Usuarios::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_direcciones_usuario")
                        .table(Direcciones::Table)
                        .col(Direcciones::UsuarioId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Direcciones::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Direcciones {
        Table,
        Id,
        UsuarioId,
        Calle,
        Colonia,
        Ciudad,
        Estado,
        CodigoPostal,
        Pais,
        Telefono,
        Predeterminada,
        CreadoEn,
        ActualizadoEn,
    }

    #[derive(Iden)]
    enum Usuarios {
        Table,
        Id,
    }
}

mod m20240101_000003_create_paquetes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_paquetes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Paquetes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Paquetes::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Paquetes::Nombre).string().not_null())
                        .col(ColumnDef::new(Paquetes::Categoria).string().null())
                        .col(
                            ColumnDef::new(Paquetes::Precio)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Paquetes::CantidadFotos).integer().not_null())
                        .col(
                            ColumnDef::new(Paquetes::Activo)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Paquetes::CreadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Paquetes::ActualizadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Paquetes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Paquetes {
        Table,
        Id,
        Nombre,
        Categoria,
        Precio,
        CantidadFotos,
        Activo,
        CreadoEn,
        ActualizadoEn,
    }
}

mod m20240101_000004_create_pedidos_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_pedidos_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Pedidos::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Pedidos::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Pedidos::UsuarioId).integer().null())
                        .col(ColumnDef::new(Pedidos::DireccionId).integer().null())
                        .col(ColumnDef::new(Pedidos::IdPagoStripe).string().null())
                        .col(ColumnDef::new(Pedidos::IdSesionStripe).string().null())
                        .col(ColumnDef::new(Pedidos::NombreCliente).string().not_null())
                        .col(ColumnDef::new(Pedidos::EmailCliente).string().not_null())
                        .col(ColumnDef::new(Pedidos::TelefonoCliente).string().null())
                        .col(
                            ColumnDef::new(Pedidos::FechaPedido)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Pedidos::Estado).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Pedidos::EstadoPago)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Pedidos::Subtotal)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Pedidos::Iva).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Pedidos::Total).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Pedidos::Imagenes).json().null())
                        .col(
                            ColumnDef::new(Pedidos::CreadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Pedidos::ActualizadoEn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One order per checkout session: the unique index is what makes
            // concurrent webhook redeliveries safe (second insert is rejected
            // and mapped to the already-reconciled path).
            manager
                .create_index(
                    Index::create()
                        .name("idx_pedidos_sesion_stripe")
                        .table(Pedidos::Table)
                        .col(Pedidos::IdSesionStripe)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_pedidos_usuario")
                        .table(Pedidos::Table)
                        .col(Pedidos::UsuarioId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_pedidos_estado")
                        .table(Pedidos::Table)
                        .col(Pedidos::Estado)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Pedidos::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Pedidos {
        Table,
        Id,
        UsuarioId,
        DireccionId,
        IdPagoStripe,
        IdSesionStripe,
        NombreCliente,
        EmailCliente,
        TelefonoCliente,
        FechaPedido,
        Estado,
        EstadoPago,
        Subtotal,
        Iva,
        Total,
        Imagenes,
        CreadoEn,
        ActualizadoEn,
    }
}

mod m20240101_000005_create_pedido_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_pedido_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PedidoItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PedidoItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PedidoItems::PedidoId).integer().not_null())
                        .col(ColumnDef::new(PedidoItems::PaqueteId).integer().not_null())
                        .col(
                            ColumnDef::new(PedidoItems::NombrePaquete)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PedidoItems::CategoriaPaquete).string().null())
                        .col(
                            ColumnDef::new(PedidoItems::PrecioUnitario)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PedidoItems::Cantidad).integer().not_null())
                        .col(
                            ColumnDef::new(PedidoItems::NumFotosRequeridas)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pedido_items_pedido")
                                .from(PedidoItems::Table, PedidoItems::PedidoId)
                                .to(Pedidos::Table, Pedidos::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_pedido_items_pedido")
                        .table(PedidoItems::Table)
                        .col(PedidoItems::PedidoId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PedidoItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PedidoItems {
        Table,
        Id,
        PedidoId,
        PaqueteId,
        NombrePaquete,
        CategoriaPaquete,
        PrecioUnitario,
        Cantidad,
        NumFotosRequeridas,
    }

    #[derive(Iden)]
    enum Pedidos {
        Table,
        Id,
    }
}
