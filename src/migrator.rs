use sea_orm_migration::prelude::*;

/// Schema migrator for the weight-transfer subsystem.
///
/// Migrations are kept inline, one module per table, and are safe to run
/// repeatedly (`if_not_exists` everywhere).
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_products_table::Migration),
            Box::new(m20240301_000002_create_warehouses_table::Migration),
            Box::new(m20240301_000003_create_stock_records_table::Migration),
            Box::new(m20240301_000004_create_production_results_table::Migration),
            Box::new(m20240301_000005_create_weight_transfers_table::Migration),
            Box::new(m20240301_000006_create_weight_transfer_approvals_table::Migration),
            Box::new(m20240301_000007_create_inventory_requests_table::Migration),
            Box::new(m20240301_000008_create_transfer_audit_logs_table::Migration),
        ]
    }
}

mod m20240301_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        IsActive,
        CreatedAt,
    }
}

mod m20240301_000002_create_warehouses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_warehouses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Code).string().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Code,
        Name,
        IsActive,
        CreatedAt,
    }
}

mod m20240301_000003_create_stock_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_stock_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRecords::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockRecords::Quantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockRecords::ReservedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRecords::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_records_product_warehouse")
                        .table(StockRecords::Table)
                        .col(StockRecords::ProductId)
                        .col(StockRecords::WarehouseId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockRecords {
        Table,
        Id,
        ProductId,
        WarehouseId,
        Quantity,
        ReservedQuantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_production_results_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_production_results_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionResults::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionResults::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionResults::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductionResults::MaterialId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionResults::Stage).string().not_null())
                        .col(
                            ColumnDef::new(ProductionResults::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::OperatorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::InputWeight)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::OutputWeight)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::WasteWeight)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::RemainingWeight)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::DestinationWarehouseId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::RemainderDestinationId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::TransfersCreated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProductionResults::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProductionResults::ApprovalNotes)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::RejectionReason)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::StageMetadata)
                                .json()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::CompletedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::ApprovedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionResults::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_results_order_id")
                        .table(ProductionResults::Table)
                        .col(ProductionResults::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_results_status")
                        .table(ProductionResults::Table)
                        .col(ProductionResults::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionResults::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductionResults {
        Table,
        Id,
        OrderId,
        MaterialId,
        Stage,
        WarehouseId,
        OperatorId,
        InputWeight,
        OutputWeight,
        WasteWeight,
        RemainingWeight,
        DestinationWarehouseId,
        RemainderDestinationId,
        Status,
        TransfersCreated,
        ApprovedBy,
        ApprovalNotes,
        RejectionReason,
        StageMetadata,
        CompletedAt,
        ApprovedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_weight_transfers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_weight_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WeightTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WeightTransfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WeightTransfers::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(WeightTransfers::MaterialId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::ProductionResultId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::TransferGroupId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WeightTransfers::Category).string().not_null())
                        .col(
                            ColumnDef::new(WeightTransfers::WeightTransferred)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WeightTransfers::Status).string().not_null())
                        .col(
                            ColumnDef::new(WeightTransfers::RequiresSequentialApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::SourceWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::DestinationWarehouseId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(WeightTransfers::Notes).string().null())
                        .col(ColumnDef::new(WeightTransfers::Metadata).json().null())
                        .col(
                            ColumnDef::new(WeightTransfers::CompletedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WeightTransfers::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_weight_transfers_group_id")
                        .table(WeightTransfers::Table)
                        .col(WeightTransfers::TransferGroupId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_weight_transfers_status")
                        .table(WeightTransfers::Table)
                        .col(WeightTransfers::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WeightTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WeightTransfers {
        Table,
        Id,
        OrderId,
        MaterialId,
        ProductionResultId,
        TransferGroupId,
        Category,
        WeightTransferred,
        Status,
        RequiresSequentialApproval,
        SourceWarehouseId,
        DestinationWarehouseId,
        Notes,
        Metadata,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000006_create_weight_transfer_approvals_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_weight_transfer_approvals_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Approvals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Approvals::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Approvals::TransferId).uuid().not_null())
                        .col(ColumnDef::new(Approvals::ApproverId).uuid().null())
                        .col(ColumnDef::new(Approvals::ApproverKind).string().not_null())
                        .col(ColumnDef::new(Approvals::Role).string().not_null())
                        .col(
                            ColumnDef::new(Approvals::ApprovalSequence)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Approvals::IsFinalApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Approvals::Status).string().not_null())
                        .col(ColumnDef::new(Approvals::Notes).string().null())
                        .col(ColumnDef::new(Approvals::DecidedAt).timestamp().null())
                        .col(ColumnDef::new(Approvals::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_approvals_transfer_id")
                        .table(Approvals::Table)
                        .col(Approvals::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Approvals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Approvals {
        #[sea_orm(iden = "weight_transfer_approvals")]
        Table,
        Id,
        TransferId,
        ApproverId,
        ApproverKind,
        Role,
        ApprovalSequence,
        IsFinalApproval,
        Status,
        Notes,
        DecidedAt,
        CreatedAt,
    }
}

mod m20240301_000007_create_inventory_requests_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_inventory_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRequests::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRequests::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRequests::RequestType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryRequests::Status).string().not_null())
                        .col(
                            ColumnDef::new(InventoryRequests::ObservedQuantity)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryRequests::CompletedBy).uuid().null())
                        .col(ColumnDef::new(InventoryRequests::Notes).string().null())
                        .col(
                            ColumnDef::new(InventoryRequests::CompletedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRequests::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_requests_transfer_id")
                        .table(InventoryRequests::Table)
                        .col(InventoryRequests::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryRequests {
        Table,
        Id,
        TransferId,
        WarehouseId,
        RequestType,
        Status,
        ObservedQuantity,
        CompletedBy,
        Notes,
        CompletedAt,
        CreatedAt,
    }
}

mod m20240301_000008_create_transfer_audit_logs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000008_create_transfer_audit_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLogs::TransferId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::TransferGroupId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::ProductionResultId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::ProductId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::WarehouseId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::QuantityBefore).decimal().null())
                        .col(ColumnDef::new(AuditLogs::QuantityAfter).decimal().null())
                        .col(ColumnDef::new(AuditLogs::WeightDelta).decimal().null())
                        .col(ColumnDef::new(AuditLogs::ActorKind).string().not_null())
                        .col(ColumnDef::new(AuditLogs::ActorId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Notes).string().null())
                        .col(ColumnDef::new(AuditLogs::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_transfer_id")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::TransferId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_group_id")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::TransferGroupId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        #[sea_orm(iden = "transfer_audit_logs")]
        Table,
        Id,
        TransferId,
        TransferGroupId,
        ProductionResultId,
        Action,
        ProductId,
        WarehouseId,
        QuantityBefore,
        QuantityAfter,
        WeightDelta,
        ActorKind,
        ActorId,
        Notes,
        CreatedAt,
    }
}
