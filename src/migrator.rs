use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_orders_table::Migration),
            Box::new(m20240101_000002_create_order_items_table::Migration),
            Box::new(m20240101_000003_create_payments_table::Migration),
            Box::new(m20240101_000004_create_vouchers_table::Migration),
            Box::new(m20240101_000005_create_carts_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderCode).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::OrderDate).timestamp().not_null())
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::FinalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::ShippingAddress).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientName).string().null())
                        .col(ColumnDef::new(Orders::RecipientPhone).string().null())
                        .col(ColumnDef::new(Orders::VoucherId).uuid().null())
                        .col(ColumnDef::new(Orders::ProcessedBy).uuid().null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_order_code")
                        .table(Orders::Table)
                        .col(Orders::OrderCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderCode,
        CustomerId,
        Status,
        OrderDate,
        Subtotal,
        DiscountAmount,
        ShippingFee,
        FinalAmount,
        ShippingAddress,
        RecipientName,
        RecipientPhone,
        VoucherId,
        ProcessedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_order_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::PriceAtPurchase)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::DiscountApplied)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        PriceAtPurchase,
        DiscountApplied,
    }
}

mod m20240101_000003_create_payments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Payments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Payments::Method).string().not_null())
                        .col(ColumnDef::new(Payments::Status).string().not_null())
                        .col(ColumnDef::new(Payments::Amount).decimal().not_null())
                        .col(ColumnDef::new(Payments::TransactionCode).string().null())
                        .col(
                            ColumnDef::new(Payments::PayosOrderCode)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Payments::PayosPaymentLinkId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Payments::VerifiedBy).uuid().null())
                        .col(ColumnDef::new(Payments::Notes).string().null())
                        .col(ColumnDef::new(Payments::PaymentDate).timestamp().not_null())
                        .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Payments::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_payments_order_id")
                        .table(Payments::Table)
                        .col(Payments::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_payments_payos_order_code")
                        .table(Payments::Table)
                        .col(Payments::PayosOrderCode)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        Method,
        Status,
        Amount,
        TransactionCode,
        PayosOrderCode,
        PayosPaymentLinkId,
        VerifiedBy,
        Notes,
        PaymentDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_vouchers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_vouchers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vouchers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Vouchers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Vouchers::Code).string().not_null())
                        .col(ColumnDef::new(Vouchers::Name).string().not_null())
                        .col(ColumnDef::new(Vouchers::DiscountType).string().not_null())
                        .col(ColumnDef::new(Vouchers::DiscountValue).decimal().not_null())
                        .col(ColumnDef::new(Vouchers::StartDate).timestamp().not_null())
                        .col(ColumnDef::new(Vouchers::EndDate).timestamp().not_null())
                        .col(
                            ColumnDef::new(Vouchers::MinOrderValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Vouchers::MaxDiscountAmount)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(Vouchers::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Vouchers::UsedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Vouchers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Vouchers::CreatedBy).uuid().null())
                        .col(ColumnDef::new(Vouchers::Description).string().null())
                        .col(ColumnDef::new(Vouchers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Vouchers::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_vouchers_code")
                        .table(Vouchers::Table)
                        .col(Vouchers::Code)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vouchers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Vouchers {
        Table,
        Id,
        Code,
        Name,
        DiscountType,
        DiscountValue,
        StartDate,
        EndDate,
        MinOrderValue,
        MaxDiscountAmount,
        UsageLimit,
        UsedCount,
        IsActive,
        CreatedBy,
        Description,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_carts_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_carts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Carts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Carts::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_customer_id")
                        .table(Carts::Table)
                        .col(Carts::CustomerId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(CartItems::AddedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_id")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Carts {
        Table,
        Id,
        CustomerId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        UnitPrice,
        AddedAt,
    }
}
