use {
    crate::domain::{error::CoreError, order::OrderItem},
    sqlx::PgExecutor,
};

/// Put every ordered unit of a line back on the shelf.
pub async fn restore_for_item<'e, E: PgExecutor<'e>>(
    exec: E,
    item: &OrderItem,
) -> Result<(), CoreError> {
    restore_quantity(exec, item, item.quantity).await
}

/// Put `quantity` refunded units back on the shelf. Variant-bearing lines
/// restore their variant bucket; plain lines restore the aggregate product
/// stock and flip availability back on.
pub async fn restore_quantity<'e, E: PgExecutor<'e>>(
    exec: E,
    item: &OrderItem,
    quantity: i32,
) -> Result<(), CoreError> {
    match &item.variant {
        Some(variant) => {
            sqlx::query(
                r#"
                UPDATE product_variants
                SET stock = stock + $4
                WHERE product_id = $1 AND variant_type = $2 AND variant_value = $3
                "#,
            )
            .bind(item.product_id)
            .bind(&variant.kind)
            .bind(&variant.value)
            .bind(quantity)
            .execute(exec)
            .await?;
        }
        None => {
            sqlx::query(
                "UPDATE products SET stock = stock + $2, is_available = true WHERE id = $1",
            )
            .bind(item.product_id)
            .bind(quantity)
            .execute(exec)
            .await?;
        }
    }
    Ok(())
}
