//! Cart editing commands.

use cartwheel_core::{ProductId, ProductSummary, Size};
use cartwheel_sync::{CartPage, ClearOutcome, CountBadge, RemoveOutcome};

use super::{CommandError, Session};

/// Print the cart with product details and totals.
///
/// Products that cannot be loaded are shown with placeholders.
#[allow(clippy::print_stdout)]
pub async fn show(session: &Session) -> Result<(), CommandError> {
    let page = CartPage::attach(
        session.engine.store(),
        session.config.currency_code,
        session.config.shipping_flat_rate,
    );

    if page.snapshot().is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    let products: Vec<ProductSummary> = match session.catalog.products().await {
        Ok(products) => products.to_vec(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load products, showing placeholders");
            Vec::new()
        }
    };

    for row in page.rows(&products) {
        let line_price = row
            .line_price
            .map_or_else(|| "-".to_string(), |p| p.display());
        let stock_note = if row.exceeds_stock() {
            " (exceeds stock)"
        } else {
            ""
        };
        println!(
            "#{:<5} {:<30} {:<8} x{:<3} {:>10}{}",
            row.product_id, row.name, row.size_label, row.quantity, line_price, stock_note
        );
    }

    let totals = page.totals(&products);
    println!();
    println!("Subtotal: {}", totals.subtotal);
    println!("Shipping: {}", totals.shipping);
    println!("Total:    {}", totals.total);
    Ok(())
}

/// Add a product or update the quantity of an existing line.
#[allow(clippy::print_stdout)]
pub async fn add(session: &Session, product: i32, size: Size, quantity: i64) -> Result<(), CommandError> {
    let product_id = ProductId::new(product);
    let snapshot = session
        .engine
        .add_or_update(product_id, size, quantity)
        .await?;
    println!(
        "Cart now holds {} x product {product_id} ({})",
        snapshot.quantity_of(product_id, size),
        size.label()
    );
    Ok(())
}

/// Set the quantity of a line.
#[allow(clippy::print_stdout)]
pub async fn set(session: &Session, product: i32, size: Size, quantity: i64) -> Result<(), CommandError> {
    let product_id = ProductId::new(product);
    let snapshot = session
        .engine
        .set_quantity(product_id, size, quantity)
        .await?;
    println!(
        "Quantity of product {product_id} ({}) is now {}",
        size.label(),
        snapshot.quantity_of(product_id, size)
    );
    Ok(())
}

/// Remove a line.
#[allow(clippy::print_stdout)]
pub async fn remove(session: &Session, product: i32, size: Size) -> Result<(), CommandError> {
    let product_id = ProductId::new(product);
    match session.engine.remove(product_id, size).await? {
        RemoveOutcome::Absent => println!("Product {product_id} ({}) is not in the cart", size.label()),
        RemoveOutcome::RemovedLocally | RemoveOutcome::RemovedRemote => {
            println!("Removed product {product_id} ({})", size.label());
        }
        RemoveOutcome::Reconciled { cause } => {
            return Err(cause.into());
        }
    }
    Ok(())
}

/// Clear the cart and wait for the server to confirm.
#[allow(clippy::print_stdout)]
pub async fn clear(session: &Session) -> Result<(), CommandError> {
    let outcome = session.engine.clear().wait().await?;
    let remaining = session.engine.snapshot().item_count();
    if let ClearOutcome::Reconciled { .. } = outcome {
        println!("Cart could not be cleared; {remaining} items remain");
    }
    settle_clear(outcome, remaining)?;
    println!("Cart cleared");
    Ok(())
}

/// A clear the server never confirmed is a failed command.
fn settle_clear(outcome: ClearOutcome, remaining: u64) -> Result<(), CommandError> {
    match outcome {
        ClearOutcome::Confirmed { route, attempts } => {
            tracing::debug!(%route, attempts, "Clear confirmed");
            Ok(())
        }
        ClearOutcome::Reconciled { failures } => Err(CommandError::NotCleared {
            remaining,
            failures,
        }),
    }
}

/// Print the total number of units.
#[allow(clippy::print_stdout)]
pub fn count(session: &Session) {
    let badge = CountBadge::attach(session.engine.store(), "cli");
    println!("{}", badge.count());
}
