//! Checkout command.

use cartwheel_sync::CheckoutView;

use super::{CommandError, Session};

/// Print the order draft the checkout page would submit.
#[allow(clippy::print_stdout)]
pub fn checkout(session: &Session) -> Result<(), CommandError> {
    let view = CheckoutView::attach(session.engine.store());
    let draft = view.freeze()?;
    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}
