use rust_decimal::Decimal;

use super::actions::{ProductAction, ProductActionResult};
use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{Product, ProductCreate, ProductPatch};

fn check_price(price: Decimal) -> Result<(), FrameworkError> {
    if price < Decimal::ZERO {
        return Err(FrameworkError::Rejected(format!("negative price {}", price)));
    }
    Ok(())
}

impl Entity for Product {
    type Id = String;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: ProductCreate) -> Result<Self, FrameworkError> {
        check_price(params.price)?;
        Ok(Product::new(id, params.name, params.category, params.price))
    }

    /// Price changes only affect orders placed afterwards; placed orders keep
    /// their own snapshot.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), FrameworkError> {
        if let Some(price) = patch.price {
            check_price(price)?;
            self.price = price;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        Ok(())
    }

    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, FrameworkError> {
        match action {
            ProductAction::Snapshot => Ok(ProductActionResult::Snapshot(self.snapshot())),
        }
    }
}
