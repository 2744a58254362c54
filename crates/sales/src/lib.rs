//! Sales domain module: customer carts and the purchases checkout records.

pub mod cart;
pub mod purchase;

pub use cart::{Cart, CartLine, CartLineId};
pub use purchase::{Purchase, PurchaseDetail, PurchaseId};
