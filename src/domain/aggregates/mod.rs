//! Aggregates module
pub mod product;
pub mod order;
pub mod customer;

pub use product::{CustomizationOption, NewProduct, Product, ProductError, ProductStatus, ProductUpdate};
pub use order::{
    Cancellation, CustomizationSelection, DiscountLine, ItemStatus, LineItem, NewOrder, Order, OrderError,
    OrderStatus, Payment, PaymentMethod, PaymentStatus, PaymentUpdate, Pricing, RefundStatus, ShippingMethod,
    TimelineEntry,
};
pub use customer::{loyalty_points_for, CustomerProfile};
