pub mod carts;
pub mod gateway;
pub mod order_status;
pub mod orders;
pub mod payments;
pub mod shipping;
