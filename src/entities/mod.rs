pub mod location;
pub mod product;
pub mod stock_movement;
pub mod user;
