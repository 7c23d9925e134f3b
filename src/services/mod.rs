pub mod locations;
pub mod products;
pub mod stock_movements;
pub mod stock_validation;
