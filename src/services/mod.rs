pub mod carts;
pub mod orders;
pub mod payos;
pub mod vouchers;
