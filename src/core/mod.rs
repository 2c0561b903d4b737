pub mod cart;
pub mod catalog;
pub mod navigator;
pub mod order;
pub mod session;
