pub mod auth;
pub mod customers;
pub mod invoices;
pub mod items;
pub mod notifications;
pub mod reports;
pub mod stock;
