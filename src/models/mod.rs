pub mod customer;
pub mod invoice;
pub mod item;
pub mod notification;
pub mod stock;
pub mod user;

pub use customer::{Customer, CustomerExportRow, CustomerPayload};
pub use invoice::{CreateInvoice, InvoiceItemRow, InvoiceResponse, InvoiceRow, PaymentPayload};
pub use item::{Item, ItemPayload};
pub use notification::{NotificationLog, NotificationLogFilter};
pub use stock::{
    CreateStockTransaction, StockAggregateRow, StockReportEntry, StockTransaction,
    StockTransactionFilter, StockTransactionRow,
};
pub use user::{CreateUser, LoginRequest, UpdateUser, User, UserResponse};
