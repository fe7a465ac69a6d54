//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables. Each entity has a Model
//! struct for data and an Entity struct for operations.

pub mod payment_request;
pub mod user;

// Re-export specific types to avoid conflicts
pub use payment_request::{
    Column as PaymentRequestColumn, Entity as PaymentRequest, Model as PaymentRequestModel,
    PaymentStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
