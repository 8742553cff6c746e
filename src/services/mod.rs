pub mod addresses;
pub mod checkout;
pub mod orders;
pub mod packages;
pub mod stripe;
pub mod users;
pub mod webhooks;
