use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    auth::AuthService,
    db::DbPool,
    events::EventSender,
    services::{
        addresses::AddressService, checkout::CheckoutService, orders::OrderService,
        packages::PackageService, stripe::StripeGateway, users::UserService,
        webhooks::WebhookService,
    },
};

pub mod addresses;
pub mod auth;
pub mod checkout;
pub mod common;
pub mod health;
pub mod orders;
pub mod packages;
pub mod users;
pub mod webhooks;

/// Aggregated services used by the HTTP handlers, built once at bootstrap.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub addresses: Arc<AddressService>,
    pub packages: Arc<PackageService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub webhooks: Arc<WebhookService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        auth: Arc<AuthService>,
        gateway: Arc<StripeGateway>,
        iva_rate: Decimal,
    ) -> Self {
        let users = Arc::new(UserService::new(db.clone(), auth));
        let addresses = Arc::new(AddressService::new(db.clone()));
        let packages = Arc::new(PackageService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db, event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            users.clone(),
            addresses.clone(),
            packages.clone(),
            orders.clone(),
            gateway.clone(),
            event_sender.clone(),
            iva_rate,
        ));
        let webhooks = Arc::new(WebhookService::new(gateway, orders.clone(), event_sender));

        Self {
            users,
            addresses,
            packages,
            orders,
            checkout,
            webhooks,
        }
    }
}
