pub mod common;
pub mod customers;
pub mod orders;
pub mod pages;
pub mod products;
pub mod promo_codes;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    customers::CustomerService, orders::OrderService, pages::PageService,
    products::ProductCatalogService, promo_codes::PromoCodeService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub promo_codes: Arc<PromoCodeService>,
    pub orders: Arc<OrderService>,
    pub customers: Arc<CustomerService>,
    pub pages: Arc<PageService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let promo_codes = Arc::new(PromoCodeService::new(db.clone()));
        let customers = Arc::new(CustomerService::new(db.clone()));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            promo_codes.clone(),
            customers.clone(),
            Some(event_sender.clone()),
            config.delivery_fee(),
        ));
        let pages = Arc::new(PageService::new(db, Some(event_sender)));

        Self {
            catalog,
            promo_codes,
            orders,
            customers,
            pages,
        }
    }
}
