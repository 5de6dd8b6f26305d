use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Backend for a bilingual (Sinhala/English) direct-to-consumer herbal storefront.

## Features

- **Catalog**: Bilingual product listings, slug lookup, and search
- **Promo Codes**: Eligibility validation and discount computation at checkout
- **Checkout**: Cart-snapshot order creation with idempotent resubmission
- **Order Management**: Status lifecycle with an enforced transition table
- **Customers**: Purchase aggregates maintained per phone number
- **Pages**: Admin-editable policy content (privacy, refunds, terms)

## Error Handling

Failures use consistent response payloads with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "Validation error: Promo code has expired",
  "timestamp": "2025-11-02T10:30:00.000Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).

Admin routes are grouped under `/api/v1/admin` so a fronting gateway can
protect them; the API itself does not handle authentication.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Storefront catalog endpoints"),
        (name = "Promo Codes", description = "Promo code validation"),
        (name = "Orders", description = "Checkout and order lookup"),
        (name = "Pages", description = "Policy page content"),
        (name = "Admin", description = "Back-office endpoints")
    ),
    paths(
        // Storefront
        crate::handlers::products::list_products,
        crate::handlers::products::search_products,
        crate::handlers::products::get_product_by_slug,
        crate::handlers::promo_codes::validate_promo_code,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order_by_number,
        crate::handlers::pages::get_page_by_slug,

        // Admin
        crate::handlers::products::create_product,
        crate::handlers::promo_codes::create_promo_code,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::update_order_status,
        crate::handlers::customers::list_customers,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::CreateOrderItem,
            crate::services::orders::ShippingAddress,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,

            // Promo code types
            crate::handlers::promo_codes::ValidatePromoCodeRequest,
            crate::services::promo_codes::Evaluation,
            crate::services::promo_codes::CreatePromoCodeRequest,
            crate::services::promo_codes::UpdatePromoCodeRequest,
            crate::entities::promo_code::PromoKind,

            // Catalog types
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,

            // Page types
            crate::services::pages::CreatePageRequest,
            crate::services::pages::UpdatePageRequest,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_includes_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/promo-codes/validate"));
    }
}
