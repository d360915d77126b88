use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;

use storeadmin_core::ProductId;
use storeadmin_products::{ProductFilter, ProductQuery};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/", get(list_products).post(create_product))
        .route("/products/search", get(search_products))
        .route("/products/search/", get(search_products))
        .route("/products/category/:category", get(list_by_category))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ListProductsParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };
    let filter = params
        .is_active
        .map(ProductFilter::Active)
        .unwrap_or_default();
    run_query(&services, filter, params.skip, params.limit).await
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::SearchParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };
    // matched as sent; only all-blank terms are refused
    let term = match params.query {
        Some(term) if !term.trim().is_empty() => term,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "query must not be empty",
            )
        }
    };
    run_query(&services, ProductFilter::Search(term), params.skip, params.limit).await
}

pub async fn list_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
    params: Result<Query<dto::PageParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };
    run_query(&services, ProductFilter::Category(category), params.skip, params.limit).await
}

async fn run_query(
    services: &AppServices,
    filter: ProductFilter,
    skip: Option<u64>,
    limit: Option<u32>,
) -> axum::response::Response {
    let window = match services.limits.window(skip, limit) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .products
        .list_products(&ProductQuery::new(filter, window))
        .await
    {
        Ok(products) => {
            let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.products.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let input = match body.into_new_product() {
        Ok(input) => input,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.create_product(input).await {
        Ok(product) => {
            info!(
                correlation_id = ctx.correlation_id(),
                product_id = %product.id,
                sku = %product.sku,
                "product created"
            );
            (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let changes = match body.into_changes() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.update_product(id, changes).await {
        Ok(product) => {
            info!(correlation_id = ctx.correlation_id(), product_id = %id, "product updated");
            (StatusCode::OK, Json(dto::product_to_json(&product))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.products.delete_product(id).await {
        Ok(product) => {
            info!(correlation_id = ctx.correlation_id(), product_id = %id, "product deleted");
            (StatusCode::OK, Json(dto::product_to_json(&product))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

fn parse_id(
    raw: Result<Path<String>, PathRejection>,
) -> Result<ProductId, axum::response::Response> {
    let Path(raw) = raw.map_err(errors::path_rejection)?;
    raw.parse::<ProductId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}
