use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tracing::info;

use storeadmin_core::OrderId;
use storeadmin_sales::{Order, OrderStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/", get(list_orders).post(create_order))
        .route("/orders/customer/:email", get(list_by_customer))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/orders/:id/status", put(update_status))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ListOrdersParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };
    let status = match dto::parse_status(params.status.as_deref()) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let window = match services.limits.window(params.skip, params.limit) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.orders.list_orders(status, window).await {
        Ok(orders) => orders_response(&orders),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_by_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
    params: Result<Query<dto::PageParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };
    let window = match services.limits.window(params.skip, params.limit) {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.orders.list_orders_by_customer(&email, window).await {
        Ok(orders) => orders_response(&orders),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.orders.get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<dto::CreateOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let input = match body.into_new_order() {
        Ok(input) => input,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders.create_order(input).await {
        Ok(order) => {
            info!(
                correlation_id = ctx.correlation_id(),
                order_id = %order.id,
                total_amount = order.total_amount,
                "order created"
            );
            (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<dto::UpdateOrderRequest>, JsonRejection>,
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

    match services.orders.update_order(id, changes).await {
        Ok(order) => {
            info!(correlation_id = ctx.correlation_id(), order_id = %id, "order updated");
            (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<dto::OrderStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let status = match body.status.parse::<OrderStatus>() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders.update_order_status(id, status).await {
        Ok(order) => {
            info!(
                correlation_id = ctx.correlation_id(),
                order_id = %id,
                status = %order.status,
                "order status changed"
            );
            (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.orders.delete_order(id).await {
        Ok(order) => {
            info!(correlation_id = ctx.correlation_id(), order_id = %id, "order deleted");
            (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

fn orders_response(orders: &[Order]) -> axum::response::Response {
    let items = orders.iter().map(dto::order_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(items)).into_response()
}

fn parse_id(raw: Result<Path<String>, PathRejection>) -> Result<OrderId, axum::response::Response> {
    let Path(raw) = raw.map_err(errors::path_rejection)?;
    raw.parse::<OrderId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}
