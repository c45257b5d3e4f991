use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::domain::order::{CreateOrder, ListOrders, NewOrderItem, OrderStatus, UpdateOrder};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub items: Option<Vec<NewOrderItem>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

pub(super) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("INVALID_ORDER_ID", format!("invalid order id: {raw}")))
}

pub(super) fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.trim()
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::Order(e.into()))
}

pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let order = state
        .orchestrator
        .create_order(CreateOrder {
            customer_id: body.customer_id,
            items: body.items,
        })
        .await?;

    Ok(HttpResponse::Created().json(order))
}

pub async fn get_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let order = state.orchestrator.get_order(id).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn list_orders(state: web::Data<AppState>, query: web::Query<ListQuery>) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .transpose()?;

    let page = state
        .orchestrator
        .list_orders(ListOrders {
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(0),
            status,
            customer_id: query.customer_id,
        })
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

pub async fn update_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let body = body.into_inner();
    let status = body.status.as_deref().map(parse_status).transpose()?;

    let order = state
        .orchestrator
        .update_order(id, UpdateOrder { items: body.items, status })
        .await?;

    Ok(HttpResponse::Ok().json(order))
}

pub async fn update_order_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let status = parse_status(&body.status)?;

    let order = state.orchestrator.update_order_status(id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn delete_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    state.orchestrator.delete_order(id).await?;
    Ok(HttpResponse::NoContent().finish())
}
