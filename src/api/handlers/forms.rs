use crate::api::error::AppError;
use crate::forms::FieldSpec;
use crate::forms::points_trigger::{self, PointsTriggerData};
use axum::{Json, extract::Query};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct BindPointsRequest {
    /// Raw submitted text; blank keeps `current`
    pub points: String,
    pub current: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct BindPointsResponse {
    pub points: i64,
}

#[utoipa::path(
    get,
    path = "/forms/points-trigger",
    params(PointsTriggerData),
    responses(
        (status = 200, description = "Points trigger field declaration", body = FieldSpec)
    ),
    tag = "forms"
)]
pub async fn describe_points_trigger(Query(initial): Query<PointsTriggerData>) -> Json<FieldSpec> {
    Json(points_trigger::describe(&initial))
}

#[utoipa::path(
    post,
    path = "/forms/points-trigger",
    request_body = BindPointsRequest,
    responses(
        (status = 200, description = "Submitted value bound to the field", body = BindPointsResponse),
        (status = 400, description = "Value is not a whole number")
    ),
    tag = "forms"
)]
pub async fn bind_points_trigger(
    Json(req): Json<BindPointsRequest>,
) -> Result<Json<BindPointsResponse>, AppError> {
    let field = points_trigger::describe(&PointsTriggerData {
        points: req.current,
    });
    let points = field.bind(&req.points)?;
    Ok(Json(BindPointsResponse { points }))
}
