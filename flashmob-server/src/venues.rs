use axum::{
    extract::{Path, Query},
    routing::get,
    Json,
};

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    schemas::NearbyParams,
    serialized::{NearbyVenue, ToSerialized, Venue},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/venues",
    tag = "venues",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Venue>)
    )
)]
async fn list_venues(_caller: Caller, context: ServerContext) -> ServerResult<Json<Vec<Venue>>> {
    let venues = context.collab.venues.list_all().await?;

    Ok(Json(venues.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/venues/nearby",
    tag = "venues",
    params(NearbyParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Venues within the radius, closest first", body = Vec<NearbyVenue>)
    )
)]
async fn nearby_venues(
    caller: Caller,
    context: ServerContext,
    Query(params): Query<NearbyParams>,
) -> ServerResult<Json<Vec<NearbyVenue>>> {
    let point = params.point()?.unwrap_or(caller.user.coordinates);
    let venues = context.collab.venues.list_nearby(point, params.radius).await?;

    Ok(Json(venues.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/venues/{id}",
    tag = "venues",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Venue),
        (status = 404, description = "Venue not found")
    )
)]
async fn venue(
    _caller: Caller,
    context: ServerContext,
    Path(venue_id): Path<String>,
) -> ServerResult<Json<Venue>> {
    let venue = context.collab.venues.venue(&venue_id).await?;

    Ok(Json(venue.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_venues))
        .route("/nearby", get(nearby_venues))
        .route("/:id", get(venue))
}
