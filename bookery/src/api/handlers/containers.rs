use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::containers::{ContainerCreate, ContainerResponse},
    errors::Result,
};

/// List all containers
#[utoipa::path(
    get,
    path = "/containers",
    tag = "containers",
    responses(
        (status = 200, description = "All known containers", body = [ContainerResponse]),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_containers(State(state): State<AppState>) -> Result<Json<Vec<ContainerResponse>>> {
    let containers = state.blobs.list_containers().await?;
    Ok(Json(containers.into_iter().map(ContainerResponse::from).collect()))
}

/// Create a container
#[utoipa::path(
    post,
    path = "/containers",
    tag = "containers",
    request_body = ContainerCreate,
    responses(
        (status = 201, description = "Container created", body = ContainerResponse),
        (status = 200, description = "Generated ID collided with an existing physical container; nothing was created"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(name = %request.name))]
pub async fn create_container(State(state): State<AppState>, Json(request): Json<ContainerCreate>) -> Result<Response> {
    match state.blobs.add_container(&request.name).await? {
        Some(container) => Ok((StatusCode::CREATED, Json(ContainerResponse::from(container))).into_response()),
        // The duplicate guard fired; report success without a body
        None => Ok(StatusCode::OK.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_app;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_containers_empty() {
        let server = create_test_app().await;

        let response = server.get("/api/v1/containers").await;
        response.assert_status_ok();

        let containers: Vec<ContainerResponse> = response.json();
        assert!(containers.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_containers() {
        let server = create_test_app().await;

        let response = server
            .post("/api/v1/containers")
            .json(&serde_json::json!({"name": "Docs"}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let created: ContainerResponse = response.json();
        assert_eq!(created.name, "Docs");
        assert_ne!(created.id, Uuid::nil());

        let listed: Vec<ContainerResponse> = server.get("/api/v1/containers").await.json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].name, "Docs");
    }

    #[tokio::test]
    async fn test_created_containers_get_distinct_ids() {
        let server = create_test_app().await;

        let first: ContainerResponse = server
            .post("/api/v1/containers")
            .json(&serde_json::json!({"name": "same-name"}))
            .await
            .json();
        let second: ContainerResponse = server
            .post("/api/v1/containers")
            .json(&serde_json::json!({"name": "same-name"}))
            .await
            .json();

        assert_ne!(first.id, second.id);
    }
}
