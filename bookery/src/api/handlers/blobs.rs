use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::blobs::{BlobContentResponse, BlobResponse},
    errors::{Error, Result},
    types::ContainerId,
};

/// List the blobs in a container
#[utoipa::path(
    get,
    path = "/containers/{container_id}/blobs",
    tag = "blobs",
    params(
        ("container_id" = String, Path, description = "The ID of the container to list")
    ),
    responses(
        (status = 200, description = "Blobs in the container", body = [BlobResponse]),
        (status = 404, description = "Container not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(container_id = %container_id_str))]
pub async fn list_blobs(State(state): State<AppState>, Path(container_id_str): Path<String>) -> Result<Json<Vec<BlobResponse>>> {
    let container_id = parse_container_id(&container_id_str)?;

    let entries = state.blobs.list_blobs(container_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Container".to_string(),
        id: container_id.to_string(),
    })?;

    Ok(Json(entries.into_iter().map(BlobResponse::from).collect()))
}

/// Download every blob in a container
#[utoipa::path(
    get,
    path = "/containers/{container_id}/blobs/content",
    tag = "blobs",
    params(
        ("container_id" = String, Path, description = "The ID of the container to download")
    ),
    responses(
        (status = 200, description = "Blobs with base64-encoded content", body = [BlobContentResponse]),
        (status = 404, description = "Container not found"),
        (status = 500, description = "A blob download failed")
    )
)]
#[tracing::instrument(skip_all, fields(container_id = %container_id_str))]
pub async fn get_blobs(State(state): State<AppState>, Path(container_id_str): Path<String>) -> Result<Json<Vec<BlobContentResponse>>> {
    let container_id = parse_container_id(&container_id_str)?;

    let blobs = state.blobs.get_blobs(container_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Container".to_string(),
        id: container_id.to_string(),
    })?;

    Ok(Json(blobs.into_iter().map(BlobContentResponse::from).collect()))
}

/// Upload a blob into a container
///
/// The blob name comes from the `file` part's filename; a `name` text field
/// overrides it when present.
#[utoipa::path(
    post,
    path = "/containers/{container_id}/blobs",
    tag = "blobs",
    params(
        ("container_id" = String, Path, description = "The ID of the container to upload into")
    ),
    request_body(
        content_type = "multipart/form-data",
        description = "Blob content under a `file` part, with an optional `name` override field"
    ),
    responses(
        (status = 201, description = "Blob stored", body = BlobResponse),
        (status = 400, description = "Invalid multipart payload"),
        (status = 404, description = "Container not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(container_id = %container_id_str))]
pub async fn upload_blob(
    State(state): State<AppState>,
    Path(container_id_str): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BlobResponse>)> {
    let container_id = parse_container_id(&container_id_str)?;

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().map(|s| s.to_string());
                let content = field.bytes().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file content: {}", e),
                })?;
                file = Some((filename, content.to_vec()));
            }
            "name" => {
                name_override = Some(field.text().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read name: {}", e),
                })?);
            }
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    let (filename, content) = file.ok_or_else(|| Error::BadRequest {
        message: "Missing required field: 'file'".to_string(),
    })?;

    let name = name_override.or(filename).ok_or_else(|| Error::BadRequest {
        message: "Blob name missing: set a filename on the 'file' part or send a 'name' field".to_string(),
    })?;

    let entry = state.blobs.add_blob(container_id, &name, content).await?;

    Ok((StatusCode::CREATED, Json(BlobResponse::from(entry))))
}

fn parse_container_id(raw: &str) -> Result<ContainerId> {
    raw.parse::<ContainerId>().map_err(|_| Error::BadRequest {
        message: "Invalid container ID format".to_string(),
    })
}
