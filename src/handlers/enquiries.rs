use axum::extract::{Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::mailer::OutgoingEmail;
use crate::models::{CreateEnquiryRequest, Enquiry, UpdateEnquiryRequest};
use crate::response::Envelope;

use super::Json;

/// create_enquiry
///
/// Public submission from the contact form. A notification email goes out
/// best-effort; a mail failure never fails the submission.
#[utoipa::path(
    post,
    path = "/api/v1/enquiries",
    request_body = CreateEnquiryRequest,
    responses(
        (status = 201, description = "Enquiry recorded", body = Enquiry),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_enquiry(
    State(state): State<AppState>,
    Json(req): Json<CreateEnquiryRequest>,
) -> Result<Envelope<Enquiry>, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::bad_request("Name, email, and message are required"));
    }

    let enquiry = state.repo.create_enquiry(&req).await?;

    state
        .mailer
        .send(OutgoingEmail {
            to: state.config.enquiry_notify_email.clone(),
            subject: format!("New enquiry from {}", enquiry.company_name),
            body: format!(
                "{} ({}) asked about {} x{}:\n\n{}",
                enquiry.contact_person,
                enquiry.email,
                enquiry.product_category,
                enquiry.quantity_required,
                enquiry.message
            ),
        })
        .await;

    Ok(Envelope::created(enquiry, "Enquiry submitted successfully"))
}

/// list_enquiries
#[utoipa::path(
    get,
    path = "/api/v1/admin/enquiries",
    responses((status = 200, description = "All enquiries, newest first", body = Vec<Enquiry>))
)]
pub async fn list_enquiries(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Envelope<Vec<Enquiry>>, ApiError> {
    let enquiries = state.repo.list_enquiries().await?;
    Ok(Envelope::ok(enquiries, "Enquiries fetched successfully"))
}

/// get_enquiry
#[utoipa::path(
    get,
    path = "/api/v1/admin/enquiries/{id}",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    responses(
        (status = 200, description = "Enquiry detail", body = Enquiry),
        (status = 404, description = "No such enquiry")
    )
)]
pub async fn get_enquiry(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Enquiry>, ApiError> {
    let enquiry = state
        .repo
        .find_enquiry(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Enquiry not found"))?;
    Ok(Envelope::ok(enquiry, "Enquiry fetched successfully"))
}

/// update_enquiry
#[utoipa::path(
    put,
    path = "/api/v1/admin/enquiries/{id}",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    request_body = UpdateEnquiryRequest,
    responses(
        (status = 200, description = "Enquiry updated", body = Enquiry),
        (status = 404, description = "No such enquiry")
    )
)]
pub async fn update_enquiry(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEnquiryRequest>,
) -> Result<Envelope<Enquiry>, ApiError> {
    let enquiry = state
        .repo
        .update_enquiry(id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Enquiry not found"))?;
    Ok(Envelope::ok(enquiry, "Enquiry updated successfully"))
}

/// delete_enquiry
#[utoipa::path(
    delete,
    path = "/api/v1/admin/enquiries/{id}",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    responses(
        (status = 200, description = "Enquiry deleted"),
        (status = 404, description = "No such enquiry")
    )
)]
pub async fn delete_enquiry(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>, ApiError> {
    if !state.repo.delete_enquiry(id).await? {
        return Err(ApiError::not_found("Enquiry not found"));
    }
    Ok(Envelope::ok((), "Enquiry deleted successfully"))
}
