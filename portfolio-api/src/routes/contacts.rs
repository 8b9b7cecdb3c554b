//! Contact intake and admin triage endpoints.
//!
//! Intake is guarded twice before anything is written: a caller-supplied
//! idempotency key turns retries into replays of the original record,
//! and a trailing-window heuristic rejects near-duplicate submissions.
//! Both checks read the latest committed snapshot; two identical
//! submissions racing through the same instant can still both land, a
//! window this store accepts in exchange for keeping the guards outside
//! the mutation queue.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use portfolio_store::{record_id, Contact, ContactStatus, StatusChange};

use crate::error::ApiError;
use crate::sanitize::{is_valid_email, is_valid_idempotency_key, normalize_text, validated_text};
use crate::state::AppState;

use super::auth::AdminUser;

/// Window within which an identical (email, message) pair is a conflict.
const DUPLICATE_WINDOW_MINUTES: i64 = 60;

const SUMMARY_CACHE_TTL: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
pub struct ContactCreateRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Honeypot field; real clients leave it empty.
    #[serde(default)]
    pub website: String,
}

/// POST /contacts
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ContactCreateRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !req.website.trim().is_empty() {
        return Err(ApiError::PotentialSpam);
    }

    let name = validated_text("name", &req.name, 3, 120)?;
    let email = normalize_text(&req.email).to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    let subject = validated_text("subject", &req.subject, 3, 120)?;
    let message = validated_text("message", &req.message, 20, 1200)?;
    let source = match req.source {
        Some(source) => validated_text("source", &source, 2, 50)?,
        None => "portfolio-site".to_string(),
    };

    let idempotency_key = match headers.get("idempotency-key") {
        None => None,
        Some(value) => {
            let key = value
                .to_str()
                .ok()
                .filter(|key| is_valid_idempotency_key(key))
                .ok_or(ApiError::InvalidIdempotencyKey)?;
            Some(key.to_string())
        }
    };

    // Replay: a known idempotency key returns the original record
    // instead of writing a second one.
    if let Some(key) = &idempotency_key {
        if let Some(existing) = state.contacts.find_by_idempotency_key(key).await? {
            return Ok((StatusCode::OK, Json(intake_response(&existing, true))));
        }
    }

    // Same sender, same message, short window: a conflict, not a replay.
    let window_start = Utc::now() - chrono::Duration::minutes(DUPLICATE_WINDOW_MINUTES);
    let duplicate = state
        .contacts
        .list()
        .await?
        .into_iter()
        .any(|c| c.email == email && c.message == message && c.created_at > window_start);
    if duplicate {
        return Err(ApiError::DuplicateContact);
    }

    let now = Utc::now();
    let contact = Contact {
        id: record_id("contact"),
        name,
        email,
        subject,
        message,
        source,
        status: ContactStatus::New,
        idempotency_key,
        internal_note: None,
        status_history: vec![StatusChange {
            status: ContactStatus::New,
            changed_at: now,
            actor: "system".to_string(),
            note: None,
        }],
        created_at: now,
        updated_at: now,
    };

    let stored = state.contacts.create(contact).await?;
    state.cache.delete_by_prefix("contacts:");

    Ok((StatusCode::CREATED, Json(intake_response(&stored, false))))
}

fn intake_response(contact: &Contact, deduplicated: bool) -> Value {
    json!({
        "id": contact.id,
        "status": contact.status,
        "createdAt": contact.created_at,
        "deduplicated": deduplicated,
        "message": "Contact received successfully.",
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub source: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// GET /contacts (admin)
pub async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let status = match query.status.as_deref() {
        None | Some("all") => None,
        Some("new") => Some(ContactStatus::New),
        Some("in_progress") => Some(ContactStatus::InProgress),
        Some("resolved") => Some(ContactStatus::Resolved),
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "status must be `all`, `new`, `in_progress` or `resolved`, got `{other}`"
            )))
        }
    };
    let search = normalize_text(query.search.as_deref().unwrap_or_default()).to_lowercase();
    let source = normalize_text(query.source.as_deref().unwrap_or_default()).to_lowercase();

    let mut contacts = state.contacts.list().await?;

    if let Some(status) = status {
        contacts.retain(|contact| contact.status == status);
    }
    if !source.is_empty() {
        contacts.retain(|contact| contact.source.to_lowercase() == source);
    }
    if !search.is_empty() {
        contacts.retain(|contact| {
            [
                &contact.name,
                &contact.email,
                &contact.subject,
                &contact.message,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&search))
        });
    }
    if let Some(from) = query.from {
        contacts.retain(|contact| contact.created_at >= from);
    }
    if let Some(to) = query.to {
        contacts.retain(|contact| contact.created_at <= to);
    }

    // Newest first
    contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = contacts.len();
    let per_page = limit as usize;
    let items: Vec<&Contact> = contacts
        .iter()
        .skip((page as usize - 1) * per_page)
        .take(per_page)
        .collect();
    let total_pages = total.div_ceil(per_page).max(1);

    Ok(Json(json!({
        "items": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "totalPages": total_pages,
        }
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /contacts/summary (admin) — triage rollup over an optional window
pub async fn summary(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, ApiError> {
    let cache_key = format!(
        "contacts:summary:{}:{}",
        query.from.map(|t| t.to_rfc3339()).unwrap_or_default(),
        query.to.map(|t| t.to_rfc3339()).unwrap_or_default(),
    );
    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok(Json(hit));
    }

    let mut contacts = state.contacts.list().await?;
    if let Some(from) = query.from {
        contacts.retain(|contact| contact.created_at >= from);
    }
    if let Some(to) = query.to {
        contacts.retain(|contact| contact.created_at <= to);
    }

    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    for contact in &contacts {
        *by_status.entry(contact.status.as_str()).or_default() += 1;
        *by_source.entry(contact.source.clone()).or_default() += 1;
    }

    let response = json!({
        "total": contacts.len(),
        "byStatus": by_status,
        "bySource": by_source,
    });
    state.cache.set(&cache_key, response.clone(), SUMMARY_CACHE_TTL);
    Ok(Json(response))
}

/// GET /contacts/:id (admin)
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Contact>, ApiError> {
    let contact = state
        .contacts
        .find_by_id(&id)
        .await?
        .ok_or(ApiError::ContactNotFound)?;
    Ok(Json(contact))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: ContactStatus,
    #[serde(default)]
    pub internal_note: Option<String>,
}

/// PATCH /contacts/:id/status (admin)
///
/// Appends to the contact's append-only triage log, attributed to the
/// authenticated caller.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Contact>, ApiError> {
    let note = match req.internal_note {
        Some(note) => {
            let note = validated_text("internalNote", &note, 0, 300)?;
            (!note.is_empty()).then_some(note)
        }
        None => None,
    };
    let status = req.status;
    let actor = claims.email;

    let updated = state
        .contacts
        .update_by_id(&id, move |mut contact| {
            let now = Utc::now();
            contact.status = status;
            if let Some(note) = &note {
                contact.internal_note = Some(note.clone());
            }
            contact.status_history.push(StatusChange {
                status,
                changed_at: now,
                actor,
                note,
            });
            contact.updated_at = now;
            contact
        })
        .await?
        .ok_or(ApiError::ContactNotFound)?;

    state.cache.delete_by_prefix("contacts:");
    Ok(Json(updated))
}
