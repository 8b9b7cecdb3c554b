//! Project endpoints: public catalogue reads and admin content management.
//!
//! Read-side responses are memoized in the response cache under
//! `projects:`-prefixed keys; every write invalidates the whole prefix.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use portfolio_store::{record_id, Project, ProjectStatus};

use crate::error::ApiError;
use crate::sanitize::{is_suspicious, normalize_list, normalize_text, validated_text};
use crate::state::AppState;

use super::auth::AdminUser;

const LIST_CACHE_TTL: Duration = Duration::from_secs(4);
const ROLLUP_CACHE_TTL: Duration = Duration::from_secs(60);

/// Aggregations are also cacheable downstream.
const ROLLUP_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=300";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectListQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// GET /projects
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let status = validated_status_filter(query.status, "published")?;
    let sort = match query.sort.as_deref() {
        None | Some("recent") => "recent",
        Some("alpha") => "alpha",
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "sort must be `recent` or `alpha`, got `{other}`"
            )))
        }
    };
    let search = normalize_text(query.search.as_deref().unwrap_or_default()).to_lowercase();
    let tag = normalize_text(query.tag.as_deref().unwrap_or_default()).to_lowercase();

    let cache_key = format!("projects:list:{search}:{tag}:{sort}:{page}:{limit}:{status}");
    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok(Json(hit));
    }

    let mut projects = state.projects.list().await?;
    projects.retain(|project| matches_status(project, &status));

    if !tag.is_empty() {
        projects.retain(|project| project.tags.iter().any(|t| t.to_lowercase() == tag));
    }

    if !search.is_empty() {
        projects.retain(|project| {
            let mut corpus = vec![
                project.title.clone(),
                project.summary.clone(),
                project.impact.clone(),
            ];
            corpus.extend(project.tags.iter().cloned());
            corpus.extend(project.stack.iter().cloned());
            corpus.join(" ").to_lowercase().contains(&search)
        });
    }

    match sort {
        "alpha" => projects.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        _ => projects.sort_by(|a, b| b.year.cmp(&a.year)),
    }

    let response = paginated(&projects, page, limit);
    state.cache.set(&cache_key, response.clone(), LIST_CACHE_TTL);
    Ok(Json(response))
}

/// GET /projects/:id — published records only
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cache_key = format!("projects:item:{id}");
    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok(Json(hit));
    }

    let project = state
        .projects
        .find_by_id(&id)
        .await?
        .filter(|project| project.status == ProjectStatus::Published)
        .ok_or(ApiError::ProjectNotFound)?;

    let response = json!(project);
    state.cache.set(&cache_key, response.clone(), LIST_CACHE_TTL);
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RollupQuery {
    pub status: Option<String>,
}

/// GET /projects/insights
pub async fn insights(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RollupQuery>,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    let status = validated_status_filter(query.status, "published")?;
    let cache_key = format!("projects:insights:{status}");

    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok((rollup_headers(), Json(hit)));
    }

    let mut projects = state.projects.list().await?;
    projects.retain(|project| matches_status(project, &status));

    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for project in &projects {
        *by_status.entry(project.status.as_str()).or_default() += 1;
        *by_year.entry(project.year).or_default() += 1;
        for tag in &project.tags {
            *by_tag.entry(tag.clone()).or_default() += 1;
        }
    }

    let response = json!({
        "total": projects.len(),
        "byStatus": by_status,
        "byTag": by_tag,
        "byYear": by_year,
    });
    state.cache.set(&cache_key, response.clone(), ROLLUP_CACHE_TTL);
    Ok((rollup_headers(), Json(response)))
}

/// GET /projects/tags — aggregated tag taxonomy
pub async fn tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RollupQuery>,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    let status = validated_status_filter(query.status, "published")?;
    let cache_key = format!("projects:tags:{status}");

    if let Some(hit) = state.cache.get(&cache_key) {
        return Ok((rollup_headers(), Json(hit)));
    }

    let mut projects = state.projects.list().await?;
    projects.retain(|project| matches_status(project, &status));

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for project in &projects {
        for tag in &project.tags {
            *counts.entry(tag.clone()).or_default() += 1;
        }
    }

    let mut tags: Vec<(String, usize)> = counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let response = json!({
        "totalTags": tags.len(),
        "tags": tags
            .iter()
            .map(|(tag, count)| json!({ "tag": tag, "count": count }))
            .collect::<Vec<_>>(),
    });
    state.cache.set(&cache_key, response.clone(), ROLLUP_CACHE_TTL);
    Ok((rollup_headers(), Json(response)))
}

#[derive(Deserialize)]
pub struct ProjectCreateRequest {
    pub title: String,
    pub summary: String,
    pub impact: String,
    pub year: i32,
    pub tags: Vec<String>,
    pub stack: Vec<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

/// POST /projects (admin)
pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<ProjectCreateRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let title = validated_text("title", &req.title, 3, 120)?;
    let summary = validated_text("summary", &req.summary, 10, 300)?;
    let impact = validated_text("impact", &req.impact, 10, 300)?;
    let year = validated_year(req.year)?;
    let tags = validated_list("tags", &req.tags, 2, 30)?;
    let stack = validated_list("stack", &req.stack, 1, 40)?;

    let now = Utc::now();
    let project = Project {
        id: record_id("project"),
        title,
        summary,
        impact,
        year,
        tags,
        stack,
        status: req.status.unwrap_or(ProjectStatus::Draft),
        created_at: now,
        updated_at: now,
    };

    let stored = state.projects.create(project).await?;
    state.cache.delete_by_prefix("projects:");

    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectUpdateRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub impact: Option<String>,
    pub year: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub stack: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
}

/// PATCH /projects/:id (admin) — partial update
pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<ProjectUpdateRequest>,
) -> Result<Json<Project>, ApiError> {
    // Validate and normalize everything before entering the mutation;
    // the updater itself must stay infallible.
    let title = req
        .title
        .map(|value| validated_text("title", &value, 3, 120))
        .transpose()?;
    let summary = req
        .summary
        .map(|value| validated_text("summary", &value, 10, 300))
        .transpose()?;
    let impact = req
        .impact
        .map(|value| validated_text("impact", &value, 10, 300))
        .transpose()?;
    let year = req.year.map(validated_year).transpose()?;
    let tags = req
        .tags
        .map(|value| validated_list("tags", &value, 2, 30))
        .transpose()?;
    let stack = req
        .stack
        .map(|value| validated_list("stack", &value, 1, 40))
        .transpose()?;
    let status = req.status;

    let updated = state
        .projects
        .update_by_id(&id, move |mut project| {
            if let Some(title) = title {
                project.title = title;
            }
            if let Some(summary) = summary {
                project.summary = summary;
            }
            if let Some(impact) = impact {
                project.impact = impact;
            }
            if let Some(year) = year {
                project.year = year;
            }
            if let Some(tags) = tags {
                project.tags = tags;
            }
            if let Some(stack) = stack {
                project.stack = stack;
            }
            if let Some(status) = status {
                project.status = status;
            }
            project.updated_at = Utc::now();
            project
        })
        .await?
        .ok_or(ApiError::ProjectNotFound)?;

    state.cache.delete_by_prefix("projects:");
    Ok(Json(updated))
}

/// DELETE /projects/:id (admin)
pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .projects
        .remove_by_id(&id)
        .await?
        .ok_or(ApiError::ProjectNotFound)?;

    state.cache.delete_by_prefix("projects:");
    Ok(StatusCode::NO_CONTENT)
}

fn matches_status(project: &Project, filter: &str) -> bool {
    filter == "all" || project.status.as_str() == filter
}

fn validated_status_filter(value: Option<String>, default: &str) -> Result<String, ApiError> {
    let status = value.unwrap_or_else(|| default.to_string());
    match status.as_str() {
        "all" | "draft" | "published" => Ok(status),
        other => Err(ApiError::Validation(format!(
            "status must be `all`, `draft` or `published`, got `{other}`"
        ))),
    }
}

fn validated_year(year: i32) -> Result<i32, ApiError> {
    if (2000..=2100).contains(&year) {
        Ok(year)
    } else {
        Err(ApiError::Validation(
            "year must be between 2000 and 2100".to_string(),
        ))
    }
}

fn validated_list(
    field: &str,
    values: &[String],
    item_min: usize,
    item_max: usize,
) -> Result<Vec<String>, ApiError> {
    let normalized = normalize_list(values);
    if normalized.is_empty() {
        return Err(ApiError::Validation(format!(
            "{field} must contain at least one entry"
        )));
    }
    for item in &normalized {
        let length = item.chars().count();
        if length < item_min || length > item_max {
            return Err(ApiError::Validation(format!(
                "{field} entries must be between {item_min} and {item_max} characters"
            )));
        }
        if is_suspicious(item) {
            return Err(ApiError::SuspiciousPayload);
        }
    }
    Ok(normalized)
}

fn paginated(projects: &[Project], page: u32, limit: u32) -> Value {
    let total = projects.len();
    let per_page = limit as usize;
    let offset = (page as usize - 1) * per_page;
    let items: Vec<&Project> = projects.iter().skip(offset).take(per_page).collect();
    let total_pages = total.div_ceil(per_page).max(1);

    json!({
        "items": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "totalPages": total_pages,
        }
    })
}

fn rollup_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(ROLLUP_CACHE_CONTROL),
    );
    headers
}
