use actix_multipart::Multipart;
use actix_web::{error, get, http::header, post, web, HttpResponse};
use askama::Template;
use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    configuration::Settings,
    domain::OrganizationTask,
    services::{exporter, execute_run, ApiKeyPool, ProgressSnapshot, ProgressTracker, RunControl},
    startup::{ProgressBoard, RunLock},
};

const EXPORT_FILE_NAME: &str = "news_data.csv";
const UPLOAD_FIELD: &str = "file";
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Template)]
#[template(path = "news.html")]
struct NewsTemplate {
    pool_size: usize,
    max_items: usize,
    key_count: usize,
    completed: usize,
    total: usize,
}

#[get("")]
async fn news_page(
    settings: web::Data<Settings>,
    board: web::Data<ProgressBoard>,
) -> Result<HttpResponse, error::Error> {
    let progress = *board.0.borrow();

    let page = NewsTemplate {
        pool_size: settings.browser.pool_size,
        max_items: settings.pipeline.max_items_per_organization,
        key_count: ApiKeyPool::usable_count(&settings.analysis.api_keys),
        completed: progress.completed,
        total: progress.total,
    }
    .render()
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().content_type("text/html").body(page))
}

#[get("/progress")]
async fn run_progress(board: web::Data<ProgressBoard>) -> HttpResponse {
    let progress = *board.0.borrow();
    HttpResponse::Ok().json(progress)
}

#[post("/run")]
async fn start_run(
    settings: web::Data<Settings>,
    run_lock: web::Data<RunLock>,
    board: web::Data<ProgressBoard>,
    mut payload: Multipart,
) -> Result<HttpResponse, error::Error> {
    let Ok(_running) = run_lock.0.try_lock() else {
        return Ok(HttpResponse::Conflict().body("A news run is already in progress"));
    };

    let upload = read_upload(&mut payload).await?;
    let organizations = match OrganizationTask::from_csv(upload.as_slice()) {
        Ok(organizations) => organizations,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().body(format!("Invalid companies file: {:#}", e)))
        }
    };

    let run_id = Uuid::new_v4();
    log::info!(
        "Run {} started for {} organizations",
        run_id,
        organizations.len()
    );

    let progress = ProgressTracker::publishing_to(board.0.clone(), organizations.len());
    let items = match execute_run(&settings, organizations, &progress, RunControl::default()).await
    {
        Ok(items) => items,
        Err(e) => {
            log::error!("Run {} aborted: {}", run_id, e);
            board.0.send_replace(ProgressSnapshot::default());
            return Ok(HttpResponse::InternalServerError().body(e.to_string()));
        }
    };

    if let Err(e) = exporter::save_csv(&items, &settings.pipeline.output_path) {
        log::error!("Run {} could not save its export: {:#}", run_id, e);
    }
    let csv = exporter::to_csv_bytes(&items).map_err(error::ErrorInternalServerError)?;
    log::info!("Run {} finished with {} items", run_id, items.len());

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
        ))
        .body(csv))
}

/// Reads the `file` part of the form. Other parts are skipped.
async fn read_upload(payload: &mut Multipart) -> Result<Vec<u8>, error::Error> {
    let mut upload = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        while let Some(chunk) = field.try_next().await? {
            if upload.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(error::ErrorPayloadTooLarge(format!(
                    "Companies file is larger than {} bytes",
                    MAX_UPLOAD_BYTES
                )));
            }
            upload.extend_from_slice(&chunk);
        }
    }

    Ok(upload)
}
