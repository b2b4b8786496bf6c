use std::{net::TcpListener, sync::Arc};

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use tokio::sync::{watch, Mutex};

use crate::{
    configuration::Settings,
    routes::{default_route, news_route},
    services::ProgressSnapshot,
};

/// Held for the duration of a run so that runs never overlap.
#[derive(Default)]
pub struct RunLock(pub Mutex<()>);

/// Latest progress of the current or last run.
pub struct ProgressBoard(pub Arc<watch::Sender<ProgressSnapshot>>);

impl Default for ProgressBoard {
    fn default() -> Self {
        let (board, _) = watch::channel(ProgressSnapshot::default());
        ProgressBoard(Arc::new(board))
    }
}

/// Registers every route. Expects `Settings`, `RunLock` and `ProgressBoard`
/// as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(default_route::default).service(
        web::scope("/news")
            .service(news_route::news_page)
            .service(news_route::start_run)
            .service(news_route::run_progress),
    );
}

pub fn run(listener: TcpListener, settings: Settings) -> Result<Server, std::io::Error> {
    let settings = web::Data::new(settings);
    let run_lock = web::Data::new(RunLock::default());
    let progress_board = web::Data::new(ProgressBoard::default());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure)
            .app_data(settings.clone())
            .app_data(run_lock.clone())
            .app_data(progress_board.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
