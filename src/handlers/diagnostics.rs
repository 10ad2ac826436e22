use crate::{models::DiagnosticsResponse, state::AppState};
use axum::{extract::State, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Session layer and host diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current load", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn diagnostics(State(app): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let stats = app.registry.stats();
    let n_conn = app.open_connections() as u32;
    let n_cached_users = app.users.cached_entries() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}, Presences: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        stats.rooms,
        stats.presences
    );

    Json(DiagnosticsResponse {
        n_conn,
        n_rooms: stats.rooms as u32,
        n_presences: stats.presences as u32,
        n_cached_users,
        cpu_usage,
        memory_alloc,
        memory_total,
        memory_free,
    })
}
