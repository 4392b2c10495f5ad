use std::sync::Arc;

use uuid::Uuid;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ErrorBody, HandleRequest, HandledBody, KillProcessRequest, SuccessBody};
use crate::error_handling::types::IngestError;
use crate::ingest::ingest_service::{AlertQuery, AlertReport, IngestService, TelemetryReport};

/// Telemetry and alert payloads may carry encoded screenshots.
const BODY_LIMIT: u64 = 50 * 1024 * 1024;

fn error_status(err: &IngestError) -> StatusCode {
    match err {
        IngestError::Validation(_) => StatusCode::BAD_REQUEST,
        IngestError::NotFound(_) => StatusCode::NOT_FOUND,
        IngestError::Conflict(_) => StatusCode::CONFLICT,
        IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(err: IngestError) -> warp::reply::Response {
    reply::with_status(
        reply::json(&ErrorBody::new(err.to_string())),
        error_status(&err),
    )
    .into_response()
}

/// GET /
pub fn root_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        Ok::<_, Rejection>(reply::json(&serde_json::json!({
            "message": "vigia telemetry hub running"
        })))
    })
}

/// POST /telemetry
pub fn telemetry_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("telemetry")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |report: TelemetryReport| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.submit_telemetry(report).await {
                    Ok(_) => reply::with_status(reply::json(&SuccessBody::new()), StatusCode::OK)
                        .into_response(),
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /alert
pub fn alert_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("alert")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |report: AlertReport| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.submit_alert(report).await {
                    Ok(_) => reply::with_status(reply::json(&SuccessBody::new()), StatusCode::OK)
                        .into_response(),
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /sessions/:channel
pub fn sessions_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("sessions" / String)
        .and(warp::get())
        .and_then(move |channel: String| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.sessions_by_channel(&channel).await {
                    Ok(sessions) => {
                        reply::with_status(reply::json(&sessions), StatusCode::OK).into_response()
                    }
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /session/:sessionId
pub fn session_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("session" / String)
        .and(warp::get())
        .and_then(move |session_id: String| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.session(&session_id).await {
                    Ok(session) => {
                        reply::with_status(reply::json(&session), StatusCode::OK).into_response()
                    }
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /alerts/:channel?limit=&offset=&severity=
pub fn alerts_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("alerts" / String)
        .and(warp::get())
        .and(warp::query::<AlertQuery>())
        .and_then(move |channel: String, query: AlertQuery| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.alerts(&channel, query).await {
                    Ok(page) => {
                        reply::with_status(reply::json(&page), StatusCode::OK).into_response()
                    }
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// PUT /alert/:alertId/handle
pub fn handle_alert_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("alert" / String / "handle")
        .and(warp::put())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |alert_id: String, body: HandleRequest| {
            let ingest = ingest.clone();
            async move {
                let alert_id = match Uuid::parse_str(&alert_id) {
                    Ok(id) => id,
                    Err(_) => {
                        return Ok::<_, Rejection>(
                            reply::with_status(
                                reply::json(&ErrorBody::new("Invalid alert id")),
                                StatusCode::BAD_REQUEST,
                            )
                            .into_response(),
                        )
                    }
                };
                let res = match ingest.mark_alert_handled(alert_id, &body.handled_by).await {
                    Ok(alert) => reply::with_status(
                        reply::json(&HandledBody {
                            success: true,
                            alert,
                        }),
                        StatusCode::OK,
                    )
                    .into_response(),
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /stats/:channel
pub fn stats_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("stats" / String)
        .and(warp::get())
        .and_then(move |channel: String| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.channel_stats(&channel).await {
                    Ok(stats) => {
                        reply::with_status(reply::json(&stats), StatusCode::OK).into_response()
                    }
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /session/:sessionId/screenshot
pub fn request_screenshot_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("session" / String / "screenshot")
        .and(warp::post())
        .and_then(move |session_id: String| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.request_screenshot(&session_id).await {
                    Ok(()) => reply::with_status(reply::json(&SuccessBody::new()), StatusCode::OK)
                        .into_response(),
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /session/:sessionId/kill
pub fn kill_process_route(
    ingest: Arc<IngestService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("session" / String / "kill")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |session_id: String, body: KillProcessRequest| {
            let ingest = ingest.clone();
            async move {
                let res = match ingest.kill_process(&session_id, &body.process_id).await {
                    Ok(()) => reply::with_status(reply::json(&SuccessBody::new()), StatusCode::OK)
                        .into_response(),
                    Err(err) => error_reply(err),
                };
                Ok::<_, Rejection>(res)
            }
        })
}
