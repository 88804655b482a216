use actix_web::{
    rt,
    web::{self, Json},
    HttpRequest, HttpResponse,
};
use actix_ws::Message;
use futures::StreamExt;
use tracing::*;

use crate::{
    monitor::{manager as monitor_manager, DisplayState, PublishedState},
    server::{
        error::{Error, Result},
        types::{
            EmptyTrashResult, Info, ResetSettings, SetLanguage, SetModule, SetNetworkInterfaces,
            TrashPermission,
        },
    },
    settings::{self, manager::SettingsStruct},
};

lazy_static! {
    static ref STARTED_AT: chrono::DateTime<chrono::Local> = chrono::Local::now();
}

/// Pin the start time, should be done inside main
pub fn init() {
    lazy_static::initialize(&STARTED_AT);
}

pub fn new_info() -> Info {
    let started_at = *STARTED_AT;
    Info {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        authors: env!("CARGO_PKG_AUTHORS").into(),
        started_at: started_at.to_rfc3339(),
        uptime_seconds: (chrono::Local::now() - started_at).num_seconds(),
    }
}

fn unavailable(error: anyhow::Error) -> Error {
    Error::Unavailable(format!("{error:?}"))
}

/// Provide information about the running service
pub async fn info() -> Result<Json<Info>> {
    Ok(Json(new_info()))
}

/// Latest published host statistics
pub async fn stats() -> Result<Json<PublishedState>> {
    let state = monitor_manager::snapshot().map_err(unavailable)?;
    Ok(Json(state))
}

/// Latest host statistics rendered for display, with the enabled modules
pub async fn dashboard() -> Result<Json<DisplayState>> {
    let state = monitor_manager::snapshot().map_err(unavailable)?;
    let modules = settings::manager::modules().enabled();
    Ok(Json(DisplayState::new(&state, modules)))
}

/// Sample everything now instead of waiting for the next tick
pub async fn refresh() -> Result<Json<PublishedState>> {
    let state = monitor_manager::refresh_all().await.map_err(unavailable)?;
    Ok(Json(state))
}

/// Delete every entry of the trash, stopping at the first failure
pub async fn empty_trash() -> Result<Json<EmptyTrashResult>> {
    let removed = monitor_manager::empty_trash()
        .await
        .map_err(|error| Error::Internal(format!("{error:#}")))?;

    Ok(Json(EmptyTrashResult { removed }))
}

/// Check again if the trash can be listed
pub async fn trash_permission() -> Result<Json<TrashPermission>> {
    let accessible = monitor_manager::check_trash_permission()
        .await
        .map_err(unavailable)?;

    Ok(Json(TrashPermission { accessible }))
}

pub async fn settings() -> Result<Json<SettingsStruct>> {
    Ok(Json(settings::manager::settings()))
}

/// Show or hide one dashboard module
pub async fn settings_module(json: web::Json<SetModule>) -> Result<Json<SettingsStruct>> {
    let SetModule { module, enabled } = json.into_inner();
    settings::manager::set_module(module, enabled);
    Ok(Json(settings::manager::settings()))
}

pub async fn settings_language(json: web::Json<SetLanguage>) -> Result<Json<SettingsStruct>> {
    settings::manager::set_language(json.into_inner().language);
    Ok(Json(settings::manager::settings()))
}

/// Replace the interfaces counted for network throughput
pub async fn settings_network_interfaces(
    json: web::Json<SetNetworkInterfaces>,
) -> Result<Json<SettingsStruct>> {
    let network_interfaces = json.into_inner().network_interfaces;
    settings::manager::set_network_interfaces(network_interfaces.clone());
    monitor_manager::set_interface_filter(network_interfaces).map_err(unavailable)?;

    Ok(Json(settings::manager::settings()))
}

/// Reset service settings
pub async fn reset_settings(query: web::Query<ResetSettings>) -> Result<Json<SettingsStruct>> {
    if !query.all.unwrap_or_default() {
        return Err(Error::BadRequest(
            "Missing argument for reset_settings.".to_string(),
        ));
    }

    settings::manager::reset();
    monitor_manager::set_interface_filter(settings::manager::network_interfaces())
        .map_err(unavailable)?;

    Ok(Json(settings::manager::settings()))
}

/// WebSocket pushing the published state every time a tick changes it
pub async fn stats_ws(req: HttpRequest, stream: web::Payload) -> Result<HttpResponse> {
    let mut receiver = monitor_manager::subscribe().map_err(unavailable)?;
    let (response, mut session, mut msg_stream) =
        actix_ws::handle(&req, stream).map_err(|error| Error::Internal(format!("{error:?}")))?;

    rt::spawn(async move {
        'session: loop {
            let message = match serde_json::to_string(&*receiver.borrow_and_update()) {
                Ok(message) => message,
                Err(error) => {
                    warn!("Failed to serialize host statistics: {error:?}");
                    break;
                }
            };

            if session.text(message).await.is_err() {
                break;
            }

            loop {
                tokio::select! {
                    msg = msg_stream.next() => {
                        match msg {
                            Some(Ok(Message::Ping(bytes))) => {
                                if session.pong(&bytes).await.is_err() {
                                    break 'session;
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break 'session,
                            Some(Ok(_)) => {}
                        }
                    }
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            break 'session;
                        }
                        break;
                    }
                }
            }
        }

        let _ = session.close(None).await;
    });

    Ok(response)
}

/// WebSocket streaming the log history and then every new line
pub async fn log(req: HttpRequest, stream: web::Payload) -> Result<HttpResponse> {
    let (response, mut session, _stream) =
        actix_ws::handle(&req, stream).map_err(|error| Error::Internal(format!("{error:?}")))?;

    rt::spawn(async move {
        let (mut receiver, history) = match crate::logger::manager::HISTORY.lock() {
            Ok(history) => history.subscribe(),
            Err(_) => return,
        };

        for message in history {
            if session.text(message).await.is_err() {
                return;
            }
        }

        while let Ok(message) = receiver.recv().await {
            if session.text(message).await.is_err() {
                return;
            }
        }
    });

    Ok(response)
}
