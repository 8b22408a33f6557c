//! OCPP WebSocket server
//!
//! Accepts station connections at `ws://<host>:<port>/<station-id>`,
//! negotiates the OCPP subprotocol, and runs one reader and one writer
//! task per connection around a registered [`Session`].

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use percent_encoding::percent_decode_str;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::dispatch::InboundDispatcher;
use crate::domain::OcppVersion;
use crate::events::{Event, EventBus, StationConnectedEvent, StationDisconnectedEvent};
use crate::ocpp::{CallFault, OcppErrorCode, OcppFrame};
use crate::services::Services;
use crate::session::{
    connection::OUTBOUND_QUEUE_CAPACITY, CallFailure, ConnectionRegistry, RegisterOutcome, Session,
};
use crate::shared::ShutdownSignal;

use super::negotiator::ProtocolNegotiator;

/// OCPP WebSocket server
pub struct OcppServer {
    config: AppConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<InboundDispatcher>,
    services: Services,
    events: EventBus,
    shutdown: Option<ShutdownSignal>,
}

impl OcppServer {
    pub fn new(
        config: AppConfig,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<InboundDispatcher>,
        services: Services,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            registry,
            dispatcher,
            services,
            events,
            shutdown: None,
        }
    }

    /// Set the shutdown signal for graceful shutdown
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Bind and serve until shutdown. A bind failure is returned to the
    /// caller (process exits non-zero).
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.ws_address();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (tests bind port 0).
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let negotiator = ProtocolNegotiator::all();
        info!(
            "OCPP endpoint listening on ws://{} (subprotocols: {})",
            listener.local_addr()?,
            negotiator.supported_subprotocols().join(", ")
        );

        loop {
            let accept = async { listener.accept().await };
            let result = match &self.shutdown {
                Some(shutdown) => {
                    tokio::select! {
                        result = accept => result,
                        _ = shutdown.notified().wait() => {
                            info!("WebSocket server received shutdown signal");
                            self.registry.drain_all();
                            return Ok(());
                        }
                    }
                }
                None => accept.await,
            };

            match result {
                Ok((stream, addr)) => self.spawn_connection(stream, addr),
                Err(e) => error!("Failed to accept connection: {}", e),
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let config = self.config.clone();
        let registry = self.registry.clone();
        let dispatcher = self.dispatcher.clone();
        let services = self.services.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(stream, addr, config, registry, dispatcher, services, events)
                    .await
            {
                debug!("Connection from {} ended with error: {}", addr, e);
            }
        });
    }
}

/// Extract the station id from the request path: the last path segment,
/// percent-decoded, non-empty after trimming slashes.
fn extract_station_id(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let segment = trimmed.rsplit('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    let decoded = decoded.trim_matches('/').trim();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_string())
    }
}

fn reject_handshake(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Handle a single station connection end to end.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: AppConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<InboundDispatcher>,
    services: Services,
    events: EventBus,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("New connection from {}", addr);

    let negotiator = ProtocolNegotiator::all();
    let mut station_id: Option<String> = None;
    let mut version: Option<OcppVersion> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();

            let id = match extract_station_id(path) {
                Some(id) => id,
                None => {
                    warn!("Handshake from {} rejected: no station id in path {}", addr, path);
                    return Err(reject_handshake("missing station id in path"));
                }
            };

            let offered = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let negotiated = match negotiator.negotiate(offered) {
                Some(v) => v,
                None => {
                    warn!(
                        station_id = id.as_str(),
                        offered, "Handshake rejected: no matching OCPP subprotocol"
                    );
                    return Err(reject_handshake("no matching OCPP subprotocol"));
                }
            };

            response.headers_mut().insert(
                "Sec-WebSocket-Protocol",
                negotiated.subprotocol().parse().unwrap(),
            );

            info!(
                station_id = id.as_str(),
                subprotocol = negotiated.subprotocol(),
                "WebSocket handshake accepted"
            );

            station_id = Some(id);
            version = Some(negotiated);
            Ok(response)
        },
    )
    .await?;

    // Both were set by the handshake callback on the accept path.
    let (station_id, version) = match (station_id, version) {
        (Some(id), Some(v)) => (id, v),
        _ => return Ok(()),
    };

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);
    let session = Session::new(&station_id, version, outbound_tx, Some(addr.to_string()));

    match registry.register(session.clone()).await {
        RegisterOutcome::New => {}
        RegisterOutcome::TookOver { drained_in_time } => {
            info!(
                station_id = station_id.as_str(),
                drained_in_time, "Takeover: replaced existing session"
            );
        }
    }

    events.publish(Event::StationConnected(StationConnectedEvent {
        station_id: station_id.clone(),
        version,
        remote_addr: Some(addr.to_string()),
        timestamp: Utc::now(),
    }));

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Writer: sole consumer of the session's bounded outbound queue.
    let writer_station = station_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            debug!(station_id = writer_station.as_str(), "-> {}", text);
            metrics::counter!("csms_frames_total", "direction" => "out").increment(1);
            if let Err(e) = ws_sender.send(Message::Text(text)).await {
                warn!(station_id = writer_station.as_str(), error = %e, "Write failed");
                break;
            }
        }
        // Drain requested or session closed: say goodbye if possible.
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    // Reader: frames are consumed serially; each CALL is handled on its
    // own task so a slow handler does not stall the connection.
    let idle_deadline = config.idle_deadline();
    loop {
        let next = tokio::select! {
            _ = session.drain_requested() => {
                info!(station_id = station_id.as_str(), "Session draining, closing socket");
                break;
            }
            next = tokio::time::timeout(idle_deadline, ws_receiver.next()) => next,
        };

        let message = match next {
            Err(_) => {
                // Nothing heard for interval x grace: half-open link.
                warn!(
                    station_id = station_id.as_str(),
                    idle = ?idle_deadline,
                    "No traffic within heartbeat window, closing"
                );
                if let Err(e) = services.stations.mark_offline(&station_id).await {
                    warn!(station_id = station_id.as_str(), error = %e, "Failed to mark station offline");
                }
                break;
            }
            Ok(None) => break,
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(e))) => {
                warn!(station_id = station_id.as_str(), error = %e, "WebSocket error");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                session.touch();
                metrics::counter!("csms_frames_total", "direction" => "in").increment(1);
                debug!(station_id = station_id.as_str(), "<- {}", text);

                // A replaced session must not keep consuming frames.
                if !registry.is_current(&session) {
                    warn!(
                        station_id = station_id.as_str(),
                        "Session was replaced, terminating reader"
                    );
                    break;
                }

                handle_frame(&text, &session, &dispatcher).await;
            }
            Message::Ping(_) | Message::Pong(_) => {
                session.touch();
            }
            Message::Close(frame) => {
                info!(station_id = station_id.as_str(), ?frame, "Close frame received");
                break;
            }
            Message::Binary(data) => {
                warn!(
                    station_id = station_id.as_str(),
                    bytes = data.len(),
                    "Binary frame ignored"
                );
            }
            Message::Frame(_) => {}
        }
    }

    // Teardown: fail pending calls, leave the registry (unless already
    // replaced), flag the station offline.
    session.mark_closed();
    let was_current = registry.unregister(&session);
    writer.abort();

    if was_current {
        if let Err(e) = services.stations.mark_offline(&station_id).await {
            warn!(station_id = station_id.as_str(), error = %e, "Failed to mark station offline");
        }
        events.publish(Event::StationDisconnected(StationDisconnectedEvent {
            station_id: station_id.clone(),
            reason: None,
            timestamp: Utc::now(),
        }));
    }

    info!(station_id = station_id.as_str(), "Disconnected");
    Ok(())
}

/// Classify one inbound frame and act on it.
async fn handle_frame(text: &str, session: &Arc<Session>, dispatcher: &Arc<InboundDispatcher>) {
    match OcppFrame::parse(text) {
        Ok(OcppFrame::Call {
            message_id,
            action,
            payload,
        }) => {
            let session = session.clone();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let reply = match dispatcher
                    .dispatch(session.station_id(), session.version(), &action, &payload)
                    .await
                {
                    Ok(response) => OcppFrame::result_response(message_id, response),
                    Err(CallFault { code, description }) => {
                        OcppFrame::error_response(message_id, code, description)
                    }
                };
                if let Err(e) = session.enqueue_frame(&reply).await {
                    debug!(
                        station_id = session.station_id(),
                        error = %e,
                        "Could not write reply, connection gone"
                    );
                }
            });
        }
        Ok(OcppFrame::CallResult {
            message_id,
            payload,
        }) => {
            session.complete_call(&message_id, Ok(payload));
        }
        Ok(OcppFrame::CallError {
            message_id,
            error_code,
            error_description,
            ..
        }) => {
            session.complete_call(
                &message_id,
                Err(CallFailure::CallError {
                    code: error_code,
                    description: error_description,
                }),
            );
        }
        Err(e) => match e.message_id() {
            Some(message_id) => {
                warn!(
                    station_id = session.station_id(),
                    error = %e,
                    "Malformed frame, replying FormationViolation"
                );
                let reply = OcppFrame::error_response(
                    message_id,
                    OcppErrorCode::FormationViolation,
                    e.to_string(),
                );
                let _ = session.enqueue_frame(&reply).await;
            }
            None => {
                warn!(
                    station_id = session.station_id(),
                    error = %e,
                    raw = text,
                    "Unparsable frame dropped"
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_station_id() {
        assert_eq!(extract_station_id("/CP-001"), Some("CP-001".to_string()));
    }

    #[test]
    fn extracts_last_segment() {
        assert_eq!(
            extract_station_id("/ocpp/CP-001"),
            Some("CP-001".to_string())
        );
    }

    #[test]
    fn percent_decodes_station_id() {
        assert_eq!(
            extract_station_id("/CP%20001"),
            Some("CP 001".to_string())
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        assert_eq!(extract_station_id("/"), None);
        assert_eq!(extract_station_id("///"), None);
        assert_eq!(extract_station_id(""), None);
    }

    #[test]
    fn whitespace_only_id_is_rejected() {
        assert_eq!(extract_station_id("/%20%20"), None);
    }

    // ── Live-socket tests ──────────────────────────────────────

    use crate::dispatch::InboundDispatcher;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use serde_json::json;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    async fn spawn_server() -> (SocketAddr, Arc<InMemoryRepositoryProvider>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let events = EventBus::new();
        let services = Services::new(repos.clone(), events.clone(), 300);
        let dispatcher = Arc::new(InboundDispatcher::new(services.clone(), events.clone()));
        let registry = ConnectionRegistry::shared();

        let server = OcppServer::new(
            AppConfig::default(),
            registry,
            dispatcher,
            services,
            events,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        (addr, repos)
    }

    fn client_request(addr: SocketAddr, path: &str, subprotocol: Option<&str>) -> Request {
        let mut request = format!("ws://{}{}", addr, path)
            .into_client_request()
            .unwrap();
        if let Some(proto) = subprotocol {
            request
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", proto.parse().unwrap());
        }
        request
    }

    #[tokio::test]
    async fn handshake_without_matching_subprotocol_is_rejected() {
        let (addr, _repos) = spawn_server().await;

        let result =
            tokio_tungstenite::connect_async(client_request(addr, "/CP-400", None)).await;
        assert!(result.is_err());

        let result = tokio_tungstenite::connect_async(client_request(
            addr,
            "/CP-400",
            Some("ocpp2.1"),
        ))
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn handshake_without_station_id_is_rejected() {
        let (addr, _repos) = spawn_server().await;
        let result = tokio_tungstenite::connect_async(client_request(addr, "/", Some("ocpp1.6")))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn boot_over_live_socket_creates_station() {
        use crate::domain::{RepositoryProvider, StationStatus};

        let (addr, repos) = spawn_server().await;

        let (mut ws, response) = tokio_tungstenite::connect_async(client_request(
            addr,
            "/CP-001",
            Some("ocpp1.6"),
        ))
        .await
        .unwrap();

        // The selected subprotocol is echoed back.
        assert_eq!(
            response
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok()),
            Some("ocpp1.6")
        );

        ws.send(Message::Text(
            json!([2, "m1", "BootNotification",
                {"chargePointVendor": "V", "chargePointModel": "M"}])
            .to_string(),
        ))
        .await
        .unwrap();

        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break text,
                _ => continue,
            }
        };
        let frame = OcppFrame::parse(&reply).unwrap();
        match frame {
            OcppFrame::CallResult {
                message_id,
                payload,
            } => {
                assert_eq!(message_id, "m1");
                assert_eq!(payload["status"], "Accepted");
                assert_eq!(payload["interval"], 300);
            }
            other => panic!("expected CallResult, got {:?}", other),
        }

        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Online);
    }

    #[tokio::test]
    async fn malformed_frame_with_readable_id_gets_formation_violation() {
        let (addr, _repos) = spawn_server().await;

        let (mut ws, _) = tokio_tungstenite::connect_async(client_request(
            addr,
            "/CP-002",
            Some("ocpp1.6"),
        ))
        .await
        .unwrap();

        // Unknown message type 5, but the messageId is readable.
        ws.send(Message::Text(r#"[5,"m9","Nope",{}]"#.to_string()))
            .await
            .unwrap();

        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break text,
                _ => continue,
            }
        };
        match OcppFrame::parse(&reply).unwrap() {
            OcppFrame::CallError {
                message_id,
                error_code,
                ..
            } => {
                assert_eq!(message_id, "m9");
                assert_eq!(error_code, "FormationViolation");
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }
}
