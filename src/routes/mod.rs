pub mod api_routes;
pub mod chat_routes;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::api_routes::{health_handler, new_session_handler};
use crate::routes::chat_routes::chat_handler;
use crate::service::chat_service::ChatService;

pub fn router(chat_service: ChatService) -> Router {
    Router::new()
        .route("/chat", get(chat_handler))
        .route("/session", get(new_session_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(chat_service)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::agent::testing::ScriptedRunner;
    use crate::models::{Message, SessionResponse};
    use crate::store::session_store::SessionStore;

    /// Serves the router on an ephemeral port and returns its base URL.
    async fn serve(svc: ChatService) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(svc)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn data_payloads(body: &str) -> Vec<&str> {
        body.split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data:"))
            .map(|payload| payload.strip_prefix(' ').unwrap_or(payload))
            .collect()
    }

    #[tokio::test]
    async fn chat_streams_frames_and_commits_history() {
        let runner = ScriptedRunner::answering(&["Hi", " there\n", "friend"]);
        let svc = ChatService::new(SessionStore::new(), runner.clone(), "<br>");
        let base = serve(svc.clone()).await;

        let resp = reqwest::get(format!("{base}/chat?msg=hello&session=abc123")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "text/event-stream; charset=utf-8"
        );
        assert_eq!(resp.headers()["cache-control"].to_str().unwrap(), "no-cache");
        let body = resp.text().await.unwrap();

        assert!(body.ends_with("data: [DONE]\n\n"), "unexpected body {body:?}");
        assert_eq!(data_payloads(&body), vec!["Hi", " there<br>", "friend", "[DONE]"]);
        assert_eq!(
            svc.sessions().load("abc123").await.unwrap(),
            vec![Message::user("hello"), Message::assistant("Hi there\nfriend")]
        );

        reqwest::get(format!("{base}/chat?msg=again&session=abc123"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(runner.transcripts()[1].len(), 3);
        assert_eq!(svc.sessions().load("abc123").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn chat_without_session_is_stateless() {
        let svc = ChatService::new(SessionStore::new(), ScriptedRunner::answering(&["ok"]), "<br>");
        let base = serve(svc.clone()).await;

        let body = reqwest::get(format!("{base}/chat?msg=one%20shot"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(data_payloads(&body), vec!["ok", "[DONE]"]);
        assert_eq!(svc.sessions().len().await, 0);
    }

    #[tokio::test]
    async fn session_endpoint_issues_distinct_tokens() {
        let svc = ChatService::new(SessionStore::new(), ScriptedRunner::answering(&[]), "<br>");
        let base = serve(svc).await;

        let first: SessionResponse = reqwest::get(format!("{base}/session")).await.unwrap().json().await.unwrap();
        let second: SessionResponse = reqwest::get(format!("{base}/session")).await.unwrap().json().await.unwrap();

        assert_eq!(first.session.len(), 32);
        assert_ne!(first.session, second.session);
    }
}
