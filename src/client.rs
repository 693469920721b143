use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, trace};

use crate::model::{DemoUser, Event, Notification};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend answered with {0}")]
    Status(StatusCode),
    #[error("malformed notification list: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Thin client for the two backend endpoints the console talks to.
#[derive(Debug, Clone)]
pub struct Backend {
    http: reqwest::Client,
    base: Url,
}

impl Backend {
    pub fn new(base: Url) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET /notifications/{target}`.
    ///
    /// Any body that is not a JSON array is treated as an empty list.
    pub async fn fetch_notifications(
        &self,
        target: DemoUser,
    ) -> Result<Vec<Notification>, Error> {
        let url = self.base.join(&format!("notifications/{}", target.id()))?;
        trace!(%url, "Fetching notifications");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body: Value = serde_json::from_slice(&response.bytes().await?)?;
        match body {
            Value::Array(_) => Ok(serde_json::from_value(body)?),
            other => {
                debug!(body = %other, "Notification feed is not a list");
                Ok(Vec::new())
            }
        }
    }

    /// `POST /events`. The response body is not examined.
    pub async fn submit_event(&self, event: &Event) -> Result<(), Error> {
        let url = self.base.join("events")?;

        let response = self.http.post(url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::model::EventType;

    fn backend(server: &Server) -> Backend {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        Backend::new(base).unwrap()
    }

    #[tokio::test]
    async fn fetch_returns_list_in_backend_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/notifications/user2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "notificationId": "b",
                        "type": "like",
                        "content": "x",
                        "timestamp": "2024-01-01T00:00:00Z",
                    },
                    {
                        "notificationId": "a",
                        "type": "follow",
                        "content": "y",
                        "timestamp": "2024-01-02T00:00:00Z",
                    },
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let notifications =
            backend(&server).fetch_notifications(DemoUser::Bob).await.unwrap();

        mock.assert_async().await;
        let ids: Vec<_> =
            notifications.iter().map(|n| n.notification_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn non_list_bodies_are_empty() {
        let mut server = Server::new_async().await;
        let backend = backend(&server);

        for body in [
            json!({ "error": "user not found" }),
            json!(null),
            json!("nothing here"),
            json!(7),
        ] {
            let mock = server
                .mock("GET", "/notifications/user1")
                .with_status(200)
                .with_body(body.to_string())
                .create_async()
                .await;

            let notifications =
                backend.fetch_notifications(DemoUser::Alice).await.unwrap();
            assert!(notifications.is_empty(), "body {body} was not empty");

            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn null_fields_do_not_drop_the_feed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/notifications/user2")
            .with_status(200)
            .with_body(
                json!([
                    {
                        "notificationId": "a",
                        "type": "like",
                        "content": "Alice liked your post",
                        "timestamp": "2024-01-01T00:00:00Z",
                    },
                    {
                        "notificationId": "b",
                        "type": null,
                        "content": null,
                        "timestamp": "2024-01-01T08:30:00",
                    },
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let notifications =
            backend(&server).fetch_notifications(DemoUser::Bob).await.unwrap();

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].kind, "like");
        assert_eq!(notifications[1].notification_id, "b");
        assert_eq!(notifications[1].kind, "");
        assert_eq!(notifications[1].content, "");
        assert!(notifications[1].timestamp.is_some());
    }

    #[tokio::test]
    async fn fetch_fails_on_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/notifications/user2")
            .with_status(500)
            .with_body("[]")
            .create_async()
            .await;

        let result = backend(&server).fetch_notifications(DemoUser::Bob).await;
        assert!(matches!(
            result,
            Err(Error::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test]
    async fn fetch_fails_on_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/notifications/user2")
            .with_status(200)
            .with_body("[{\"notificationId\": ")
            .create_async()
            .await;

        let result = backend(&server).fetch_notifications(DemoUser::Bob).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn fetch_respects_base_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/notifications/user1")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let base = Url::parse(&format!("{}/api/", server.url())).unwrap();
        let backend = Backend::new(base).unwrap();
        backend.fetch_notifications(DemoUser::Alice).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_posts_event_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "type": "comment",
                "sourceUserId": "user2",
                "targetUserId": "user1",
                "data": { "sourceUsername": "Bob" },
            })))
            .with_status(201)
            .with_body("{\"ok\":true}")
            .create_async()
            .await;

        let event =
            Event::new(EventType::Comment, DemoUser::Bob, DemoUser::Alice);
        backend(&server).submit_event(&event).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_fails_on_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/events")
            .with_status(503)
            .create_async()
            .await;

        let event = Event::new(EventType::Like, DemoUser::Alice, DemoUser::Bob);
        let result = backend(&server).submit_event(&event).await;

        assert!(matches!(
            result,
            Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_request_error() {
        // Nothing listens on port 9 on the loopback interface.
        let backend =
            Backend::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();

        let result = backend.fetch_notifications(DemoUser::Alice).await;
        assert!(matches!(result, Err(Error::Request(_))));
    }
}
