//! Integration tests driving the chat controller over real HTTP.
//! A local mock server stands in for the question-answering service.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use qualle::chat::{ChatConfig, ChatController, TurnState, View};
    use qualle::tooltip::{Size, Tooltip};
    use qualle::{ChatClient, ChatTransport, Error, Message, Reference};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Drawn {
        messages: Vec<Message>,
        status: String,
        input_enabled: bool,
    }

    #[derive(Clone, Default)]
    struct SharedView(Arc<Mutex<Drawn>>);

    impl View for SharedView {
        fn append_message(&mut self, message: &Message) {
            self.0.lock().unwrap().messages.push(message.clone());
        }

        fn clear_messages(&mut self) {
            self.0.lock().unwrap().messages.clear();
        }

        fn set_status(&mut self, status: &str) {
            self.0.lock().unwrap().status = status.to_string();
        }

        fn set_input_text(&mut self, _: &str) {}

        fn set_input_enabled(&mut self, enabled: bool) {
            self.0.lock().unwrap().input_enabled = enabled;
        }

        fn set_send_enabled(&mut self, _: bool) {}

        fn viewport(&self) -> Size {
            Size::new(1280.0, 800.0)
        }

        fn measure_tooltip(&self, _: &Reference) -> Size {
            Size::new(500.0, 200.0)
        }

        fn show_tooltip(&mut self, _: &Tooltip) {}

        fn remove_tooltip(&mut self) {}
    }

    fn config() -> ChatConfig {
        ChatConfig::new().with_timeout(Duration::from_secs(5))
    }

    fn client(base_url: &str) -> ChatClient {
        ChatClient::with_options(Some(base_url), Some(Duration::from_secs(5)))
            .expect("Failed to create client")
    }

    #[tokio::test]
    async fn test_streamed_answer_over_http() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"status\":\"searching\",\"message\":\"Searching papers\"}\n",
            "{\"status\":\"generating\",\"message\":\"Writing answer\"}\n",
            "{\"status\":\"complete\",\"message\":\"<p>Open science helps.</p>\",",
            "\"metadata\":{\"sources\":\"Ref A; Ref B\"}}\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("content-type", "application/json"))
            .and(body_string_contains("\"message\":\"What is open science?\""))
            .and(body_string_contains("\"chat_id\""))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .expect(1)
            .mount(&server)
            .await;

        let view = SharedView::default();
        let mut controller = ChatController::new(client(&server.uri()), view.clone(), config());
        controller.set_input("What is open science?");
        let answer = controller.submit().await.expect("turn should succeed");

        assert_eq!(answer.content, "<p>Open science helps.</p>");
        assert_eq!(answer.sources.as_deref(), Some("Ref A; Ref B"));
        assert_eq!(controller.state(), TurnState::Done);

        let drawn = view.0.lock().unwrap();
        assert_eq!(drawn.messages.len(), 2);
        assert_eq!(drawn.messages[0], Message::user("What is open science?"));
        assert_eq!(drawn.status, "");
        assert!(drawn.input_enabled);
    }

    #[tokio::test]
    async fn test_session_id_is_stable_across_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"status\":\"complete\",\"message\":\"ok\"}\n",
                "application/x-ndjson",
            ))
            .expect(2)
            .mount(&server)
            .await;

        let mut controller =
            ChatController::new(client(&server.uri()), SharedView::default(), config());
        controller.send("first question").await.unwrap();
        controller.send("second question").await.unwrap();

        let session = controller.session_id().to_string();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        for request in requests {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["chat_id"], session.as_str());
        }
    }

    #[tokio::test]
    async fn test_server_error_fails_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("{\"message\":\"index unavailable\"}"),
            )
            .mount(&server)
            .await;

        let view = SharedView::default();
        let mut controller = ChatController::new(client(&server.uri()), view.clone(), config());
        let err = controller.send("Why share data?").await.unwrap_err();

        assert!(matches!(err, Error::InternalServer { ref message } if message == "index unavailable"));
        assert_eq!(controller.state(), TurnState::Failed);
        let drawn = view.0.lock().unwrap();
        assert_eq!(drawn.messages, vec![Message::user("Why share data?")]);
        assert_eq!(drawn.status, "Error: Failed to get response");
        assert!(drawn.input_enabled);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such route"))
            .mount(&server)
            .await;

        let result = client(&server.uri())
            .open(&qualle::ChatRequest::new("hello", qualle::SessionId::new()))
            .await;
        assert!(matches!(result, Err(Error::NotFound { ref message }) if message == "no such route"));
    }

    #[tokio::test]
    async fn test_refused_connection_keeps_user_message() {
        let view = SharedView::default();
        let mut controller =
            ChatController::new(client("http://127.0.0.1:1/"), view.clone(), config());
        controller.set_input("Is anyone there?");
        let err = controller.submit().await.unwrap_err();

        assert!(err.is_connection(), "unexpected error: {err}");
        assert_eq!(controller.state(), TurnState::Failed);
        let drawn = view.0.lock().unwrap();
        assert_eq!(drawn.messages, vec![Message::user("Is anyone there?")]);
        assert_eq!(drawn.status, "Error: Failed to get response");
        assert!(drawn.input_enabled);
    }
}
