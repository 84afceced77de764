use super::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_response() -> serde_json::Value {
    json!({
        "statistics": {
            "word_count": 6, "unique_word_count": 5, "sentence_count": 2,
            "character_count": 21, "avg_words_per_sentence": 3.0, "avg_word_length": 3.0,
            "content_word_count": 4, "stopword_count": 2
        },
        "top_words": [{"word": "cat", "count": 1}],
        "sentences": ["The cat sat.", "The dog ran."],
        "word_dictionary": {
            "the": {"count": 2, "frequency": 0.3333, "is_stopword": true},
            "cat": {"count": 1, "frequency": 0.1667, "is_stopword": false, "embedding": [1.0, 0.0], "embedding_dim": 2},
            "sat": {"count": 1, "frequency": 0.1667, "is_stopword": false},
            "dog": {"count": 1, "frequency": 0.1667, "is_stopword": false, "embedding": [0.9, 0.1], "embedding_dim": 2},
            "ran": {"count": 1, "frequency": 0.1667, "is_stopword": false}
        },
        "cached": false,
        "cache_key": "0123abcd"
    })
}

fn client_for(server: &MockServer) -> AnalysisClient {
    let config = ServiceConfig {
        host: "127.0.0.1".to_string(),
        port: server.address().port(),
        timeout_seconds: 5,
        ..ServiceConfig::default()
    };
    AnalysisClient::new(&config).expect("client should build")
}

#[test]
fn client_configuration() {
    let config = ServiceConfig {
        protocol: "https".to_string(),
        host: "analysis.example.com".to_string(),
        port: 8443,
        include_embeddings: false,
        timeout_seconds: 10,
    };
    let client = AnalysisClient::new(&config).expect("client should build");

    assert_eq!(client.base_url().host_str(), Some("analysis.example.com"));
    assert_eq!(client.base_url().port(), Some(8443));
    assert!(!client.options().include_embeddings);
    assert!(client.with_embeddings(true).options().include_embeddings);
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = ServiceConfig {
        protocol: "ftp".to_string(),
        ..ServiceConfig::default()
    };
    assert!(AnalysisClient::new(&config).is_err());
}

#[test]
fn empty_text_is_rejected_locally() {
    let client = AnalysisClient::new(&ServiceConfig::default()).expect("client should build");
    let error = client
        .analyze_text("  \n\t ")
        .expect_err("blank text must be rejected");
    assert_eq!(error.to_string(), "Text cannot be empty");
}

#[test]
fn oversized_text_is_rejected_locally() {
    let client = AnalysisClient::new(&ServiceConfig::default()).expect("client should build");
    let text = "a".repeat(MAX_TEXT_BYTES + 1);
    assert!(matches!(
        client.analyze_text(&text),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn file_extension_is_checked() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("book.pdf");
    fs::write(&path, "text").expect("should write file");

    let error = load_text_file(&path).expect_err("pdf is not accepted");
    assert!(error.to_string().starts_with("File type not allowed"));

    let path = temp_dir.path().join("notes.MD");
    fs::write(&path, "# Notes").expect("should write file");
    assert_eq!(load_text_file(&path).expect("md is accepted"), "# Notes");
}

#[test]
fn file_must_be_utf8() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("latin1.txt");
    fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).expect("should write file");

    let error = load_text_file(&path).expect_err("invalid UTF-8 is rejected");
    assert_eq!(error.to_string(), "File must be valid UTF-8 text");
}

#[tokio::test]
async fn analyze_text_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process"))
        .and(body_json(json!({
            "text": "The cat sat. The dog ran.",
            "options": {"include_embeddings": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.analyze_text("The cat sat. The dog ran."))
        .await
        .expect("blocking task should complete")
        .expect("analysis should succeed");

    assert_eq!(result.sentences.len(), 2);
    assert_eq!(result.word_dictionary.len(), 5);
    assert_eq!(result.cache_key.as_deref(), Some("0123abcd"));
    let words: Vec<&str> = result.word_dictionary.iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["the", "cat", "sat", "dog", "ran"]);
}

#[tokio::test]
async fn service_error_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "Failed to process text: model not loaded"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = tokio::task::spawn_blocking(move || client.analyze_text("Some text."))
        .await
        .expect("blocking task should complete")
        .expect_err("a 500 must be an error");

    assert_eq!(error.to_string(), "Failed to process text: model not loaded");
    assert!(matches!(error, ServiceError::Rejected { status: 500, .. }));
}

#[tokio::test]
async fn non_json_error_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = tokio::task::spawn_blocking(move || client.analyze_text("Some text."))
        .await
        .expect("blocking task should complete")
        .expect_err("a 502 must be an error");

    assert_eq!(error.to_string(), "HTTP error 502");
}

#[tokio::test]
async fn truncated_response_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"sentences": ["The cat"#, "application/json"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.analyze_text("Some text."))
        .await
        .expect("blocking task should complete");

    assert!(matches!(result, Err(ServiceError::InvalidResponse(_))));
}

#[tokio::test]
async fn analyze_file_uploads_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process/file"))
        .and(header_regex(
            "content-type",
            "^multipart/form-data; boundary=wordlens-form-boundary$",
        ))
        .and(body_string_contains(
            "Content-Disposition: form-data; name=\"file\"; filename=\"chapter1.txt\"",
        ))
        .and(body_string_contains(
            "name=\"options\"\r\n\r\n{\"include_embeddings\":true}\r\n",
        ))
        .and(body_string_contains("\r\n\r\nThe cat sat. The dog ran.\r\n"))
        .and(body_string_contains("--wordlens-form-boundary--\r\n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let file_path = temp_dir.path().join("chapter1.txt");
    fs::write(&file_path, "The cat sat. The dog ran.").expect("should write file");

    let client = client_for(&server);
    let analyzed = tokio::task::spawn_blocking(move || client.analyze_file(&file_path))
        .await
        .expect("blocking task should complete")
        .expect("file analysis should succeed");

    assert_eq!(analyzed.text, "The cat sat. The dog ran.");
    assert_eq!(analyzed.result.filename.as_deref(), Some("chapter1.txt"));
}

#[tokio::test]
async fn health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "cache_size": 2,
            "word2vec_loaded": true,
            "timestamp": "2024-05-01T12:34:56.789012"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let health = tokio::task::spawn_blocking(move || client.health())
        .await
        .expect("blocking task should complete")
        .expect("health should succeed");

    assert!(health.is_ok());
    assert_eq!(health.cache_size, 2);
}

#[tokio::test]
async fn embeddings_flag_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process"))
        .and(body_json(json!({
            "text": "Plain words.",
            "options": {"include_embeddings": false}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_embeddings(false);
    let result = tokio::task::spawn_blocking(move || client.analyze_text("Plain words."))
        .await
        .expect("blocking task should complete");

    assert!(result.is_ok());
}

#[tokio::test]
async fn file_name_from_service_is_kept() {
    let mut response = sample_response();
    response["filename"] = json!("chapter_1.txt");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process/file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let file_path = temp_dir.path().join("chapter 1.txt");
    fs::write(&file_path, "The cat sat. The dog ran.").expect("should write file");

    let client = client_for(&server);
    let analyzed = tokio::task::spawn_blocking(move || client.analyze_file(&file_path))
        .await
        .expect("blocking task should complete")
        .expect("file analysis should succeed");

    assert_eq!(analyzed.result.filename.as_deref(), Some("chapter_1.txt"));
}

#[test]
fn multipart_boundary_avoids_content() {
    let form = MultipartForm::new("text mentioning wordlens-form-boundary inline");
    assert_eq!(
        form.content_type(),
        "multipart/form-data; boundary=wordlens-form-boundary-1"
    );

    let body = form.field("options", "{}").finish();
    assert!(body.starts_with("--wordlens-form-boundary-1\r\n"));
    assert!(body.ends_with("--wordlens-form-boundary-1--\r\n"));
}

#[tokio::test]
async fn word_info_with_embedding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/word/whale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "word": "whale",
            "embedding": [0.25, 0.5, 0.75],
            "embedding_dim": 3,
            "embedding_available": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let lookup = tokio::task::spawn_blocking(move || client.word_info("whale"))
        .await
        .expect("blocking task should complete")
        .expect("lookup should succeed");

    assert!(lookup.has_embedding());
    let metadata = lookup.into_metadata();
    assert_eq!(metadata.dimension(), Some(3));
    assert_eq!(metadata.count, 0);
    assert!(!metadata.is_stopword);
}

#[tokio::test]
async fn word_info_without_embedding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/word/zyzzyva"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "word": "zyzzyva",
            "embedding_available": false,
            "message": "No embedding found for this word"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let lookup = tokio::task::spawn_blocking(move || client.word_info("zyzzyva"))
        .await
        .expect("blocking task should complete")
        .expect("lookup should succeed");

    assert!(!lookup.has_embedding());
    assert_eq!(
        lookup.message.as_deref(),
        Some("No embedding found for this word")
    );
    assert!(!lookup.into_metadata().has_embedding());
}

#[test]
fn word_info_requires_a_word() {
    let client = AnalysisClient::new(&ServiceConfig::default()).expect("client should build");
    assert!(matches!(
        client.word_info("   "),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn word_similarity_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/similarity"))
        .and(body_json(json!({"word1": "cat", "word2": "dog"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "word1": "cat",
            "word2": "dog",
            "similarity": 0.76
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let similarity = tokio::task::spawn_blocking(move || client.word_similarity(" Cat", "DOG"))
        .await
        .expect("blocking task should complete")
        .expect("similarity should succeed");

    assert_eq!(similarity.word1, "cat");
    assert!((similarity.similarity - 0.76).abs() < f64::EPSILON);
}

#[tokio::test]
async fn word_similarity_unknown_word_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/similarity"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "Word not in vocabulary: 'qwxz'"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = tokio::task::spawn_blocking(move || client.word_similarity("cat", "qwxz"))
        .await
        .expect("blocking task should complete")
        .expect_err("unknown word must fail");

    assert_eq!(error.to_string(), "Word not in vocabulary: 'qwxz'");
    assert!(matches!(error, ServiceError::Rejected { status: 404, .. }));
}

#[test]
fn word_similarity_requires_both_words() {
    let client = AnalysisClient::new(&ServiceConfig::default()).expect("client should build");
    let error = client
        .word_similarity("cat", "")
        .expect_err("missing word must be rejected");
    assert_eq!(error.to_string(), "Both word1 and word2 are required");
}

#[tokio::test]
async fn cached_result_is_fetched_by_key() {
    let mut cached = sample_response();
    if let Some(body) = cached.as_object_mut() {
        body.remove("cache_key");
        body.remove("cached");
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cached/0123abcd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cached))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.cached_result("0123abcd"))
        .await
        .expect("blocking task should complete")
        .expect("cached result should load");

    assert_eq!(result.cache_key.as_deref(), Some("0123abcd"));
    assert_eq!(result.word_dictionary.len(), 5);
}

#[tokio::test]
async fn expired_cache_entry_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cached/feedbeef"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "Cache entry not found or expired"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = tokio::task::spawn_blocking(move || client.cached_result("feedbeef"))
        .await
        .expect("blocking task should complete")
        .expect_err("missing entry must fail");

    assert_eq!(error.to_string(), "Cache entry not found or expired");
}

#[tokio::test]
async fn delete_cached_entry() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/cached/0123abcd"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Cache entry deleted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message = tokio::task::spawn_blocking(move || client.delete_cached("0123abcd"))
        .await
        .expect("blocking task should complete")
        .expect("delete should succeed");

    assert_eq!(message, "Cache entry deleted");
}

#[test]
fn cache_key_is_required() {
    let client = AnalysisClient::new(&ServiceConfig::default()).expect("client should build");
    assert!(matches!(
        client.cached_result(""),
        Err(ServiceError::InvalidInput(_))
    ));
}
