use super::*;

const SAMPLE_RESPONSE: &str = r#"{
    "statistics": {
        "word_count": 6,
        "unique_word_count": 5,
        "sentence_count": 2,
        "character_count": 21,
        "avg_words_per_sentence": 3.0,
        "avg_word_length": 3.0,
        "content_word_count": 4,
        "stopword_count": 2
    },
    "top_words": [{"word": "cat", "count": 1}, {"word": "sat", "count": 1}],
    "sentences": ["The cat sat.", "The dog ran."],
    "word_dictionary": {
        "the": {"count": 2, "frequency": 0.3333, "is_stopword": true, "embedding": [0.1, 0.2], "embedding_dim": 2},
        "cat": {"count": 1, "frequency": 0.1667, "is_stopword": false, "embedding": [0.9, 0.1], "embedding_dim": 2},
        "sat": {"count": 1, "frequency": 0.1667, "is_stopword": false, "embedding": null, "embedding_available": false},
        "dog": {"count": 1, "frequency": 0.1667, "is_stopword": false, "embedding": [0.8, 0.3], "embedding_dim": 2},
        "ran": {"count": 1, "frequency": 0.1667, "is_stopword": false}
    },
    "words_neighbors": {
        "cat": [{"word": "dog", "distance": 0.05}]
    },
    "document_embedding": [0.85, 0.2],
    "embedding_coverage": 0.5,
    "cached": false,
    "cache_key": "abc123"
}"#;

fn metadata(count: u64, is_stopword: bool, embedding: Option<Vec<f32>>) -> WordMetadata {
    WordMetadata {
        count,
        frequency: 0.0,
        is_stopword,
        embedding,
        embedding_dim: None,
    }
}

#[test]
fn parse_full_response() {
    let result: AnalysisResult =
        serde_json::from_str(SAMPLE_RESPONSE).expect("sample response should parse");

    assert_eq!(result.sentences, vec!["The cat sat.", "The dog ran."]);
    assert_eq!(result.statistics.word_count, 6);
    assert_eq!(result.statistics.character_count, Some(21));
    assert_eq!(result.top_words.len(), 2);
    assert_eq!(result.embedding_coverage, Some(0.5));
    assert_eq!(result.cached, Some(false));
    assert_eq!(result.cache_key.as_deref(), Some("abc123"));
    assert_eq!(result.filename, None);
    assert_eq!(result.words_neighbors["cat"][0].word, "dog");

    let table = &result.word_dictionary;
    assert_eq!(table.len(), 5);
    let the = table.get("the").expect("the is present");
    assert!(the.is_stopword);
    assert_eq!(the.embedding(), Some(&[0.1_f32, 0.2][..]));
    assert_eq!(the.dimension(), Some(2));

    let sat = table.get("sat").expect("sat is present");
    assert!(!sat.has_embedding());
    assert_eq!(sat.dimension(), None);
    assert!(!table.get("ran").expect("ran is present").has_embedding());
}

#[test]
fn dictionary_keeps_service_order() {
    let result: AnalysisResult =
        serde_json::from_str(SAMPLE_RESPONSE).expect("sample response should parse");

    let words: Vec<&str> = result.word_dictionary.iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["the", "cat", "sat", "dog", "ran"]);

    let json = r#"{"zebra": {"count": 1, "frequency": 0.5, "is_stopword": false},
                   "apple": {"count": 1, "frequency": 0.5, "is_stopword": false}}"#;
    let table: MetadataTable = serde_json::from_str(json).expect("table should parse");
    let words: Vec<&str> = table.iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["zebra", "apple"]);

    let reserialized = serde_json::to_string(&table).expect("table should serialize");
    assert!(
        reserialized.find("zebra") < reserialized.find("apple"),
        "order lost in {}",
        reserialized
    );
}

#[test]
fn optional_fields_default() {
    let json = r#"{
        "sentences": [],
        "word_dictionary": {},
        "statistics": {
            "word_count": 0, "unique_word_count": 0, "sentence_count": 0,
            "avg_words_per_sentence": 0, "avg_word_length": 0,
            "content_word_count": 0, "stopword_count": 0
        },
        "top_words": []
    }"#;
    let result: AnalysisResult = serde_json::from_str(json).expect("minimal response parses");

    assert!(result.word_dictionary.is_empty());
    assert_eq!(result.document_embedding, None);
    assert_eq!(result.embedding_coverage, None);
    assert!(result.words_neighbors.is_empty());
    assert_eq!(result.statistics.character_count, None);
}

#[test]
fn missing_required_field_is_rejected() {
    let json = r#"{"sentences": [], "word_dictionary": {}, "top_words": []}"#;
    assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
}

#[test]
fn error_response_parses() {
    let error: ErrorResponse =
        serde_json::from_str(r#"{"error": "Text cannot be empty"}"#).expect("error parses");
    assert_eq!(error.error, "Text cannot be empty");
}

#[test]
fn health_status_parses_python_timestamp() {
    let json = r#"{"status": "ok", "cache_size": 3, "word2vec_loaded": true,
                   "timestamp": "2024-05-01T12:34:56.789012"}"#;
    let health: HealthStatus = serde_json::from_str(json).expect("health parses");

    assert!(health.is_ok());
    assert_eq!(health.cache_size, 3);
    assert!(health.word2vec_loaded);
    assert_eq!(health.timestamp.date().to_string(), "2024-05-01");
}

#[test]
fn table_insert_replaces_in_place() {
    let mut table = MetadataTable::new();
    table.insert("alpha", metadata(1, false, None));
    table.insert("beta", metadata(2, false, None));
    table.insert("alpha", metadata(7, true, Some(vec![1.0])));

    let words: Vec<&str> = table.iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["alpha", "beta"]);
    assert_eq!(table.get("alpha").map(|m| m.count), Some(7));
    assert!(table.contains("beta"));
    assert!(!table.contains("gamma"));
}

#[test]
fn empty_embedding_counts_as_absent() {
    let meta = metadata(1, false, Some(Vec::new()));
    assert!(!meta.has_embedding());
    assert_eq!(meta.embedding(), None);
}

#[test]
fn request_serialization() {
    let request = AnalysisRequest {
        text: "Hello".to_string(),
        options: AnalysisOptions {
            include_embeddings: false,
        },
    };
    let value = serde_json::to_value(&request).expect("request serializes");
    assert_eq!(
        value,
        serde_json::json!({"text": "Hello", "options": {"include_embeddings": false}})
    );
}
