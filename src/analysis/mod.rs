// Analysis service boundary
// The response shape consumed by the engine and the HTTP client that fetches it

pub mod client;
pub mod model;

pub use client::{
    ALLOWED_EXTENSIONS, AnalysisClient, AnalyzedText, MAX_TEXT_BYTES, ServiceError, load_text_file,
};
pub use model::{
    AnalysisOptions, AnalysisRequest, AnalysisResult, HealthStatus, MetadataTable, Neighbor,
    SimilarityRequest, Statistics, TopWord, WordLookup, WordMetadata, WordSimilarity,
};
