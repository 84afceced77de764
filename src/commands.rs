use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::analysis::{AnalysisClient, AnalyzedText, ServiceError, load_text_file};
use crate::config::Config;
use crate::document::{Document, ParagraphView, Workspace};
use crate::highlight::{HighlightClass, HighlightMode};
use crate::inspector::Inspector;
use crate::text::{Position, WordToken};

/// Check that the analysis service is up
#[inline]
pub async fn check_health() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let client = AnalysisClient::new(&config.service)?;

    println!("🩺 Analysis service: {}", client.base_url());
    let health = tokio::task::spawn_blocking(move || client.health())
        .await
        .context("Health check task failed")?;

    match health {
        Ok(health) => {
            let marker = if health.is_ok() { "✅" } else { "⚠️ " };
            println!("   {} Status: {}", marker, health.status);
            println!("   Cache entries: {}", health.cache_size);
            println!(
                "   Word embeddings: {}",
                if health.word2vec_loaded {
                    "loaded"
                } else {
                    "not loaded"
                }
            );
            println!(
                "   Reported at: {}",
                health.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Err(e) => {
            println!("   ❌ Unreachable: {}", e);
            println!("Make sure the analysis service is running, or run 'wordlens config'.");
        }
    }

    Ok(())
}

/// Analyze a file and print document and paragraph statistics
#[inline]
pub async fn analyze_file(path: PathBuf, include_embeddings: bool) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let analyzed = fetch_analysis(&config, path, include_embeddings).await?;

    let mut workspace = Workspace::new();
    workspace.apply(&analyzed.text, Ok(analyzed.result))?;
    let document = workspace
        .document()
        .context("Analysis produced no document")?;

    print_report(document);
    Ok(())
}

/// Rebuild a document from an analysis the service still caches.
///
/// The cache holds only the analysis, so the text comes from `path`.
#[inline]
pub async fn show_cached_analysis(cache_key: &str, path: PathBuf) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let text = load_text_file(&path)?;

    let key = cache_key.to_string();
    let mut result = with_client(&config, move |client| client.cached_result(&key)).await?;
    if result.filename.is_none() {
        result.filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }

    let mut workspace = Workspace::new();
    workspace.apply(&text, Ok(result))?;
    let document = workspace
        .document()
        .context("Cached analysis produced no document")?;

    let mismatched = document.vocabulary_mismatch().len();
    if mismatched > 0 && mismatched == document.index().len() {
        println!(
            "{} None of the words in {} appear in the cached analysis; is it the same text?",
            style("⚠").yellow(),
            path.display()
        );
    }
    print_report(document);
    Ok(())
}

/// Drop a cached analysis from the service
#[inline]
pub async fn delete_cached_analysis(cache_key: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let key = cache_key.to_string();
    let message = with_client(&config, move |client| client.delete_cached(&key)).await?;
    println!("🗑  {} ({})", message, cache_key);
    Ok(())
}

/// Ask the service for the embedding of a single word
#[inline]
pub async fn lookup_word(word: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let query = word.to_string();
    let lookup = with_client(&config, move |client| client.word_info(&query)).await?;

    match lookup.embedding.as_deref().filter(|e| !e.is_empty()) {
        Some(embedding) => {
            let preview: Vec<String> = embedding
                .iter()
                .take(5)
                .map(|value| format!("{value:.4}"))
                .collect();
            println!(
                "🔤 {} has a {}-dimensional embedding",
                style(&lookup.word).bold(),
                lookup.embedding_dim.unwrap_or(embedding.len())
            );
            println!(
                "   [{}{}]",
                preview.join(", "),
                if embedding.len() > 5 { ", …" } else { "" }
            );
        }
        None => println!(
            "🔤 {}: {}",
            style(&lookup.word).bold(),
            lookup
                .message
                .as_deref()
                .unwrap_or("No embedding found for this word")
        ),
    }
    Ok(())
}

/// Ask the service how similar two words are
#[inline]
pub async fn compare_words(word1: &str, word2: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let (first, second) = (word1.to_string(), word2.to_string());
    let similarity =
        with_client(&config, move |client| client.word_similarity(&first, &second)).await?;

    println!(
        "{} ↔ {}: {:.4}",
        style(&similarity.word1).bold(),
        style(&similarity.word2).bold(),
        similarity.similarity
    );
    Ok(())
}

/// Analyze a file and list the words most similar to `word`
#[inline]
pub async fn find_similar(path: PathBuf, word: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let analyzed = fetch_analysis(&config, path, true).await?;
    let document = Document::new(analyzed.text, analyzed.result);

    let Some(target) = WordToken::normalize(word) else {
        println!("'{}' contains no letters to look up.", word);
        return Ok(());
    };
    let ranker = document.similarity_ranker(config.highlight.similar_words);
    let similar = match document.metadata(target.as_str()) {
        Some(metadata) if metadata.has_embedding() => {
            println!(
                "🔎 {} (count {}, frequency {:.4}{})",
                style(&target).bold(),
                metadata.count,
                metadata.frequency,
                if metadata.is_stopword {
                    ", stopword"
                } else {
                    ""
                }
            );
            ranker.rank(target.as_str())
        }
        known => {
            println!(
                "'{}' {}; asking the analysis service for its embedding.",
                target,
                if known.is_some() {
                    "has no embedding in this analysis"
                } else {
                    "does not appear in the analyzed vocabulary"
                }
            );
            let query = target.as_str().to_string();
            let lookup = with_client(&config, move |client| client.word_info(&query)).await?;
            let metadata = lookup.into_metadata();
            let Some(embedding) = metadata.embedding() else {
                println!("'{}' has no embedding, nothing to compare against.", target);
                return Ok(());
            };
            println!("🔎 {} (outside this text)", style(&target).bold());
            ranker.rank_embedding(target.as_str(), embedding)
        }
    };

    if similar.is_empty() {
        println!("No comparable words found.");
    }
    for (rank, candidate) in similar.iter().enumerate() {
        println!(
            "   {}. {:<20} {:>10.4}",
            rank + 1,
            candidate.word,
            candidate.score
        );
    }

    let neighbors = document.server_neighbors(target.as_str());
    if !neighbors.is_empty() {
        println!();
        println!("Service nearest neighbours:");
        for neighbor in neighbors {
            println!("   {:<20} {:>10.4}", neighbor.word, neighbor.distance);
        }
    }

    Ok(())
}

/// Interactive, line-driven highlighting session over one file
#[inline]
pub async fn inspect_file(path: PathBuf, mode: Option<HighlightMode>) -> Result<()> {
    let mut config = Config::load_default().context("Failed to load configuration")?;
    if let Some(mode) = mode {
        config.highlight.default_mode = mode;
    }

    let analyzed = fetch_analysis(&config, path, true).await?;
    let mut inspector = Inspector::new(&config.highlight);
    inspector.apply_analysis(&analyzed.text, Ok(analyzed.result))?;

    if let Some(document) = inspector.document() {
        print_summary(document);
    }
    println!();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", style(format!("[{}]>", inspector.mode())).dim());
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        inspector.drain_events();
        let command = match InspectCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", style(message).red());
                continue;
            }
        };

        if !run_inspect_command(&mut inspector, command).await {
            break;
        }
    }

    Ok(())
}

/// Execute one inspect command; returns false once the loop should stop.
///
/// Only similarity lookups are awaited. A pending leave is left to elapse in
/// the background and is picked up by the next command.
async fn run_inspect_command(inspector: &mut Inspector, command: InspectCommand) -> bool {
    match command {
        InspectCommand::Quit => return false,
        InspectCommand::Help => print_help(),
        InspectCommand::HoverWord(word) => match inspector.hover_word(&word) {
            Some(position) => {
                inspector.settle_lookups().await;
                println!("Hovering '{}' at {}", word.to_lowercase(), position);
                print_highlights(inspector);
            }
            None => println!("'{}' does not occur in the text", word),
        },
        InspectCommand::HoverAt(position) => match inspector.hover(position) {
            Some(word) => {
                inspector.settle_lookups().await;
                println!("Hovering '{}' at {}", word, position);
                print_highlights(inspector);
            }
            None => println!("No word at {}", position),
        },
        InspectCommand::Leave => {
            inspector.leave();
            inspector.drain_events();
            println!(
                "Leaving; highlight clears in {}ms unless a word is hovered again",
                inspector.controller().debounce().as_millis()
            );
        }
        InspectCommand::Mode(mode) => {
            let mode = match mode {
                Some(mode) => {
                    inspector.set_mode(mode);
                    mode
                }
                None => inspector.toggle_mode(),
            };
            inspector.settle_lookups().await;
            println!("Mode: {}", style(mode).cyan());
            print_highlights(inspector);
        }
        InspectCommand::Info(position) => match inspector.word_info(position) {
            Some(info) => {
                println!(
                    "{} '{}' at {} ({:?})",
                    style(info.word).bold(),
                    info.text,
                    info.position,
                    info.class
                );
                println!("   Occurrences: {}", info.occurrences.len());
                match info.metadata {
                    Some(metadata) => {
                        println!("   Count: {}", metadata.count);
                        println!("   Frequency: {:.4}", metadata.frequency);
                        println!("   Stopword: {}", metadata.is_stopword);
                        match metadata.dimension() {
                            Some(dim) if metadata.has_embedding() => {
                                println!("   Embedding: {} dimensions", dim);
                            }
                            _ => println!("   Embedding: none"),
                        }
                    }
                    None => println!("   No metadata from the analysis service"),
                }
            }
            None => println!("No word at {}", position),
        },
        InspectCommand::Show => {
            inspector.drain_events();
            if let Some(document) = inspector.document() {
                for paragraph in document.paragraphs() {
                    println!("{}", render_paragraph(inspector, paragraph));
                }
            }
        }
    }

    true
}

/// One line of input to the inspect loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectCommand {
    HoverWord(String),
    HoverAt(Position),
    Leave,
    Mode(Option<HighlightMode>),
    Info(Position),
    Show,
    Help,
    Quit,
}

impl InspectCommand {
    /// Parse one input line; blank lines yield `Ok(None)`
    #[inline]
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let argument = parts.next();
        if parts.next().is_some() {
            return Err(format!("Too many arguments for '{verb}'"));
        }

        let command = match (verb.to_ascii_lowercase().as_str(), argument) {
            ("hover" | "h", Some(target)) => match parse_position(target) {
                Some(position) => Self::HoverAt(position),
                None => Self::HoverWord(target.to_string()),
            },
            ("hover" | "h", None) => return Err("Usage: hover <word|p:s>".to_string()),
            ("leave" | "l", None) => Self::Leave,
            ("mode" | "m", mode) => Self::Mode(mode.map(str::parse).transpose()?),
            ("info" | "i", Some(target)) => Self::Info(
                parse_position(target)
                    .ok_or_else(|| format!("Invalid position '{target}', expected p:s"))?,
            ),
            ("info" | "i", None) => return Err("Usage: info <p:s>".to_string()),
            ("show" | "s", None) => Self::Show,
            ("help" | "?", None) => Self::Help,
            ("quit" | "q" | "exit", None) => Self::Quit,
            (other, _) => return Err(format!("Unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

/// Parse `paragraph:segment`
#[inline]
pub fn parse_position(input: &str) -> Option<Position> {
    let (paragraph, segment) = input.split_once(':')?;
    Some(Position::new(
        paragraph.trim().parse().ok()?,
        segment.trim().parse().ok()?,
    ))
}

async fn fetch_analysis(
    config: &Config,
    path: PathBuf,
    include_embeddings: bool,
) -> Result<AnalyzedText> {
    let client = AnalysisClient::new(&config.service)?.with_embeddings(include_embeddings);
    info!("Analyzing {} via {}", path.display(), client.base_url());

    let bar = spinner(&path);
    let outcome = tokio::task::spawn_blocking(move || client.analyze_file(&path))
        .await
        .context("Analysis task failed")?;
    bar.finish_and_clear();

    outcome.map_err(|e: ServiceError| {
        warn!("Analysis failed: {}", e);
        e.into()
    })
}

/// Run one blocking client call off the async runtime
async fn with_client<T, F>(config: &Config, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AnalysisClient) -> Result<T, ServiceError> + Send + 'static,
{
    let client = AnalysisClient::new(&config.service)?;
    let outcome = tokio::task::spawn_blocking(move || call(&client))
        .await
        .context("Analysis service task failed")?;

    outcome.map_err(|e| {
        warn!("Analysis service request failed: {}", e);
        anyhow::Error::from(e)
    })
}

fn spinner(path: &Path) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} Analyzing {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(path.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_summary(document: &Document) {
    let statistics = document.statistics();

    println!(
        "📄 {}{}",
        style(document.filename().unwrap_or("document")).bold(),
        if document.was_cached() {
            " (cached by service)"
        } else {
            ""
        }
    );
    if let Some(cache_key) = document.cache_key() {
        println!("   Cache key: {}", cache_key);
    }
    println!("   Paragraphs: {}", document.paragraphs().len());
    println!("   Sentences: {}", statistics.sentence_count);
    println!(
        "   Words: {} ({} unique, {} content)",
        statistics.word_count,
        statistics.unique_word_count,
        document.content_word_count()
    );
    if let Some(characters) = statistics.character_count {
        println!("   Characters: {}", characters);
    }
    println!(
        "   Avg words per sentence: {:.1}",
        statistics.avg_words_per_sentence
    );
    println!("   Avg word length: {:.1}", statistics.avg_word_length);
    println!("   Lexical density: {:.1}%", document.lexical_density());
    println!(
        "   Embedding coverage: {:.0}%",
        document.embedding_coverage() * 100.0
    );

    if !document.top_words().is_empty() {
        let top: Vec<String> = document
            .top_words()
            .iter()
            .map(|top| format!("{} ({})", top.word, top.count))
            .collect();
        println!("   Top words: {}", top.join(", "));
    }
}

fn print_report(document: &Document) {
    print_summary(document);
    println!();
    for paragraph in document.paragraphs() {
        print_paragraph_stats(paragraph);
    }

    let missing = document.vocabulary_mismatch();
    if !missing.is_empty() {
        println!();
        println!(
            "{} {} displayed words have no metadata:",
            style("⚠").yellow(),
            missing.len()
        );
        let listed: Vec<&str> = missing.iter().take(20).map(|w| w.as_str()).collect();
        println!("   {}", listed.join(", "));
    }
}

fn print_paragraph_stats(paragraph: &ParagraphView) {
    let stats = paragraph.stats;
    println!(
        "¶{:<4} {:>5} words {:>4} distinct {:>3} sentences {:>6.1} avg",
        paragraph.index(),
        stats.word_count,
        stats.distinct_words,
        stats.sentence_count,
        stats.avg_sentence_length
    );
}

fn print_highlights(inspector: &Inspector) {
    let positions = inspector.highlighted_positions();
    if positions.is_empty() {
        println!("Nothing highlighted");
        return;
    }

    let listed: Vec<String> = positions
        .iter()
        .map(|(position, class)| match class {
            HighlightClass::Hovered => style(position).bold().to_string(),
            HighlightClass::CoOccurrence => style(position).yellow().to_string(),
            HighlightClass::Similar => style(position).cyan().to_string(),
            HighlightClass::None => position.to_string(),
        })
        .collect();
    println!("Highlighted: {}", listed.join(" "));

    if let Some(similar) = inspector.similar_words() {
        let words: Vec<String> = similar
            .iter()
            .map(|s| format!("{} ({:.3})", s.word, s.score))
            .collect();
        if words.is_empty() {
            println!("No similar words");
        } else {
            println!("Similar: {}", words.join(", "));
        }
    }
}

fn render_paragraph(inspector: &Inspector, paragraph: &ParagraphView) -> String {
    paragraph
        .segments()
        .iter()
        .map(|segment| match inspector.class_of(segment) {
            HighlightClass::Hovered => style(&segment.text).bold().reverse().to_string(),
            HighlightClass::CoOccurrence => style(&segment.text).yellow().bold().to_string(),
            HighlightClass::Similar => style(&segment.text).cyan().underlined().to_string(),
            HighlightClass::None => segment.text.clone(),
        })
        .collect()
}

fn print_help() {
    println!("Commands:");
    println!("  hover <word|p:s>   hover a word (first occurrence) or a position");
    println!("  leave              move the pointer off the word");
    println!("  mode [name]        toggle or set the mode (co-occurrence, similarity)");
    println!("  info <p:s>         show metadata for the word at a position");
    println!("  show               print the text with highlights");
    println!("  quit               exit");
}
