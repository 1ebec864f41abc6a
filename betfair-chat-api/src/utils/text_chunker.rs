//! Text chunking for streamed replies
//!
//! The LLM answers in one piece; the browser still gets the reply as a
//! growing series of lines so it can render progressively.

use futures::stream::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, interval};

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Size of each chunk in characters
    pub chunk_size: usize,
    /// Delay between chunks in milliseconds
    pub chunk_delay_ms: u64,
    /// Whether to split at word boundaries
    pub word_boundary: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            chunk_delay_ms: 10,
            word_boundary: true,
        }
    }
}

/// A stream that yields pre-split chunks of text, one per tick
pub struct TextChunker {
    chunks: VecDeque<String>,
    interval: Interval,
}

impl TextChunker {
    pub fn new(text: &str, config: ChunkConfig) -> Self {
        let chunks = split_text_into_chunks(text, &config).into();
        // tokio intervals reject a zero period
        let interval = interval(Duration::from_millis(config.chunk_delay_ms.max(1)));
        Self { chunks, interval }
    }
}

impl Stream for TextChunker {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.chunks.is_empty() {
            return Poll::Ready(None);
        }
        match self.interval.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(self.chunks.pop_front()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Split text into chunks of about `chunk_size` characters.
///
/// With `word_boundary`, a chunk ends after the last space inside the
/// window, or after the next space when the window holds none.
pub fn split_text_into_chunks(text: &str, config: &ChunkConfig) -> Vec<String> {
    let size = config.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = chunk_end(rest, size, config.word_boundary);
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk.to_string());
        rest = tail;
    }

    chunks
}

fn chunk_end(text: &str, size: usize, word_boundary: bool) -> usize {
    // byte offset just past `size` characters
    let mut end = text.char_indices().nth(size).map_or(text.len(), |(i, _)| i);

    if word_boundary && end < text.len() {
        match text[..end].rfind(' ') {
            Some(last_space) if last_space > 0 => end = last_space + 1,
            Some(_) => {},
            None => {
                if let Some(next_space) = text[end..].find(' ') {
                    end += next_space + 1;
                }
            },
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_split_text_basic() {
        let text = "Hello world, this is a test message.";
        let config = ChunkConfig {
            chunk_size: 10,
            chunk_delay_ms: 0,
            word_boundary: false,
        };

        let chunks = split_text_into_chunks(text, &config);
        assert_eq!(chunks[0], "Hello worl");
        assert_eq!(chunks[1], "d, this is");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_text_word_boundary() {
        let text = "Hello world, this is a test message.";
        let config = ChunkConfig {
            chunk_size: 10,
            chunk_delay_ms: 0,
            word_boundary: true,
        };

        let chunks = split_text_into_chunks(text, &config);
        assert_eq!(chunks[0], "Hello ");
        assert_eq!(chunks[1], "world, ");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_text_multibyte() {
        let text = "Côte d’Ivoire à 2,5 ou 3€";
        let config = ChunkConfig {
            chunk_size: 3,
            chunk_delay_ms: 0,
            word_boundary: false,
        };

        let chunks = split_text_into_chunks(text, &config);
        assert_eq!(chunks[0], "Côt");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_text_into_chunks("", &ChunkConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn test_chunker_stream_yields_all_chunks() {
        let config = ChunkConfig {
            chunk_size: 5,
            chunk_delay_ms: 0,
            word_boundary: false,
        };
        let chunks: Vec<String> = TextChunker::new("abcdefghijkl", config).collect().await;
        assert_eq!(chunks, vec!["abcde", "fghij", "kl"]);
    }
}
