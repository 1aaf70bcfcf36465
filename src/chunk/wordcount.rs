//! Whitespace-delimited token counting
//!
//! Counting is position independent: a word cut by a chunk boundary is
//! counted once by each side. Bytes that are not valid UTF-8 count as word
//! characters.

use std::borrow::Cow;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Incremental word counter fed with arbitrary byte slices
#[derive(Debug, Default, Clone)]
pub struct WordCounter {
    words: u64,
    in_word: bool,
    // Leading bytes of a UTF-8 sequence cut by the previous slice
    pending: Vec<u8>,
}

impl WordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, input: &[u8]) {
        let combined: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(input)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(input);
            Cow::Owned(joined)
        };

        let mut bytes: &[u8] = &combined;
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.scan(text);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = bytes.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.scan(text);
                    }
                    match err.error_len() {
                        Some(invalid) => {
                            self.word_char();
                            bytes = &rest[invalid..];
                        }
                        None => {
                            self.pending = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Total word count; an incomplete trailing sequence counts as a word character.
    pub fn finish(mut self) -> u64 {
        if !self.pending.is_empty() {
            self.word_char();
        }
        self.words
    }

    fn scan(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.in_word = false;
            } else {
                self.word_char();
            }
        }
    }

    fn word_char(&mut self) {
        if !self.in_word {
            self.in_word = true;
            self.words += 1;
        }
    }
}

/// Count the words in a byte buffer
pub fn count_words(bytes: &[u8]) -> u64 {
    let mut counter = WordCounter::new();
    counter.update(bytes);
    counter.finish()
}

/// Count the words of an async reader, reading `buffer_size` bytes at a time
pub async fn count_words_in<R>(reader: &mut R, buffer_size: usize) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut counter = WordCounter::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        counter.update(&buffer[..read]);
    }
    Ok(counter.finish())
}
