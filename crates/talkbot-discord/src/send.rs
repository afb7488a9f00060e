use serenity::http::Http;
use serenity::model::id::ChannelId;

/// Discord rejects messages over 2000 characters; stay under it.
const CHUNK_MAX: usize = 1950;

/// Largest byte index `<= max` that falls on a char boundary of `s`.
fn floor_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Split `text` into pieces of at most [`CHUNK_MAX`] bytes, cutting at the
/// last newline or space in each window when there is one.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > CHUNK_MAX {
        let window = &remaining[..floor_boundary(remaining, CHUNK_MAX)];
        let split_at = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => window.len(),
            Some(i) => i,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

/// Send `text` to `channel_id`, one message per chunk.
pub async fn send_chunked(
    http: &Http,
    channel_id: ChannelId,
    text: &str,
) -> Result<(), serenity::Error> {
    for chunk in split_chunks(text) {
        channel_id.say(http, &chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_phrase_is_single_chunk() {
        let chunks = split_chunks("the quick brown fox");
        assert_eq!(chunks, vec!["the quick brown fox"]);
    }

    #[test]
    fn long_phrase_splits_between_words() {
        let phrase = vec!["archive"; 600].join(" ");
        let chunks = split_chunks(&phrase);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX, "chunk too large: {}", c.len());
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
            assert!(c.split(' ').all(|w| w == "archive"));
        }
    }

    #[test]
    fn unbroken_text_is_cut_hard() {
        let chunks = split_chunks(&"x".repeat(4000));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_MAX));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(1500);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_MAX));
    }
}
