//! Free-text tokenizer for search input
//!
//! Splits on whitespace outside of quotes, keeps quoted spans together and
//! attaches a preceding `key:` prefix to the next value.

/// A single `(key?, value)` pair produced by [`tokenize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Key of a `key:value` fragment, `None` for bare values
    pub key: Option<String>,
    /// Value with surrounding whitespace and quotation marks removed
    pub value: String,
}

impl Token {
    pub fn bare(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

/// Tokenize search input into `(key?, value)` pairs
///
/// - `'` and `"` toggle a quoted span in which whitespace and `:` are literal
/// - `key:` attaches to the following value; when prefixes chain
///   (`autor:autor:"x"`) only the last key is kept
/// - a key followed only by an empty quoted span yields the key with an
///   empty value, so the key never leaks onto a later token
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut state = TokenizerState::default();

    for c in input.chars() {
        match c {
            '\'' | '"' => {
                let closes_quote = state.quoted;
                state.flush(&mut tokens, closes_quote);
                state.quoted = !closes_quote;
            }
            ':' if !state.quoted => {
                let candidate = state.value.trim();
                if !candidate.is_empty() {
                    state.key = Some(candidate.to_string());
                }
                state.value.clear();
            }
            c if c.is_whitespace() && !state.quoted => state.flush(&mut tokens, false),
            c => state.value.push(c),
        }
    }

    // An unterminated quote still consumes a pending key
    let quoted = state.quoted;
    state.flush(&mut tokens, quoted);

    tokens
}

#[derive(Default)]
struct TokenizerState {
    value: String,
    key: Option<String>,
    quoted: bool,
}

impl TokenizerState {
    fn flush(&mut self, tokens: &mut Vec<Token>, closes_quote: bool) {
        let trimmed = self.value.trim();
        if !trimmed.is_empty() {
            tokens.push(Token {
                key: self.key.take(),
                value: trimmed.to_string(),
            });
        } else if closes_quote {
            if let Some(key) = self.key.take() {
                tokens.push(Token::keyed(key, ""));
            }
        }
        self.value.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_no_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_tokenize_two_words_without_key() {
        let tokens = tokenize("hello world");
        assert_eq!(tokens, vec![Token::bare("hello"), Token::bare("world")]);
    }

    #[test]
    fn test_tokenize_split_by_tab() {
        let tokens = tokenize("hello\tworld");
        assert_eq!(tokens, vec![Token::bare("hello"), Token::bare("world")]);
    }

    #[test]
    fn test_tokenize_quoted_span_keeps_inner_whitespace() {
        let tokens = tokenize(" \"hello  world\"  ");
        assert_eq!(tokens, vec![Token::bare("hello  world")]);
    }

    #[test]
    fn test_tokenize_some_words_quoted() {
        let tokens = tokenize(" \"post hotel\" auto ");
        assert_eq!(tokens, vec![Token::bare("post hotel"), Token::bare("auto")]);
    }

    #[test]
    fn test_tokenize_quote_directly_followed_by_word() {
        let tokens = tokenize(" \"post hotel\"auto ");
        assert_eq!(tokens, vec![Token::bare("post hotel"), Token::bare("auto")]);
    }

    #[test]
    fn test_tokenize_author() {
        let tokens = tokenize(" autor:\"steiner, albert\" ");
        assert_eq!(tokens, vec![Token::keyed("autor", "steiner, albert")]);
    }

    #[test]
    fn test_tokenize_chained_keys_keep_last() {
        let tokens = tokenize("autor:autor:\"steiner, albert\" ");
        assert_eq!(tokens, vec![Token::keyed("autor", "steiner, albert")]);
    }

    #[test]
    fn test_tokenize_key_with_whitespace_before_value() {
        let tokens = tokenize("  autor: \t \"steiner, albert\" ");
        assert_eq!(tokens, vec![Token::keyed("autor", "steiner, albert")]);
    }

    #[test]
    fn test_tokenize_colon_inside_quotes_is_literal() {
        let tokens = tokenize("\"a:b\" dec:1950");
        assert_eq!(tokens, vec![Token::bare("a:b"), Token::keyed("dec", "1950")]);
    }

    #[test]
    fn test_tokenize_empty_quoted_value_consumes_key() {
        let tokens = tokenize("autor:\"\" winter");
        assert_eq!(tokens, vec![Token::keyed("autor", ""), Token::bare("winter")]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_consumes_key() {
        assert_eq!(tokenize("autor:\""), vec![Token::keyed("autor", "")]);
        assert_eq!(tokenize("autor:\" \""), vec![Token::keyed("autor", "")]);
    }

    #[test]
    fn test_tokenize_dangling_key_is_dropped() {
        assert_eq!(tokenize("winter dec:"), vec![Token::bare("winter")]);
    }
}
