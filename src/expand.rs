//! Argument interpolation for prompt templates.
//!
//! A template may reference the whole argument string as `$ARGUMENTS` and
//! individual arguments as `$1`, `$2`, ... Missing arguments expand to the
//! empty string; expansion never fails.

/// Placeholder for the full (trimmed) argument string.
const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Arguments parsed from the text typed after a prompt name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arguments {
    /// The raw string with surrounding whitespace trimmed.
    pub all: String,
    /// Individually addressable arguments, `$1` is `positional[0]`.
    pub positional: Vec<String>,
}

impl Arguments {
    /// Parse a raw argument string.
    pub fn parse(raw: &str) -> Self {
        Self {
            all: raw.trim().to_string(),
            positional: tokenize(raw),
        }
    }

    /// Build arguments from words the shell has already split.
    ///
    /// Each word is one positional argument as-is. `all` re-quotes words that
    /// would not survive `tokenize` unchanged, so it reads like typed input.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        Self {
            all: words
                .iter()
                .map(|w| quote_word(w.as_ref()))
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            positional: words.iter().map(|w| w.as_ref().to_string()).collect(),
        }
    }

    /// Get the argument for a 1-based placeholder index.
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.positional.get(i))
            .map(String::as_str)
    }
}

/// Split a raw argument string into positional arguments.
///
/// Unquoted whitespace separates arguments. A `"` or `'` opens a span that
/// runs to the next quote of the same kind; whitespace inside the span is
/// kept and the quote characters are dropped. An unterminated span runs to
/// the end of input. There are no escape sequences.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token may be empty (`""`), so track whether one has started.
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }

    tokens
}

/// Quote a word containing whitespace (or an empty word) for display in `all`.
fn quote_word(word: &str) -> String {
    if !word.is_empty() && !word.chars().any(char::is_whitespace) {
        return word.to_string();
    }
    if word.contains('"') {
        format!("'{}'", word)
    } else {
        format!("\"{}\"", word)
    }
}

/// Expand `$ARGUMENTS` and `$N` placeholders in `template`.
///
/// Substituted values are inserted verbatim and never rescanned.
pub fn expand(template: &str, raw_args: &str) -> String {
    let args = Arguments::parse(raw_args);
    expand_with(template, &args)
}

/// Expand a template against already parsed arguments.
pub fn expand_with(template: &str, args: &Arguments) -> String {
    let mut out = String::with_capacity(template.len() + args.all.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        match parse_placeholder(candidate) {
            Some((Placeholder::All, len)) => {
                out.push_str(&args.all);
                rest = &candidate[len..];
            }
            Some((Placeholder::Positional(index), len)) => {
                out.push_str(index.and_then(|i| args.get(i)).unwrap_or(""));
                rest = &candidate[len..];
            }
            None => {
                out.push('$');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Highest positional placeholder referenced by `template`, 0 if none.
pub fn placeholder_arity(template: &str) -> usize {
    let mut max = 0;
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        let candidate = &rest[pos..];
        match parse_placeholder(candidate) {
            Some((Placeholder::Positional(Some(index)), len)) => {
                max = max.max(index);
                rest = &candidate[len..];
            }
            Some((_, len)) => rest = &candidate[len..],
            None => rest = &candidate[1..],
        }
    }

    max
}

/// A recognized placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    All,
    /// `None` when the index does not fit in a `usize`.
    Positional(Option<usize>),
}

/// Recognize a placeholder at the start of `s` (which begins with `$`).
///
/// Returns the placeholder and its byte length. Digit runs are taken whole
/// so `$10` is the tenth argument. A run starting with `0` is not a
/// placeholder.
fn parse_placeholder(s: &str) -> Option<(Placeholder, usize)> {
    if s.starts_with(ARGUMENTS_PLACEHOLDER) {
        return Some((Placeholder::All, ARGUMENTS_PLACEHOLDER.len()));
    }

    let digits = &s[1..];
    let run = digits
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if run == 0 || digits.starts_with('0') {
        return None;
    }

    let index = digits[..run].parse::<usize>().ok();
    Some((Placeholder::Positional(index), run + 1))
}
