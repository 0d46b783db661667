use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

use crate::error::MetaError;
use crate::model::EntityCollection;

/// Token lists, one per record, in record order.
pub type TokenLists = Vec<Vec<String>>;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
        "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
        "what", "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are",
        "was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does",
        "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because", "as", "until",
        "while", "of", "at", "by", "for", "with", "about", "against", "between", "into",
        "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
        "in", "out", "on", "off", "over", "under", "again", "further", "then", "once", "here",
        "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
        "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
        "than", "too", "very", "s", "t", "can", "will", "just", "don", "should", "now", "d",
        "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn", "doesn", "hadn",
        "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan", "shouldn", "wasn",
        "weren", "won", "wouldn",
    ]
    .into_iter()
    .collect()
});

/// Lowercased, Snowball-stemmed word tokens of `text`. English stopwords and
/// single-character tokens are dropped before stemming.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(*t))
        .map(|t| STEMMER.stem(t).into_owned())
        .collect()
}

/// Tokens of one column, one list per record.
pub fn tokenize_column(collection: &EntityCollection, column: usize) -> TokenLists {
    collection.column(column).map(tokenize).collect()
}

/// Concatenate two per-record token lists record by record.
pub fn merge_token_lists(mut first: TokenLists, second: TokenLists) -> Result<TokenLists, MetaError> {
    if first.len() != second.len() {
        return Err(MetaError::SizeMismatch {
            left: first.len(),
            right: second.len(),
        });
    }
    for (tokens, more) in first.iter_mut().zip(second) {
        tokens.extend(more);
    }
    Ok(first)
}

/// Tokens of several columns concatenated per record, in column order.
pub fn multi_column_tokens(
    collection: &EntityCollection,
    columns: &[usize],
) -> Result<TokenLists, MetaError> {
    let mut merged: TokenLists = vec![Vec::new(); collection.len()];
    for &column in columns {
        if column >= collection.headers.len() {
            return Err(MetaError::InvariantViolation(format!(
                "collection '{}' has no column {column}",
                collection.name
            )));
        }
        merged = merge_token_lists(merged, tokenize_column(collection, column))?;
    }
    Ok(merged)
}
