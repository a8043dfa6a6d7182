use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
}

static STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

/// Term normalization for both index build and query parsing: NFKC + lowercase,
/// stopword removal, and English Snowball stemming. Constructed once per process
/// and passed by reference wherever terms are produced.
pub struct Analyzer {
    stemmer: Stemmer,
    stopwords: HashSet<&'static str>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            stopwords: STOPWORDS.iter().copied().collect(),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn stem(&self, token: &str) -> String {
        self.stemmer.stem(token).to_string()
    }

    /// Case-folded raw tokens, stopwords included, no stemming.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Reduce one raw token to its index term, or None for stopwords.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let folded = raw.nfkc().collect::<String>().to_lowercase();
        let token = RE.find(&folded)?.as_str();
        if self.is_stopword(token) {
            return None;
        }
        Some(self.stem(token))
    }

    /// Tokenize document content into (term, position) pairs. Positions are
    /// zero-based and count only surviving tokens, so stopwords do not leave
    /// gaps in the stream.
    pub fn tokenize(&self, text: &str) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        let mut pos: u32 = 0;
        for token in self.tokens(text) {
            if self.is_stopword(&token) {
                continue;
            }
            out.push((self.stem(&token), pos));
            pos += 1;
        }
        out
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
