use std::fmt;

use tantivy::tokenizer::{
	LowerCaser, RegexTokenizer, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream,
	Tokenizer as AnalyzerTokenizer,
};

/// Unicode word runs; `_` counts as a word character.
const WORD_PATTERN: &str = r"\w+";

const STOP_WORDS: [&str; 64] = [
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having","i","you","we","me",
];

/// Text -> ordered lowercase tokens: maximal runs of word characters
/// (letters, digits, `_`). Empty tokens never appear.
#[derive(Clone)]
pub struct Tokenizer {
	analyzer: TextAnalyzer,
	stop_words: bool,
}

impl Tokenizer {
	pub fn new() -> Self { Self { analyzer: analyzer(false), stop_words: false } }

	/// Same chain with common English function words removed.
	pub fn with_stop_words() -> Self { Self { analyzer: analyzer(true), stop_words: true } }

	pub fn tokenize(&self, text: &str) -> Vec<String> {
		// token_stream needs &mut; a clone keeps the tokenizer shareable across readers
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut tokens = Vec::new();
		while stream.advance() {
			let token = &stream.token().text;
			if !token.is_empty() { tokens.push(token.clone()); }
		}
		tokens
	}
}

fn analyzer(stop_words: bool) -> TextAnalyzer {
	match RegexTokenizer::new(WORD_PATTERN) {
		Ok(words) => chain(words, stop_words),
		Err(e) => {
			tracing::warn!(error = %e, "word pattern rejected, splitting on non-alphanumerics");
			chain(SimpleTokenizer::default(), stop_words)
		}
	}
}

fn chain<T: AnalyzerTokenizer>(tokenizer: T, stop_words: bool) -> TextAnalyzer {
	let builder = TextAnalyzer::builder(tokenizer).filter(LowerCaser);
	if stop_words {
		builder.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string()))).build()
	} else {
		builder.build()
	}
}

impl Default for Tokenizer {
	fn default() -> Self { Self::new() }
}

impl fmt::Debug for Tokenizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tokenizer").field("stop_words", &self.stop_words).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_punctuation_and_lowercases() {
		let t = Tokenizer::new();
		assert_eq!(t.tokenize("Hello, World!  foo-bar"), vec!["hello", "world", "foo", "bar"]);
	}

	#[test]
	fn underscores_stay_inside_words() {
		let t = Tokenizer::new();
		assert_eq!(t.tokenize("call Foo_Bar(x_1) now"), vec!["call", "foo_bar", "x_1", "now"]);
	}

	#[test]
	fn empty_and_symbol_only_text_has_no_tokens() {
		let t = Tokenizer::new();
		assert!(t.tokenize("").is_empty());
		assert!(t.tokenize(" ,.;!? ").is_empty());
	}

	#[test]
	fn stop_words_are_optional() {
		assert_eq!(Tokenizer::new().tokenize("the cat"), vec!["the", "cat"]);
		assert_eq!(Tokenizer::with_stop_words().tokenize("the cat"), vec!["cat"]);
	}
}
