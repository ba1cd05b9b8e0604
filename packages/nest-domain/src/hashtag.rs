use std::sync::LazyLock;

use regex::Regex;

static HASHTAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\B#(\w+)").expect("hashtag pattern is valid"));

/// Lower-cased `#word` tokens in `text`, without the `#`, in first-seen order.
pub fn extract_hashtags(text: &str) -> Vec<String> {
	let lowered = text.to_lowercase();
	let mut out: Vec<String> = Vec::new();

	for captures in HASHTAG.captures_iter(&lowered) {
		let tag = &captures[1];

		if !out.iter().any(|seen| seen == tag) {
			out.push(tag.to_string());
		}
	}

	out
}
