//! Query tokenization for the keyword stage.
//!
//! Space-delimited scripts split into words on anything that is not a letter or
//! digit. CJK text has no spaces, so every CJK character becomes its own keyword;
//! matching is by substring, so per-character tokens still find multi-character words.

/// CJK ideographs, Hiragana, Katakana and Hangul syllables.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK Extension A
        | '\u{F900}'..='\u{FAFF}' // CJK Compatibility Ideographs
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{AC00}'..='\u{D7AF}' // Hangul Syllables
    )
}

/// Split text into lower-cased, de-duplicated keywords in order of first appearance.
///
/// ```
/// use recollect::memory::keywords::split_keywords;
///
/// assert_eq!(split_keywords("Hello, world!"), vec!["hello", "world"]);
/// assert_eq!(split_keywords("I like Python编程"), vec!["i", "like", "python", "编", "程"]);
/// ```
pub fn split_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    let mut word = String::new();

    for c in lowered.chars() {
        if is_cjk(c) {
            push(std::mem::take(&mut word), &mut keywords);
            push(c.to_string(), &mut keywords);
        } else if c.is_alphanumeric() {
            word.push(c);
        } else {
            push(std::mem::take(&mut word), &mut keywords);
        }
    }
    push(word, &mut keywords);

    keywords
}

fn push(token: String, keywords: &mut Vec<String>) {
    if !token.is_empty() && !keywords.contains(&token) {
        keywords.push(token);
    }
}

/// Number of keywords that occur in `content`. Keywords must already be lower-cased.
pub fn keyword_score(content: &str, keywords: &[String]) -> usize {
    let haystack = content.to_lowercase();
    keywords
        .iter()
        .filter(|k| haystack.contains(k.as_str()))
        .count()
}
