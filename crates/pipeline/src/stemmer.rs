//! Porter suffix-stripping stemmer.
//!
//! Rule-based only, no dictionary: "loved", "loving" and "love" all reduce
//! to "love", while irregular forms such as "ran" are left alone.
//!
//! A single Porter pass is not always idempotent ("agreed" -> "agree" ->
//! "agre"), so `PorterStemmer::stem` repeats the pass until the word stops
//! changing. No pass makes a word longer, and same-length rewrites only
//! turn a final `y` into `i` or a final `i` into `e`, so the loop ends.

use crate::traits::Stemmer;

/// Porter (1980) stemmer, iterated to a fixed point
#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

impl PorterStemmer {
    pub fn new() -> Self {
        Self
    }
}

impl Stemmer for PorterStemmer {
    fn name(&self) -> &str {
        "PorterStemmer"
    }

    fn stem(&self, token: &str) -> String {
        let mut current = token.as_bytes().to_vec();
        // Each productive pass shortens the word or rewrites its last byte
        for _ in 0..=2 * current.len() {
            let next = porter_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        // Rules only cut whole ASCII suffixes or single ASCII bytes
        String::from_utf8(current).unwrap_or_else(|_| token.to_string())
    }
}

const STEP2_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("bli", "ble"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
    ("logi", "log"),
];

const STEP3_RULES: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4_SUFFIXES: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou",
    "ism", "ate", "iti", "ous", "ive", "ize",
];

/// One full pass of the five Porter steps
fn porter_pass(word: &[u8]) -> Vec<u8> {
    if word.len() <= 2 {
        return word.to_vec();
    }
    let mut w = word.to_vec();
    step1a(&mut w);
    step1b(&mut w);
    step1c(&mut w);
    apply_rules(&mut w, STEP2_RULES);
    apply_rules(&mut w, STEP3_RULES);
    step4(&mut w);
    step5(&mut w);
    w
}

fn is_consonant(w: &[u8], i: usize) -> bool {
    match w[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of VC sequences in `[C](VC){m}[V]`
fn measure(stem: &[u8]) -> usize {
    let n = stem.len();
    let mut i = 0;
    while i < n && is_consonant(stem, i) {
        i += 1;
    }
    let mut m = 0;
    loop {
        while i < n && !is_consonant(stem, i) {
            i += 1;
        }
        if i >= n {
            return m;
        }
        while i < n && is_consonant(stem, i) {
            i += 1;
        }
        m += 1;
        if i >= n {
            return m;
        }
    }
}

fn has_vowel(stem: &[u8]) -> bool {
    (0..stem.len()).any(|i| !is_consonant(stem, i))
}

/// Repeated trailing ASCII consonant. Non-ASCII bytes never count, since
/// equal continuation bytes are not a doubled letter.
fn ends_double_consonant(w: &[u8]) -> bool {
    let n = w.len();
    n >= 2 && w[n - 1].is_ascii() && w[n - 1] == w[n - 2] && is_consonant(w, n - 1)
}

/// consonant-vowel-consonant ending, last consonant not w, x or y
fn ends_cvc(w: &[u8]) -> bool {
    let n = w.len();
    n >= 3
        && is_consonant(w, n - 3)
        && !is_consonant(w, n - 2)
        && is_consonant(w, n - 1)
        && !matches!(w[n - 1], b'w' | b'x' | b'y')
}

fn stem_len(w: &[u8], suffix: &str) -> Option<usize> {
    w.ends_with(suffix.as_bytes()).then(|| w.len() - suffix.len())
}

fn replace_suffix(w: &mut Vec<u8>, keep: usize, replacement: &str) {
    w.truncate(keep);
    w.extend_from_slice(replacement.as_bytes());
}

fn step1a(w: &mut Vec<u8>) {
    if let Some(keep) = stem_len(w, "sses") {
        replace_suffix(w, keep, "ss");
    } else if let Some(keep) = stem_len(w, "ies") {
        replace_suffix(w, keep, "i");
    } else if w.ends_with(b"s") && !w.ends_with(b"ss") {
        w.pop();
    }
}

fn step1b(w: &mut Vec<u8>) {
    if let Some(keep) = stem_len(w, "eed") {
        if measure(&w[..keep]) > 0 {
            replace_suffix(w, keep, "ee");
        }
        return;
    }

    let word: &[u8] = w;
    let stripped = ["ed", "ing"]
        .iter()
        .find_map(|suffix| stem_len(word, suffix).filter(|&keep| has_vowel(&word[..keep])));
    let Some(keep) = stripped else {
        return;
    };
    w.truncate(keep);

    if w.ends_with(b"at") || w.ends_with(b"bl") || w.ends_with(b"iz") {
        w.push(b'e');
    } else if ends_double_consonant(w) && !matches!(w[w.len() - 1], b'l' | b's' | b'z') {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push(b'e');
    }
}

fn step1c(w: &mut [u8]) {
    let n = w.len();
    if n > 1 && w[n - 1] == b'y' && has_vowel(&w[..n - 1]) {
        w[n - 1] = b'i';
    }
}

/// First matching suffix decides; it is replaced only when m(stem) > 0
fn apply_rules(w: &mut Vec<u8>, rules: &[(&str, &str)]) {
    for (suffix, replacement) in rules {
        if let Some(keep) = stem_len(w, suffix) {
            if measure(&w[..keep]) > 0 {
                replace_suffix(w, keep, replacement);
            }
            return;
        }
    }
}

fn step4(w: &mut Vec<u8>) {
    for suffix in STEP4_SUFFIXES {
        let Some(keep) = stem_len(w, suffix) else {
            continue;
        };
        if *suffix == "ion" && !(keep > 0 && matches!(w[keep - 1], b's' | b't')) {
            continue;
        }
        if measure(&w[..keep]) > 1 {
            w.truncate(keep);
        }
        return;
    }
}

fn step5(w: &mut Vec<u8>) {
    if let Some(keep) = stem_len(w, "e") {
        let m = measure(&w[..keep]);
        if m > 1 || (m == 1 && !ends_cvc(&w[..keep])) {
            w.truncate(keep);
        }
    }
    if w.len() >= 2 && w.ends_with(b"l") && ends_double_consonant(w) && measure(w) > 1 {
        w.pop();
    }
}
