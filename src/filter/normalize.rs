//! Text normalization for evasion-resistant matching
//!
//! Canonicalizes raw message content before it reaches the match engine so
//! that leetspeak, zero-width codepoints, dotted-out letters and stretched
//! characters cannot slip a banned term past a literal pattern.

/// Multi-character leetspeak sequences. Checked before the single-character
/// table so that e.g. `vv` becomes `w` instead of two corrupted halves.
const LEET_SEQUENCES: &[(&str, &str)] = &[("vv", "w"), ("\\/", "v")];

/// Single-character leetspeak substitutions.
const LEET_CHARS: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('@', 'a'),
    ('$', 's'),
    ('!', 'i'),
];

/// Connector characters that are dropped when they sit alone between two
/// letters (`s.p.a.m` -> `spam`). Whitespace is deliberately not a connector:
/// word gaps must survive normalization.
const CONNECTORS: &[char] = &[
    '.', ',', '-', '_', '\'', '"', '`', '~', '*', '|', '/', '\\', '+',
];

/// Canonicalize `text` for matching.
///
/// Always lowercases, strips zero-width codepoints and collapses whitespace.
/// With `smart` set, additionally applies the leetspeak table, drops single
/// connectors between letters and collapses runs of 3+ identical characters
/// down to 2.
///
/// The result is a fixpoint: `normalize(normalize(x, smart), smart)` equals
/// `normalize(x, smart)` for both modes.
pub fn normalize(text: &str, smart: bool) -> String {
    let mut out = text.to_lowercase();
    out.retain(|c| !is_zero_width(c));

    if smart {
        // Connector stripping can fuse letters into new leet sequences or new
        // character runs, so the smart stage iterates until stable. Every
        // pass either shortens the string or consumes a substitutable
        // character, so this terminates.
        loop {
            let next = collapse_repeats(&strip_connectors(&apply_leet(&out)));
            if next == out {
                break;
            }
            out = next;
        }
    }

    collapse_whitespace(&out)
}

fn is_zero_width(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200D}' // zero-width space / non-joiner / joiner
            | '\u{2060}' // word joiner
            | '\u{FEFF}' // BOM used inline
            | '\u{00AD}' // soft hyphen
            | '\u{FE00}'..='\u{FE0F}' // variation selectors
    )
}

fn apply_leet(s: &str) -> String {
    let mut out = s.to_string();
    for (seq, replacement) in LEET_SEQUENCES {
        out = out.replace(seq, replacement);
    }
    out.chars()
        .map(|c| {
            LEET_CHARS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// Drop a connector only when it is the single character between two letters,
/// judged against the original neighbors. Doubled connectors stay.
fn strip_connectors(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        let between_letters = i > 0
            && chars[i - 1].is_alphabetic()
            && chars.get(i + 1).is_some_and(|next| next.is_alphabetic());
        if between_letters && CONNECTORS.contains(&c) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Collapse runs of 3 or more identical characters down to 2.
fn collapse_repeats(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = None;
    let mut run = 0usize;
    for c in s.chars() {
        if prev == Some(c) {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run <= 2 {
            out.push(c);
        }
    }
    out
}

/// Collapse whitespace runs to a single space and trim both ends.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_gap = false;
    for c in s.chars() {
        if c.is_whitespace() {
            pending_gap = !out.is_empty();
        } else {
            if pending_gap {
                out.push(' ');
                pending_gap = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Hello   WORLD \t now ", false), "hello world now");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize("", false), "");
        assert_eq!(normalize("", true), "");
        assert_eq!(normalize(" \t\n ", true), "");
    }

    #[test]
    fn test_zero_width_characters_are_stripped_in_both_modes() {
        let input = "sp\u{200B}a\u{200D}m\u{FE0F}";
        assert_eq!(normalize(input, false), "spam");
        assert_eq!(normalize(input, true), "spam");
    }

    #[test]
    fn test_smart_leetspeak() {
        assert_eq!(normalize("h3ll0", true), "hello");
        assert_eq!(normalize("5p4m", true), "spam");
        // plain mode leaves leetspeak alone
        assert_eq!(normalize("h3ll0", false), "h3ll0");
    }

    #[test]
    fn test_multi_character_sequences_run_before_singles() {
        assert_eq!(normalize("vvord", true), "word");
        assert_eq!(normalize("ser\\/er", true), "server");
    }

    #[test]
    fn test_smart_strips_single_connectors_between_letters() {
        assert_eq!(normalize("s.p.a.m", true), "spam");
        assert_eq!(normalize("f.u.c.k you", true), "fuck you");
        // spaces are not connectors
        assert_eq!(normalize("spam now", true), "spam now");
        // doubled connectors are not "single between two letters"
        assert_eq!(normalize("a..b", true), "a..b");
    }

    #[test]
    fn test_smart_collapses_character_runs() {
        assert_eq!(normalize("spaaaam", true), "spaam");
        assert_eq!(normalize("heyyyyyy", true), "heyy");
        // runs of exactly two survive
        assert_eq!(normalize("hello", true), "hello");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "",
            "Hello World",
            "h3ll0 th3r3",
            "s.p.a.m",
            "f.u.c.k you",
            "v.v",  // connector strip fuses a new leet sequence
            "aa.a", // connector strip creates a new run
            "spaaaaam   and    eggs",
            "z\u{200B}e\u{200C}r\u{200D}o width",
            "MiXeD C4s3 !nput",
            "a..b.-c",
        ];
        for sample in samples {
            for smart in [false, true] {
                let once = normalize(sample, smart);
                let twice = normalize(&once, smart);
                assert_eq!(once, twice, "normalize not idempotent for {sample:?}");
            }
        }
    }

    #[test]
    fn test_output_never_longer_than_input() {
        let samples = ["Hello   World", "s.p.a.m", "spaaaam", "h3ll0", "vvord"];
        for sample in samples {
            for smart in [false, true] {
                let out = normalize(sample, smart);
                assert!(out.chars().count() <= sample.chars().count());
            }
        }
    }
}
