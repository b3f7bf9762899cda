//! Chord symbol to singable text

use crate::segment::{is_no_chord, ChordSegment};

/// What gets sung for an empty, unparseable or no-chord label
pub const NO_CHORD_TEXT: &str = "NO CHORD";

// ============================================================================
// Lookup tables
// ============================================================================

/// Quality tokens, most specific first
const QUALITIES: &[(&str, &str)] = &[
    ("maj7", "MAJOR SEVEN"),
    ("min7", "MINOR SEVEN"),
    ("major", "MAJOR"),
    ("minor", "MINOR"),
    ("maj", "MAJOR"),
    ("min", "MINOR"),
    ("aug", "AUGMENTED"),
    ("dim", "DIMINISHED"),
    ("sus4", "SUSPENDED FOUR"),
    ("sus2", "SUSPENDED TWO"),
    ("sus", "SUSPENDED"),
    ("add", "ADD"),
];

/// Single-letter qualities; `M` and `m` differ only by case
const SHORTHAND: &[(&str, &str)] = &[("M", "MAJOR"), ("m", "MINOR")];

/// Extension numerals, longest first
const NUMERALS: &[(&str, &str)] = &[
    ("13", "THIRTEEN"),
    ("11", "ELEVEN"),
    ("9", "NINE"),
    ("7", "SEVEN"),
    ("6", "SIX"),
    ("4", "FOUR"),
    ("2", "TWO"),
];

fn natural_name(letter: char) -> Option<&'static str> {
    match letter.to_ascii_uppercase() {
        'A' => Some("AYE"),
        'B' => Some("BEE"),
        'C' => Some("SEE"),
        'D' => Some("DEE"),
        'E' => Some("EEE"),
        'F' => Some("EFF"),
        'G' => Some("GEE"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accidental {
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '#' | '♯' => Some(Self::Sharp),
            'b' | '♭' => Some(Self::Flat),
            _ => None,
        }
    }

    fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Natural => None,
            Self::Sharp => Some("SHARP"),
            Self::Flat => Some("FLAT"),
        }
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Split the root note (letter plus attached accidental) from the rest.
fn split_root(label: &str) -> Option<(&'static str, Accidental, &str)> {
    let mut chars = label.char_indices();
    let (_, letter) = chars.next()?;
    let name = natural_name(letter)?;
    let after_letter = letter.len_utf8();

    match chars.next() {
        Some((idx, c)) => match Accidental::from_char(c) {
            Some(acc) => Some((name, acc, &label[idx + c.len_utf8()..])),
            None => Some((name, Accidental::Natural, &label[after_letter..])),
        },
        None => Some((name, Accidental::Natural, "")),
    }
}

/// Strip the first token in `table` that prefixes `rest`, case-insensitively.
fn take_token<'a>(rest: &'a str, table: &[(&str, &'static str)]) -> Option<(&'static str, &'a str)> {
    table.iter().find_map(|&(token, spoken)| {
        let head = rest.get(..token.len())?;
        head.eq_ignore_ascii_case(token).then(|| (spoken, &rest[token.len()..]))
    })
}

fn take_shorthand(rest: &str) -> Option<(&'static str, &str)> {
    SHORTHAND
        .iter()
        .find_map(|&(token, spoken)| rest.strip_prefix(token).map(|tail| (spoken, tail)))
}

/// Turn a chord label into an uppercase phonetic utterance.
///
/// `"C#min7"` becomes `"SEE SHARP MINOR SEVEN"`. Unrecognised trailing text is
/// kept verbatim in lower case; empty or rootless labels yield
/// [`NO_CHORD_TEXT`]. Never fails.
pub fn pronounce_chord(label: &str) -> String {
    let label = label.trim();
    if is_no_chord(label) {
        return NO_CHORD_TEXT.to_string();
    }
    let Some((root, accidental, mut rest)) = split_root(label) else {
        return NO_CHORD_TEXT.to_string();
    };

    let mut parts: Vec<String> = vec![root.to_string()];
    if let Some(suffix) = accidental.suffix() {
        parts.push(suffix.to_string());
    }

    rest = rest.trim_start();
    if let Some((spoken, tail)) = take_token(rest, QUALITIES).or_else(|| take_shorthand(rest)) {
        parts.push(spoken.to_string());
        rest = tail.trim_start();
    }
    if let Some((spoken, tail)) = take_token(rest, NUMERALS) {
        parts.push(spoken.to_string());
        rest = tail.trim_start();
    }

    let residual = rest.trim();
    if !residual.is_empty() {
        parts.push(residual.to_lowercase());
    }

    parts.join(" ")
}

// ============================================================================
// Filler phrases
// ============================================================================

/// Lead-in phrase sung before segment `index`, chosen from the silence
/// between it and the next segment.
pub fn filler_phrase(segments: &[ChordSegment], index: usize) -> Option<&'static str> {
    let current = segments.get(index)?;
    let next = segments.get(index + 1)?;
    let gap = next.start - current.end;

    let staying = current.label == next.label;
    let returning = index > 0 && staying;
    let first = index == 0;
    let last = index + 1 == segments.len();

    if gap > 2.0 {
        Some(if returning {
            "NOW WE'RE BACK TO"
        } else if first {
            "WE START WITH"
        } else if last {
            "FINALLY WE HAVE"
        } else {
            "NOW WE'RE MOVING TO"
        })
    } else if gap > 1.0 {
        Some(if returning {
            "BACK TO"
        } else if staying {
            "STAY ON"
        } else {
            "NOW GO TO"
        })
    } else if gap > 0.5 {
        Some(if returning { "BACK TO" } else { "TO" })
    } else {
        None
    }
}

/// Utterance text for a segment, with an optional lead-in phrase
pub fn utterance_text(segments: &[ChordSegment], index: usize, with_filler: bool) -> String {
    let chord = segments
        .get(index)
        .map(|s| pronounce_chord(&s.label))
        .unwrap_or_else(|| NO_CHORD_TEXT.to_string());
    match filler_phrase(segments, index).filter(|_| with_filler) {
        Some(filler) => format!("{filler} {chord}"),
        None => chord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(label: &str, start: f64, end: f64) -> ChordSegment {
        ChordSegment { label: label.to_string(), start, end }
    }

    #[test]
    fn test_roots_and_accidentals() {
        assert_eq!(pronounce_chord("C"), "SEE");
        assert_eq!(pronounce_chord("F#"), "EFF SHARP");
        assert_eq!(pronounce_chord("Bb"), "BEE FLAT");
        assert_eq!(pronounce_chord("E♭"), "EEE FLAT");
        assert_eq!(pronounce_chord("C#min7"), "SEE SHARP MINOR SEVEN");
    }

    #[test]
    fn test_qualities_prefer_longest() {
        assert_eq!(pronounce_chord("Cmaj7"), "SEE MAJOR SEVEN");
        assert_eq!(pronounce_chord("Cmaj9"), "SEE MAJOR NINE");
        assert_eq!(pronounce_chord("Bbsus4"), "BEE FLAT SUSPENDED FOUR");
        assert_eq!(pronounce_chord("Dsus"), "DEE SUSPENDED");
        assert_eq!(pronounce_chord("Gadd9"), "GEE ADD NINE");
        assert_eq!(pronounce_chord("Am"), "AYE MINOR");
        assert_eq!(pronounce_chord("A minor"), "AYE MINOR");
        assert_eq!(pronounce_chord("Edim"), "EEE DIMINISHED");
        assert_eq!(pronounce_chord("G13"), "GEE THIRTEEN");
    }

    #[test]
    fn test_shorthand_quality_is_case_sensitive() {
        assert_eq!(pronounce_chord("CM7"), "SEE MAJOR SEVEN");
        assert_eq!(pronounce_chord("CM"), "SEE MAJOR");
        assert_eq!(pronounce_chord("Cm7"), "SEE MINOR SEVEN");
        assert_eq!(pronounce_chord("F#m"), "EFF SHARP MINOR");
        assert_eq!(pronounce_chord("CMaj7"), "SEE MAJOR SEVEN");
        assert_eq!(pronounce_chord("CMin"), "SEE MINOR");
    }

    #[test]
    fn test_unknown_suffix_is_literal() {
        assert_eq!(pronounce_chord("C/E"), "SEE /e");
        assert_eq!(pronounce_chord("Cm7b5"), "SEE MINOR SEVEN b5");
        assert_eq!(pronounce_chord("Cxyz"), "SEE xyz");
    }

    #[test]
    fn test_no_chord_marker() {
        assert_eq!(pronounce_chord(""), NO_CHORD_TEXT);
        assert_eq!(pronounce_chord("N"), NO_CHORD_TEXT);
        assert_eq!(pronounce_chord("H7"), NO_CHORD_TEXT);
        assert_eq!(pronounce_chord("   "), NO_CHORD_TEXT);
    }

    #[test]
    fn test_every_legal_label_is_spoken() {
        let qualities = ["", "maj7", "min7", "maj", "min", "aug", "dim", "sus4", "sus2", "sus", "add"];
        for root in ['A', 'B', 'C', 'D', 'E', 'F', 'G'] {
            for acc in ["", "#", "b"] {
                for quality in qualities {
                    let label = format!("{root}{acc}{quality}");
                    let spoken = pronounce_chord(&label);
                    assert!(!spoken.is_empty());
                    assert_ne!(spoken, NO_CHORD_TEXT, "{label}");
                    assert_eq!(spoken, pronounce_chord(&label));
                }
            }
        }
    }

    #[test]
    fn test_filler_by_gap() {
        let wide = vec![seg("C", 0.0, 1.0), seg("G", 3.5, 5.0), seg("G", 5.6, 6.0)];
        assert_eq!(filler_phrase(&wide, 0), Some("WE START WITH"));
        assert_eq!(filler_phrase(&wide, 1), Some("BACK TO"));
        assert_eq!(filler_phrase(&wide, 2), None);

        let medium = vec![seg("C", 0.0, 1.0), seg("C", 2.5, 3.0)];
        assert_eq!(filler_phrase(&medium, 0), Some("STAY ON"));

        let tight = vec![seg("C", 0.0, 2.0), seg("G", 2.0, 4.0)];
        assert_eq!(filler_phrase(&tight, 0), None);
    }

    #[test]
    fn test_utterance_text() {
        let segments = vec![seg("C", 0.0, 1.0), seg("Am", 2.5, 3.0)];
        assert_eq!(utterance_text(&segments, 0, true), "NOW GO TO SEE");
        assert_eq!(utterance_text(&segments, 0, false), "SEE");
        assert_eq!(utterance_text(&segments, 1, true), "AYE MINOR");
    }
}
