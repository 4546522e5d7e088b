//! Timed-lyric (LRC) parsing and playback-position lookup.
//!
//! Lines look like `[01:02.50]some text`; the timestamp is minutes, seconds
//! and a 2-digit centisecond or 3-digit millisecond fraction. Lines without a
//! parseable tag, and lines whose text is empty after stripping tags, carry no
//! displayable content and are dropped.

/// One displayable lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Playback time in seconds at which this line becomes current.
    pub time: f64,
    /// Display text, bracketed tags stripped.
    pub text: String,
}

/// Parse LRC text into lines sorted ascending by time.
///
/// The first parseable tag on a line supplies its time; every bracketed span
/// is stripped from the display text. The sort is stable, so lines sharing a
/// timestamp keep their file order.
pub fn parse_lrc(input: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();
    for raw in input.lines() {
        let Some(time) = first_tag_time(raw) else {
            continue;
        };
        let text = strip_tags(raw);
        if text.is_empty() {
            continue;
        }
        lines.push(LyricLine { time, text });
    }
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Index of the line current at `t` seconds: the last line whose time is
/// `<= t`, or `None` before the first line.
pub fn active_line(lyrics: &[LyricLine], t: f64) -> Option<usize> {
    let mut active = None;
    for (i, line) in lyrics.iter().enumerate() {
        if line.time <= t {
            active = Some(i);
        } else {
            break;
        }
    }
    active
}

/// Time of the first `[mm:ss.xx]` / `[mm:ss.xxx]` tag on the line, if any.
fn first_tag_time(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some(time) = parse_tag(&line[i..]) {
                return Some(time);
            }
        }
        i += 1;
    }
    None
}

/// Parse one tag starting at a `[`.
fn parse_tag(s: &str) -> Option<f64> {
    let inner = s.strip_prefix('[')?;
    let close = inner.find(']')?;
    let body = &inner[..close];

    let (mins, rest) = body.split_once(':')?;
    let (secs, frac) = rest.split_once('.')?;

    if mins.is_empty() || !mins.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let divisor = match frac.len() {
        2 => 100.0,
        3 => 1000.0,
        _ => return None,
    };

    let mins: f64 = mins.parse().ok()?;
    let secs: f64 = secs.parse().ok()?;
    let frac: f64 = frac.parse().ok()?;
    Some(mins * 60.0 + secs + frac / divisor)
}

/// Remove every `[...]` span from the line and trim whitespace.
fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut depth_open: Option<usize> = None;
    for (i, ch) in line.char_indices() {
        match ch {
            '[' => depth_open = Some(i),
            ']' => {
                if depth_open.take().is_none() {
                    out.push(ch);
                }
            }
            _ => {
                if depth_open.is_none() {
                    out.push(ch);
                }
            }
        }
    }
    out.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_centisecond_tag() {
        let lines = parse_lrc("[01:02.50]hello");
        assert_eq!(lines.len(), 1);
        assert!((lines[0].time - 62.5).abs() < 1e-9);
        assert_eq!(lines[0].text, "hello");
    }

    #[test]
    fn parses_millisecond_tag() {
        let lines = parse_lrc("[00:10.500]test");
        assert_eq!(lines.len(), 1);
        assert!((lines[0].time - 10.5).abs() < 1e-9);
        assert_eq!(lines[0].text, "test");
    }

    #[test]
    fn drops_untagged_and_empty_lines() {
        let input = "no tag here\n[00:01.00]\n[00:02.00]   \n[00:03.00]kept";
        let lines = parse_lrc(input);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "kept");
    }

    #[test]
    fn strips_every_bracketed_span() {
        let lines = parse_lrc("[00:05.00][00:06.00] doubled up");
        assert_eq!(lines.len(), 1);
        // First tag wins for timing.
        assert!((lines[0].time - 5.0).abs() < 1e-9);
        assert_eq!(lines[0].text, "doubled up");
    }

    #[test]
    fn sorts_out_of_order_input_stably() {
        let input = "[00:10.00]second\n[00:05.00]first\n[00:10.00]third";
        let lines = parse_lrc(input);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].text, "second");
        assert_eq!(lines[2].text, "third");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(parse_lrc("[ab:cd.ef]nope").is_empty());
        assert!(parse_lrc("[00:10.5]one digit frac").is_empty());
        assert!(parse_lrc("[0010.50]no colon").is_empty());
    }

    #[test]
    fn active_line_selection() {
        let lyrics = vec![
            LyricLine { time: 0.0, text: "a".into() },
            LyricLine { time: 5.0, text: "b".into() },
            LyricLine { time: 10.0, text: "c".into() },
        ];
        assert_eq!(active_line(&lyrics, -1.0), None);
        assert_eq!(active_line(&lyrics, 0.0), Some(0));
        assert_eq!(active_line(&lyrics, 7.0), Some(1));
        assert_eq!(active_line(&lyrics, 10.0), Some(2));
        assert_eq!(active_line(&lyrics, 100.0), Some(2));
        assert_eq!(active_line(&[], 3.0), None);
    }
}
