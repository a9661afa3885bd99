use super::escape::push_escaped;

/// A run of identical delimiter characters that may open or close emphasis.
///
/// Runs still able to pair up form a doubly linked list through `prev` and
/// `next`; a run is unlinked once it is used up or can no longer match.
#[derive(Debug)]
struct Delim {
    ch: char,
    // Characters not yet consumed by a match; these render literally.
    len: usize,
    orig_len: usize,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
    open_tags: Vec<&'static str>,
    close_tags: Vec<&'static str>,
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Delim(usize),
}

fn is_delim_char(c: char) -> bool {
    matches!(c, '*' | '_' | '~' | '=')
}

// Only exact double runs of these act as delimiters.
fn is_fixed_width(c: char) -> bool {
    matches!(c, '~' | '=')
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

// Line boundaries count as whitespace.
fn is_space(c: Option<char>) -> bool {
    c.map_or(true, char::is_whitespace)
}

fn is_punct(c: Option<char>) -> bool {
    c.is_some_and(is_punctuation)
}

fn flanking(ch: char, prev: Option<char>, next: Option<char>) -> (bool, bool) {
    let left = !is_space(next) && (!is_punct(next) || is_space(prev) || is_punct(prev));
    let right = !is_space(prev) && (!is_punct(prev) || is_space(next) || is_punct(next));

    if ch == '_' {
        (left && (!right || is_punct(prev)), right && (!left || is_punct(next)))
    } else {
        (left, right)
    }
}

fn tag_for(ch: char, width: usize) -> &'static str {
    match (ch, width) {
        ('~', _) => "del",
        ('=', _) => "mark",
        (_, 2) => "strong",
        _ => "em",
    }
}

fn tokenize(line: &str) -> (Vec<Piece>, Vec<Delim>) {
    let chars: Vec<char> = line.chars().collect();
    let mut pieces = Vec::new();
    let mut delims = Vec::new();
    let mut text = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            match chars.get(i + 1) {
                Some(&next) if next.is_ascii_punctuation() => {
                    push_escaped(&mut text, next);
                    i += 2;
                }
                _ => {
                    text.push('\\');
                    i += 1;
                }
            }
            continue;
        }

        if !is_delim_char(c) {
            push_escaped(&mut text, c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == c {
            i += 1;
        }
        let len = i - start;

        if is_fixed_width(c) && len != 2 {
            text.extend(std::iter::repeat(c).take(len));
            continue;
        }

        let prev = start.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i).copied();
        let (can_open, can_close) = flanking(c, prev, next);

        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(&mut text)));
        }
        let idx = delims.len();
        pieces.push(Piece::Delim(idx));
        delims.push(Delim {
            ch: c,
            len,
            orig_len: len,
            can_open,
            can_close,
            prev: idx.checked_sub(1),
            next: None,
            open_tags: Vec::new(),
            close_tags: Vec::new(),
        });
        if let Some(prev) = idx.checked_sub(1) {
            delims[prev].next = Some(idx);
        }
    }

    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    (pieces, delims)
}

fn unlink(delims: &mut [Delim], idx: usize) {
    let (prev, next) = (delims[idx].prev, delims[idx].next);
    if let Some(p) = prev {
        delims[p].next = next;
    }
    if let Some(n) = next {
        delims[n].prev = prev;
    }
}

const BOTTOM_SLOTS: usize = 4 * 2 * 3;

// Closers sharing a slot see exactly the same candidate openers.
fn bottom_slot(closer: &Delim) -> usize {
    let kind = match closer.ch {
        '*' => 0,
        '_' => 1,
        '~' => 2,
        _ => 3,
    };
    (kind * 2 + usize::from(closer.can_open)) * 3 + closer.orig_len % 3
}

// A run that can both open and close does not pair with one whose combined
// length is a multiple of 3, unless both lengths are.
fn breaks_rule_of_three(opener: &Delim, closer: &Delim) -> bool {
    !is_fixed_width(closer.ch)
        && (opener.can_close || closer.can_open)
        && (opener.orig_len + closer.orig_len) % 3 == 0
        && !(opener.orig_len % 3 == 0 && closer.orig_len % 3 == 0)
}

/// Nearest linked opener for `closer` at or above index `floor`.
fn find_opener(delims: &[Delim], closer: usize, floor: usize) -> Option<usize> {
    let c = &delims[closer];
    let mut cursor = c.prev;
    while let Some(i) = cursor.filter(|&i| i >= floor) {
        let d = &delims[i];
        if d.can_open && d.ch == c.ch && !breaks_rule_of_three(d, c) {
            return Some(i);
        }
        cursor = d.prev;
    }
    None
}

/// Pair openers with closers. Every run is unlinked at most once and no
/// stretch of the list is searched twice for the same kind of closer, so
/// this stays linear in the number of runs.
fn resolve(delims: &mut [Delim]) {
    let mut openers_bottom = [0usize; BOTTOM_SLOTS];
    let mut cursor = if delims.is_empty() { None } else { Some(0) };

    while let Some(closer) = cursor {
        if !delims[closer].can_close {
            cursor = delims[closer].next;
            continue;
        }

        let slot = bottom_slot(&delims[closer]);
        let Some(opener) = find_opener(delims, closer, openers_bottom[slot]) else {
            // Nothing below this closer can ever match its kind again
            openers_bottom[slot] = closer;
            cursor = delims[closer].next;
            if !delims[closer].can_open {
                unlink(delims, closer);
            }
            continue;
        };

        let ch = delims[closer].ch;
        let width = if is_fixed_width(ch) || (delims[opener].len >= 2 && delims[closer].len >= 2) {
            2
        } else {
            1
        };
        let tag = tag_for(ch, width);

        delims[opener].len -= width;
        delims[opener].open_tags.push(tag);
        delims[closer].len -= width;
        delims[closer].close_tags.push(tag);

        // Anything left between a matched pair can no longer pair up.
        delims[opener].next = Some(closer);
        delims[closer].prev = Some(opener);

        if delims[opener].len == 0 {
            unlink(delims, opener);
        }
        if delims[closer].len == 0 {
            cursor = delims[closer].next;
            unlink(delims, closer);
        }
    }
}

/// Render one line of inline Markdown into `out`. Unmatched delimiters are
/// emitted as literal text.
pub(super) fn render_inline(line: &str, out: &mut String) {
    let (pieces, mut delims) = tokenize(line);
    resolve(&mut delims);

    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(&text),
            Piece::Delim(idx) => {
                let d = &delims[idx];
                for tag in &d.close_tags {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                out.extend(std::iter::repeat(d.ch).take(d.len));
                for tag in d.open_tags.iter().rev() {
                    out.push('<');
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
    }
}
