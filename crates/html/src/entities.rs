/// Decode a small, explicitly limited subset of HTML character references.
///
/// Contract:
/// - Named references: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`, `&copy;`.
/// - Numeric references only when semicolon-terminated: `&#123;` and `&#x1F4A9;`.
/// - Anything else (unknown names, missing `;`, invalid scalar values) passes through unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    const NAMED: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&nbsp;", '\u{00A0}'),
        ("&copy;", '\u{00A9}'),
    ];
    // Longest numeric reference we accept: `&#x10FFFF;` / `&#1114111;`.
    const MAX_DIGITS: usize = 7;

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        if let Some((entity, ch)) = NAMED.iter().find(|(name, _)| tail.starts_with(name)) {
            out.push(*ch);
            rest = &tail[entity.len()..];
            continue;
        }

        if let Some(numeric) = tail.strip_prefix("&#") {
            let (digits, radix) = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => (hex, 16),
                None => (numeric, 10),
            };
            let prefix_len = tail.len() - digits.len();
            let decoded = digits.find(';').filter(|&end| end > 0 && end <= MAX_DIGITS).and_then(
                |end| {
                    u32::from_str_radix(&digits[..end], radix)
                        .ok()
                        .and_then(char::from_u32)
                        .map(|ch| (ch, end))
                },
            );
            if let Some((ch, end)) = decoded {
                out.push(ch);
                rest = &tail[prefix_len + end + 1..];
                continue;
            }
        }

        out.push('&');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}
