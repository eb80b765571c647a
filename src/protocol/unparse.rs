//! Reply-text codec.
//!
//! Compiler replies wrap lists in `{ ... }` and separate elements with
//! commas, but elements may themselves contain braces, quotes, and commas.
//! The splitters here work purely on delimiter state (quote depth, brace
//! depth) and never interpret the element text, so whatever the compiler
//! sent comes back out byte-for-byte.

// ============================================================================
// OUTER DELIMITERS
// ============================================================================

/// Strip one pair of outer braces, if present. Whitespace around the pair is
/// trimmed; inner text is untouched.
pub fn strip_outer_braces(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Strip one pair of outer double quotes, if present.
pub fn strip_outer_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Strip one pair of outer parentheses, if present.
pub fn strip_outer_parens(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Replace escaped quotes (`\"`) with plain quotes.
pub fn replace_spec_chars(text: &str) -> String {
    text.replace("\\\"", "\"")
}

// ============================================================================
// LIST SPLITTERS
// ============================================================================

/// Split a reply whose *elements* are themselves brace groups.
///
/// The outer braces are stripped first, then the text is scanned for
/// top-level `{ ... }` spans. A span runs from a `{` seen at depth zero
/// (outside quotes) to the `}` that closes it with no pending nested group;
/// the span is captured verbatim, braces included. Text between spans
/// (separators, whitespace) is discarded.
pub fn unparse_arrays(reply: &str) -> Vec<String> {
    let body = strip_outer_braces(reply);
    let chars: Vec<char> = body.chars().collect();

    let mut groups = Vec::new();
    let mut qopen = false;
    let mut braceopen = false;
    let mut subbraceopen = false;
    let mut mainbraceopen = 0usize;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            ' ' | ',' => continue,
            '{' => {
                if !qopen && !braceopen {
                    braceopen = true;
                    mainbraceopen = i;
                } else {
                    subbraceopen = true;
                }
            }
            '}' => {
                if braceopen && !qopen && !subbraceopen {
                    groups.push(chars[mainbraceopen..=i].iter().collect());
                    braceopen = false;
                } else {
                    subbraceopen = false;
                }
            }
            '"' => qopen = !qopen,
            _ => {}
        }
    }
    groups
}

/// Split a flat brace list into element strings.
///
/// Commas inside quoted or brace-wrapped elements do not split: a token that
/// opens a quote or brace without closing it starts a *composed* element, and
/// subsequent tokens are re-joined with commas until the closer appears.
pub fn unparse_strings(reply: &str) -> Vec<String> {
    split_joining(reply, true)
}

/// Like [`unparse_strings`], but for component records: the fragments of a
/// split quoted element are re-joined *without* the comma (the compiler only
/// quotes commas it does not mean), while brace-wrapped elements keep theirs.
pub fn unparse_component_strings(reply: &str) -> Vec<String> {
    split_joining(reply, false)
}

fn split_joining(reply: &str, comma_in_quotes: bool) -> Vec<String> {
    let trimmed = reply.trim();
    let body = match trimmed.find('{') {
        Some(open) => {
            let after_open = format!("{}{}", &trimmed[..open], &trimmed[open + 1..]);
            match after_open.rfind('}') {
                Some(close) => after_open[..close].to_string(),
                None => after_open,
            }
        }
        None => trimmed.to_string(),
    };

    let mut out = Vec::new();
    let mut composed: Option<String> = None;

    for token in body.split(',') {
        match composed.take() {
            None => {
                let opens = (token.starts_with('"') || token.starts_with('{'))
                    && !token.ends_with('"')
                    && !token.ends_with('}');
                if opens {
                    composed = Some(token.to_string());
                } else {
                    out.push(token.trim().to_string());
                }
            }
            Some(pending) => {
                if !(token.ends_with('"') || token.ends_with('}')) {
                    composed = Some(format!("{pending},{token}"));
                    continue;
                }
                // the closing join is where the two modes differ: quoted
                // fragments re-glue without their comma, dimension lists
                // keep it
                let join_comma =
                    comma_in_quotes || (pending.starts_with('{') && token.ends_with('}'));
                let sep = if join_comma { "," } else { "" };
                out.push(format!("{pending}{sep}{token}").trim().to_string());
            }
        }
    }
    if let Some(pending) = composed {
        out.push(pending);
    }
    out
}

/// Split a `connect` equation body into its two endpoint names.
///
/// Input is the raw equation text; braces and quotes are stripped, the two
/// ends split on the comma, each end trimmed.
pub fn connect_ends(text: &str) -> Option<(String, String)> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '"'))
        .collect();
    let (left, right) = cleaned.split_once(',')?;
    Some((left.trim().to_string(), right.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_capture_top_level_groups_verbatim() {
        let reply = "{{Real,x,\"\",public},{Integer,n,\"a,b\",public}}";
        let groups = unparse_arrays(reply);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], "{Real,x,\"\",public}");
        assert_eq!(groups[1], "{Integer,n,\"a,b\",public}");
    }

    #[test]
    fn arrays_skip_nested_braces() {
        let reply = "{{a,{1,2},b},{c}}";
        let groups = unparse_arrays(reply);
        assert_eq!(groups, vec!["{a,{1,2},b}", "{c}"]);
    }

    #[test]
    fn arrays_keep_quoted_commas_verbatim() {
        let reply = "{{x,\"a, b\"},{y}}";
        let groups = unparse_arrays(reply);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], "{x,\"a, b\"}");
    }

    #[test]
    fn strings_keep_quoted_commas() {
        let fields = unparse_strings("{model,\"a, b\",false}");
        assert_eq!(fields, vec!["model", "\"a, b\"", "false"]);
    }

    #[test]
    fn strings_keep_braced_commas() {
        let fields = unparse_strings("{x,{1,2,3},y}");
        assert_eq!(fields, vec!["x", "{1,2,3}", "y"]);
    }

    #[test]
    fn component_strings_drop_comma_in_quoted_fragments() {
        let fields = unparse_component_strings("{Real,x,\"a,b\",public}");
        assert_eq!(fields, vec!["Real", "x", "\"ab\"", "public"]);
    }

    #[test]
    fn component_strings_keep_comma_in_brace_fragments() {
        let fields = unparse_component_strings("{Real,x,{2,3},public}");
        assert_eq!(fields, vec!["Real", "x", "{2,3}", "public"]);
    }

    #[test]
    fn strip_helpers_only_remove_matched_pairs() {
        assert_eq!(strip_outer_braces("{a,b}"), "a,b");
        assert_eq!(strip_outer_braces("a,b"), "a,b");
        assert_eq!(strip_outer_quotes("\"hi\""), "hi");
        assert_eq!(strip_outer_quotes("hi\""), "hi\"");
        assert_eq!(strip_outer_parens("(a = 1)"), "a = 1");
        assert_eq!(strip_outer_parens("f(x)"), "f(x)");
        assert_eq!(replace_spec_chars("a=\\\"b\\\""), "a=\"b\"");
    }

    #[test]
    fn connect_ends_split_on_comma() {
        let (a, b) = connect_ends("r1.p, ground.p").unwrap();
        assert_eq!(a, "r1.p");
        assert_eq!(b, "ground.p");
        assert!(connect_ends("no comma here").is_none());
    }
}
