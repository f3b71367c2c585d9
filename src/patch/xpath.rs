//! Namespace-agnostic xpath rewriting.
//!
//! `//p:spPr/a:solidFill` becomes
//! `//*[local-name()='spPr']/*[local-name()='solidFill']`, which matches in
//! any namespace and needs no prefix bindings. Prefixed attribute tests
//! become `@*[local-name()='id']`. String literals, function names and axis
//! names are left alone.

/// Rewrite element and attribute name tests to `local-name()` predicates.
pub fn to_local_name_xpath(xpath: &str) -> String {
    let chars: Vec<(usize, char)> = xpath.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map_or(xpath.len(), |&(pos, _)| pos);
    let mut out = String::with_capacity(xpath.len() * 2);
    // Last significant character copied from the source, to tell name
    // tests apart from operators such as `and` or `div`.
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let (_, c) = chars[i];

        if c == '\'' || c == '"' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1 != c {
                j += 1;
            }
            let end = (j + 1).min(chars.len());
            out.push_str(&xpath[byte_at(i)..byte_at(end)]);
            prev = Some(c);
            i = end;
            continue;
        }

        if !is_name_start(c) {
            out.push(c);
            if !c.is_whitespace() {
                prev = Some(c);
            }
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i;
        while j < chars.len() && is_name_char(chars[j].1) {
            j += 1;
        }
        let mut local_start = start;
        let mut wildcard = false;
        let prefixed = j + 1 < chars.len() && chars[j].1 == ':' && chars[j + 1].1 != ':';
        if prefixed {
            if chars[j + 1].1 == '*' {
                wildcard = true;
                j += 2;
            } else if is_name_start(chars[j + 1].1) {
                local_start = j + 1;
                j += 1;
                while j < chars.len() && is_name_char(chars[j].1) {
                    j += 1;
                }
            }
        }

        let token = &xpath[byte_at(start)..byte_at(j)];
        let next = chars[j..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace());
        let is_axis = j + 1 < chars.len() && chars[j].1 == ':' && chars[j + 1].1 == ':';
        let is_function = next == Some('(');
        let in_step_position = matches!(prev, None | Some('/' | ':' | '[' | '(' | ',' | '|' | '@'));

        if is_axis || is_function || !in_step_position || (prefixed && local_start == start && !wildcard) {
            out.push_str(token);
        } else if wildcard {
            out.push('*');
        } else if prev == Some('@') {
            if local_start != start {
                push_local_name_test(&mut out, &xpath[byte_at(local_start)..byte_at(j)]);
            } else {
                out.push_str(token);
            }
        } else {
            push_local_name_test(&mut out, &xpath[byte_at(local_start)..byte_at(j)]);
        }

        prev = token.chars().last();
        i = j;
    }

    out
}

fn push_local_name_test(out: &mut String, local: &str) {
    out.push_str("*[local-name()='");
    out.push_str(local);
    out.push_str("']");
}

#[inline]
fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_steps() {
        assert_eq!(to_local_name_xpath("//p:spPr"), "//*[local-name()='spPr']");
        assert_eq!(
            to_local_name_xpath("/p:sld/p:cSld//a:srgbClr"),
            "/*[local-name()='sld']/*[local-name()='cSld']//*[local-name()='srgbClr']"
        );
    }

    #[test]
    fn test_attributes_and_predicates() {
        assert_eq!(
            to_local_name_xpath("//a:srgbClr[@val='FF0000']/@r:id"),
            "//*[local-name()='srgbClr'][@val='FF0000']/@*[local-name()='id']"
        );
        assert_eq!(
            to_local_name_xpath("//w:p[w:r and @w:rsidR]"),
            "//*[local-name()='p'][*[local-name()='r'] and @*[local-name()='rsidR']]"
        );
    }

    #[test]
    fn test_untouched_parts() {
        let already = "//*[local-name()='spPr']";
        assert_eq!(to_local_name_xpath(already), already);
        assert_eq!(to_local_name_xpath("count(//a:b) > 1"), "count(//*[local-name()='b']) > 1");
        assert_eq!(
            to_local_name_xpath("//a:t[text()='p:x']"),
            "//*[local-name()='t'][text()='p:x']"
        );
        assert_eq!(
            to_local_name_xpath("/descendant::a:ln"),
            "/descendant::*[local-name()='ln']"
        );
        assert_eq!(to_local_name_xpath("//p:*"), "//*");
    }

    #[test]
    fn test_unprefixed_steps() {
        assert_eq!(to_local_name_xpath("/root/item"), "/*[local-name()='root']/*[local-name()='item']");
    }
}
