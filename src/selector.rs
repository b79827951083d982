//! CSS selector subset used by discovery and ref resolution.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors (`[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`),
//! the structural pseudo-classes `:root`, `:empty`, `:first-child`,
//! `:last-child`, `:only-child`, `:nth-child(an+b)`, `:nth-last-child(an+b)`,
//! negation `:not(list)`, all four combinators (` `, `>`, `+`, `~`), CSS
//! escapes in identifiers, and comma-separated selector lists.
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError(pub String);

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    Attr { name: String, op: AttrOp, value: String },
    Root,
    Empty,
    OnlyChild,
    /// `a*n + b` for some `n >= 0`, counted from the start or from the end.
    Nth { a: i64, b: i64, from_end: bool },
    Not(Vec<Complex>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

type Compound = Vec<Simple>;

/// One complex selector: `first (combinator compound)*`, stored left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    first: Compound,
    rest: Vec<(Combinator, Compound)>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

/// Read access the matcher needs from a tree.
pub(crate) trait SelectorTarget {
    fn tag(&self, el: usize) -> &str;
    fn attr(&self, el: usize, name: &str) -> Option<&str>;
    fn parent(&self, el: usize) -> Option<usize>;
    fn prev_sibling(&self, el: usize) -> Option<usize>;
    fn child_count(&self, el: usize) -> usize;
    /// 1-based position among siblings and the sibling count; `(1, 1)` without a parent.
    fn position(&self, el: usize) -> (usize, usize);
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(input);
        let alternatives = parser.parse_list(false)?;
        Ok(Self { alternatives })
    }

    /// `[name]`, built directly so attribute names never go through the parser.
    pub fn has_attribute(name: &str) -> Self {
        Self {
            alternatives: vec![Complex {
                first: vec![Simple::Attr {
                    name: name.to_ascii_lowercase(),
                    op: AttrOp::Exists,
                    value: String::new(),
                }],
                rest: Vec::new(),
            }],
        }
    }

    pub(crate) fn matches<T: SelectorTarget + ?Sized>(&self, tree: &T, el: usize) -> bool {
        any_matches(&self.alternatives, tree, el)
    }
}

fn any_matches<T: SelectorTarget + ?Sized>(list: &[Complex], tree: &T, el: usize) -> bool {
    list.iter().any(|c| c.matches(tree, el))
}

impl Complex {
    fn matches<T: SelectorTarget + ?Sized>(&self, tree: &T, el: usize) -> bool {
        // Walk right to left: the last compound must match `el` itself.
        let mut chain: Vec<&Compound> = Vec::with_capacity(self.rest.len() + 1);
        let mut combinators: Vec<Combinator> = Vec::with_capacity(self.rest.len());
        chain.push(&self.first);
        for (comb, compound) in &self.rest {
            combinators.push(*comb);
            chain.push(compound);
        }
        match_from(tree, el, &chain, &combinators)
    }
}

fn match_from<T: SelectorTarget + ?Sized>(
    tree: &T,
    el: usize,
    chain: &[&Compound],
    combinators: &[Combinator],
) -> bool {
    let Some((last, head)) = chain.split_last() else {
        return true;
    };
    if !compound_matches(tree, el, last) {
        return false;
    }
    let Some((comb, comb_head)) = combinators.split_last() else {
        return head.is_empty();
    };
    let step: fn(&T, usize) -> Option<usize> = match comb {
        Combinator::Child | Combinator::Descendant => T::parent,
        Combinator::NextSibling | Combinator::SubsequentSibling => T::prev_sibling,
    };
    let repeat = matches!(comb, Combinator::Descendant | Combinator::SubsequentSibling);
    let mut cur = step(tree, el);
    while let Some(candidate) = cur {
        if match_from(tree, candidate, head, comb_head) {
            return true;
        }
        if !repeat {
            break;
        }
        cur = step(tree, candidate);
    }
    false
}

fn nth_matches(a: i64, b: i64, pos: i64) -> bool {
    if a == 0 {
        return pos == b;
    }
    let diff = pos - b;
    diff % a == 0 && diff / a >= 0
}

fn compound_matches<T: SelectorTarget + ?Sized>(tree: &T, el: usize, compound: &Compound) -> bool {
    compound.iter().all(|simple| match simple {
        Simple::Universal => true,
        Simple::Type(t) => tree.tag(el).eq_ignore_ascii_case(t),
        Simple::Id(id) => tree.attr(el, "id") == Some(id.as_str()),
        Simple::Class(class) => tree
            .attr(el, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class)),
        Simple::Attr { name, op, value } => match tree.attr(el, name) {
            None => false,
            Some(actual) => match op {
                AttrOp::Exists => true,
                AttrOp::Equals => actual == value,
                AttrOp::Includes => actual.split_ascii_whitespace().any(|w| w == value),
                AttrOp::Prefix => !value.is_empty() && actual.starts_with(value.as_str()),
                AttrOp::Suffix => !value.is_empty() && actual.ends_with(value.as_str()),
                AttrOp::Contains => !value.is_empty() && actual.contains(value.as_str()),
            },
        },
        Simple::Root => tree.parent(el).is_none(),
        Simple::Empty => tree.child_count(el) == 0,
        Simple::OnlyChild => tree.position(el).1 == 1,
        Simple::Nth { a, b, from_end } => {
            let (pos, count) = tree.position(el);
            let pos = if *from_end { count + 1 - pos } else { pos };
            nth_matches(*a, *b, pos as i64)
        }
        Simple::Not(list) => !any_matches(list, tree, el),
    })
}

/// Parses the inside of `:nth-child(...)`: `odd`, `even`, `b`, `an`, `an+b`.
fn parse_nth(raw: &str) -> Option<(i64, i64)> {
    let s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match s.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        "" => return None,
        _ => {}
    }
    match s.split_once('n') {
        None => s.parse().ok().map(|b| (0, b)),
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let b = match b {
                "" => 0,
                other if other.starts_with(['+', '-']) => other.parse().ok()?,
                _ => return None,
            };
            Some((a, b))
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<Chars<'a>>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().peekable(),
        }
    }

    fn err(&self, msg: &str) -> SelectorError {
        SelectorError(format!("{msg} in selector {:?}", self.src))
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    /// Identifier with CSS escapes: `\:` is a literal colon, `\31 ` is code point 0x31.
    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            self.chars.next();
            if c != '\\' {
                out.push(c);
                continue;
            }
            let mut hex = String::new();
            while hex.len() < 6 && self.chars.peek().is_some_and(|h| h.is_ascii_hexdigit()) {
                hex.extend(self.chars.next());
            }
            if hex.is_empty() {
                match self.chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.err("dangling escape")),
                }
            } else {
                let code = u32::from_str_radix(&hex, 16).map_err(|_| self.err("bad escape"))?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                // one whitespace terminates a hex escape
                if self.chars.peek().is_some_and(|w| w.is_whitespace()) {
                    self.chars.next();
                }
            }
        }
        if out.is_empty() {
            return Err(self.err("expected identifier"));
        }
        Ok(out)
    }

    /// A comma-separated list, ending at end of input or, when `nested`, at `)`.
    fn parse_list(&mut self, nested: bool) -> Result<Vec<Complex>, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_ws();
            alternatives.push(self.parse_complex()?);
            match self.chars.next() {
                None if !nested => break,
                Some(')') if nested => break,
                Some(',') => continue,
                None => return Err(self.err("unclosed '('")),
                Some(c) => return Err(self.err(&format!("unexpected {c:?}"))),
            }
        }
        Ok(alternatives)
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let first = self.parse_compound()?;
        let mut rest = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let comb = match self.chars.peek() {
                None | Some(',') | Some(')') => break,
                Some(&c @ ('>' | '+' | '~')) => {
                    self.chars.next();
                    self.skip_ws();
                    match c {
                        '>' => Combinator::Child,
                        '+' => Combinator::NextSibling,
                        _ => Combinator::SubsequentSibling,
                    }
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(&c) => return Err(self.err(&format!("unexpected {c:?}"))),
            };
            rest.push((comb, self.parse_compound()?));
        }
        Ok(Complex { first, rest })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Vec::new();
        match self.chars.peek() {
            Some('*') => {
                self.chars.next();
                compound.push(Simple::Universal);
            }
            Some(&c) if is_ident_char(c) => {
                compound.push(Simple::Type(self.ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            match self.chars.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.push(Simple::Id(self.ident()?));
                }
                Some('.') => {
                    self.chars.next();
                    compound.push(Simple::Class(self.ident()?));
                }
                Some('[') => {
                    self.chars.next();
                    compound.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.chars.next();
                    compound.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.err("empty compound selector"));
        }
        Ok(compound)
    }

    fn parse_pseudo(&mut self) -> Result<Simple, SelectorError> {
        let name = self.ident()?.to_ascii_lowercase();
        let simple = match name.as_str() {
            "root" => Simple::Root,
            "empty" => Simple::Empty,
            "only-child" => Simple::OnlyChild,
            "first-child" => Simple::Nth { a: 0, b: 1, from_end: false },
            "last-child" => Simple::Nth { a: 0, b: 1, from_end: true },
            "nth-child" | "nth-last-child" => {
                self.expect_open_paren()?;
                let mut raw = String::new();
                loop {
                    match self.chars.next() {
                        Some(')') => break,
                        Some(c) => raw.push(c),
                        None => return Err(self.err("unclosed '('")),
                    }
                }
                let (a, b) = parse_nth(&raw)
                    .ok_or_else(|| self.err(&format!("bad :{name} argument {raw:?}")))?;
                Simple::Nth {
                    a,
                    b,
                    from_end: name == "nth-last-child",
                }
            }
            "not" => {
                self.expect_open_paren()?;
                Simple::Not(self.parse_list(true)?)
            }
            other => return Err(self.err(&format!("unsupported pseudo-class :{other}"))),
        };
        Ok(simple)
    }

    fn expect_open_paren(&mut self) -> Result<(), SelectorError> {
        if self.chars.next() != Some('(') {
            return Err(self.err("expected '('"));
        }
        Ok(())
    }

    fn parse_attr(&mut self) -> Result<Simple, SelectorError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let op = match self.chars.next() {
            Some(']') => {
                return Ok(Simple::Attr {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                })
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '^' | '$' | '*')) => {
                if self.chars.next() != Some('=') {
                    return Err(self.err("expected '=' in attribute selector"));
                }
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Contains,
                }
            }
            _ => return Err(self.err("bad attribute selector")),
        };
        self.skip_ws();
        let value = match self.chars.peek() {
            Some(&q @ ('"' | '\'')) => {
                self.chars.next();
                let mut v = String::new();
                loop {
                    match self.chars.next() {
                        Some(c) if c == q => break,
                        Some('\\') => match self.chars.next() {
                            Some(escaped) => v.push(escaped),
                            None => return Err(self.err("unterminated string")),
                        },
                        Some(c) => v.push(c),
                        None => return Err(self.err("unterminated string")),
                    }
                }
                v
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        if self.chars.next() != Some(']') {
            return Err(self.err("expected ']'"));
        }
        Ok(Simple::Attr { name, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_and_combinators() {
        let sel = Selector::parse("div.card > button#go[data-x='1'], span").unwrap();
        assert_eq!(sel.alternatives.len(), 2);
        let first = &sel.alternatives[0];
        assert_eq!(first.first, vec![Simple::Type("div".into()), Simple::Class("card".into())]);
        assert_eq!(first.rest.len(), 1);
        assert_eq!(first.rest[0].0, Combinator::Child);
        assert_eq!(first.rest[0].1.len(), 3);
    }

    #[test]
    fn descendant_needs_whitespace() {
        let sel = Selector::parse("ul  li").unwrap();
        assert_eq!(sel.alternatives[0].rest[0].0, Combinator::Descendant);
    }

    #[test]
    fn sibling_combinators() {
        let sel = Selector::parse("h2 + p ~ span").unwrap();
        let combs: Vec<Combinator> = sel.alternatives[0].rest.iter().map(|(c, _)| *c).collect();
        assert_eq!(combs, [Combinator::NextSibling, Combinator::SubsequentSibling]);
        assert!(Selector::parse("h2+p").is_ok());
    }

    #[test]
    fn escapes_in_identifiers() {
        let sel = Selector::parse(r"#a\:b").unwrap();
        assert_eq!(sel.alternatives[0].first, vec![Simple::Id("a:b".into())]);
        let sel = Selector::parse(r"#\31 23").unwrap();
        assert_eq!(sel.alternatives[0].first, vec![Simple::Id("123".into())]);
        let sel = Selector::parse(r".w-1\/2").unwrap();
        assert_eq!(sel.alternatives[0].first, vec![Simple::Class("w-1/2".into())]);
    }

    #[test]
    fn structural_pseudo_classes() {
        let sel = Selector::parse("li:first-child:not(.x, [hidden])").unwrap();
        let first = &sel.alternatives[0].first;
        assert_eq!(first[1], Simple::Nth { a: 0, b: 1, from_end: false });
        assert!(matches!(&first[2], Simple::Not(list) if list.len() == 2));
    }

    #[test]
    fn nth_arguments() {
        assert_eq!(parse_nth("odd"), Some((2, 1)));
        assert_eq!(parse_nth(" EVEN "), Some((2, 0)));
        assert_eq!(parse_nth("3"), Some((0, 3)));
        assert_eq!(parse_nth("2n + 1"), Some((2, 1)));
        assert_eq!(parse_nth("-n+3"), Some((-1, 3)));
        assert_eq!(parse_nth("n"), Some((1, 0)));
        assert_eq!(parse_nth("3n-2"), Some((3, -2)));
        assert_eq!(parse_nth("2n1"), None);
        assert_eq!(parse_nth("x"), None);
        assert!(nth_matches(2, 1, 3));
        assert!(!nth_matches(2, 1, 4));
        assert!(nth_matches(-1, 3, 2));
        assert!(!nth_matches(-1, 3, 4));
    }

    #[test]
    fn rejects_garbage() {
        for bad in [
            "", "#", "div >", "[data-x", "a,,b", "[x~y]", "a!b", "[x=\"open]", "a:hover",
            ":not(a", ":nth-child(x)", "a)", "a +",
        ] {
            assert!(Selector::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn attribute_names_are_case_folded() {
        let sel = Selector::parse("[DATA-Plain-Module]").unwrap();
        assert_eq!(sel, Selector::has_attribute("data-plain-module"));
    }
}
