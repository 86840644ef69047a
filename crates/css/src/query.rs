//! Typed queries
//!
//! A [`Query`] is the compiled form of a selector group. Each compound
//! selector becomes a [`Step`] holding pre-conditions, tested on every
//! candidate as it is found, and post-conditions, tested against the
//! candidate's 1-based position among all candidates of that step.

use rustc_hash::FxHashMap;

use crate::error::{SelectorError, SelectorResult};
use crate::selector::{AttributeOp, Combinator, NamespacePrefix, Selector, SelectorParser, SelectorPart};
use crate::tokenizer::Token;

/// Prefix to namespace URI map used by `prefix|name` selectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces(FxHashMap<String, String>);

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.0.insert(prefix.into(), uri.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Namespaces {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Which namespaces a type test accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceMatch {
    Any,
    None,
    Uri(String),
}

/// Test on a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum PreCondition {
    /// Element name test; `name: None` is the universal selector
    Type {
        namespace: NamespaceMatch,
        name: Option<String>,
    },
    Id(String),
    Class(String),
    Attribute {
        name: String,
        op: Option<AttributeOp>,
        value: Option<String>,
        case_insensitive: bool,
    },
    Root,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Nth {
        a: i32,
        b: i32,
        from_end: bool,
        of_type: bool,
    },
    /// No child nodes and no text
    Empty,
    /// At least one child element
    Parent,
    Checked,
    Selected,
    Disabled,
    Enabled,
    /// `input` with the given `type`
    InputType(String),
    Button,
    Input,
    Header,
    Link,
    /// User-action states that never hold in a static tree
    Never,
    Not(Query),
}

/// Test on a candidate's position among its step's candidates
#[derive(Debug, Clone, PartialEq)]
pub enum PostCondition {
    First,
    Last,
    Even,
    Odd,
    Eq(i64),
    Gt(i64),
    Lt(i64),
    /// String value contains the text
    Contains(String),
    /// Some descendant matches the query
    Has(Query),
}

impl PostCondition {
    /// Position tests; `position` is 1-based, `count` the candidate total
    pub fn holds_at(&self, position: usize, count: usize) -> Option<bool> {
        // zero-based, so user indices are never offset
        let index = position.saturating_sub(1) as i64;
        let result = match self {
            PostCondition::First => position == 1,
            PostCondition::Last => position == count,
            PostCondition::Even => index % 2 == 0,
            PostCondition::Odd => index % 2 == 1,
            PostCondition::Eq(k) => index == *k,
            PostCondition::Gt(k) => index > *k,
            PostCondition::Lt(k) => index < *k,
            PostCondition::Contains(_) | PostCondition::Has(_) => return None,
        };
        Some(result)
    }
}

/// One compound selector and how it relates to the previous step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// `None` for the first step of a chain
    pub combinator: Option<Combinator>,
    pub conditions: Vec<PreCondition>,
    pub post_conditions: Vec<PostCondition>,
}

/// One comma-separated alternative
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub steps: Vec<Step>,
}

/// A compiled selector group
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub chains: Vec<Chain>,
    /// Compare element and attribute names exactly
    pub case_sensitive: bool,
}

impl Query {
    /// Compile with no namespaces and HTML name matching
    pub fn parse(input: &str) -> SelectorResult<Self> {
        Translator::new(&Namespaces::default(), false).translate(input)
    }
}

/// Compiles selector strings into queries
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    namespaces: &'a Namespaces,
    case_sensitive: bool,
}

impl<'a> Translator<'a> {
    pub fn new(namespaces: &'a Namespaces, case_sensitive: bool) -> Self {
        Self { namespaces, case_sensitive }
    }

    /// Compile a selector group; `[@attr]` is accepted as `[attr]`
    pub fn translate(&self, input: &str) -> SelectorResult<Query> {
        let input = strip_attribute_at(input);
        let selectors = Selector::parse_list(&input)?;
        self.translate_selectors(&selectors)
    }

    fn translate_selectors(&self, selectors: &[Selector]) -> SelectorResult<Query> {
        let chains = selectors
            .iter()
            .map(|s| self.translate_chain(s))
            .collect::<SelectorResult<Vec<_>>>()?;
        Ok(Query {
            chains,
            case_sensitive: self.case_sensitive,
        })
    }

    fn translate_chain(&self, selector: &Selector) -> SelectorResult<Chain> {
        let steps = selector
            .compounds()
            .into_iter()
            .map(|(combinator, parts)| self.translate_step(combinator, parts))
            .collect::<SelectorResult<Vec<_>>>()?;
        Ok(Chain { steps })
    }

    fn translate_step(&self, combinator: Option<Combinator>, parts: &[SelectorPart]) -> SelectorResult<Step> {
        let mut step = Step {
            combinator,
            conditions: Vec::new(),
            post_conditions: Vec::new(),
        };

        for part in parts {
            match part {
                SelectorPart::Universal(prefix) => {
                    let namespace = match prefix {
                        NamespacePrefix::Default => NamespaceMatch::Any,
                        other => self.resolve(other)?,
                    };
                    if namespace != NamespaceMatch::Any {
                        step.conditions.push(PreCondition::Type { namespace, name: None });
                    }
                }
                SelectorPart::Type { namespace, name } => {
                    step.conditions.push(PreCondition::Type {
                        namespace: self.resolve(namespace)?,
                        name: Some(self.fold_case(name)),
                    });
                }
                SelectorPart::Class(c) => step.conditions.push(PreCondition::Class(c.clone())),
                SelectorPart::Id(id) => step.conditions.push(PreCondition::Id(id.clone())),
                SelectorPart::Attribute { name, op, value, case_insensitive } => {
                    step.conditions.push(PreCondition::Attribute {
                        name: self.fold_case(name),
                        op: *op,
                        value: value.clone(),
                        case_insensitive: *case_insensitive,
                    });
                }
                SelectorPart::PseudoClass { name, args: None } => self.translate_pseudo(name, &mut step)?,
                SelectorPart::PseudoClass { name, args: Some(args) } => {
                    self.translate_function(name, args, &mut step)?
                }
                SelectorPart::PseudoElement(name) => {
                    return Err(SelectorError::UnsupportedPseudoElement(name.clone()));
                }
                SelectorPart::Combinator(_) => {}
            }
        }

        Ok(step)
    }

    fn resolve(&self, prefix: &NamespacePrefix) -> SelectorResult<NamespaceMatch> {
        match prefix {
            NamespacePrefix::Default | NamespacePrefix::None => Ok(NamespaceMatch::None),
            NamespacePrefix::Any => Ok(NamespaceMatch::Any),
            NamespacePrefix::Named(p) => self
                .namespaces
                .get(p)
                .map(|uri| NamespaceMatch::Uri(uri.to_string()))
                .ok_or_else(|| SelectorError::UnknownNamespacePrefix(p.clone())),
        }
    }

    fn fold_case(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }

    fn translate_pseudo(&self, name: &str, step: &mut Step) -> SelectorResult<()> {
        let condition = match name {
            "first" => return push_post(step, PostCondition::First),
            "last" => return push_post(step, PostCondition::Last),
            "even" => return push_post(step, PostCondition::Even),
            "odd" => return push_post(step, PostCondition::Odd),
            "checked" => PreCondition::Checked,
            "selected" => PreCondition::Selected,
            "disabled" => PreCondition::Disabled,
            "enabled" => PreCondition::Enabled,
            "file" | "radio" | "text" | "checkbox" | "password" | "submit" | "hidden" | "image"
            | "reset" => PreCondition::InputType(name.to_string()),
            "button" => PreCondition::Button,
            "input" => PreCondition::Input,
            "header" => PreCondition::Header,
            "parent" => PreCondition::Parent,
            "empty" => PreCondition::Empty,
            "root" => PreCondition::Root,
            "first-child" => PreCondition::FirstChild,
            "last-child" => PreCondition::LastChild,
            "only-child" => PreCondition::OnlyChild,
            "first-of-type" => PreCondition::FirstOfType,
            "last-of-type" => PreCondition::LastOfType,
            "only-of-type" => PreCondition::OnlyOfType,
            "link" => PreCondition::Link,
            "hover" | "active" | "focus" | "visited" | "target" | "focus-within" | "focus-visible" => {
                PreCondition::Never
            }
            _ => return Err(SelectorError::UnknownPseudoClass(name.to_string())),
        };
        step.conditions.push(condition);
        Ok(())
    }

    fn translate_function(&self, name: &str, args: &[Token], step: &mut Step) -> SelectorResult<()> {
        match name {
            "eq" => push_post(step, PostCondition::Eq(integer_argument(name, args)?)),
            "gt" => push_post(step, PostCondition::Gt(integer_argument(name, args)?)),
            "lt" => push_post(step, PostCondition::Lt(integer_argument(name, args)?)),
            "contains" => push_post(step, PostCondition::Contains(text_argument(name, args)?)),
            "has" => {
                let inner = text_argument(name, args)?;
                let query = self.translate(&inner)?;
                push_post(step, PostCondition::Has(query))
            }
            "not" => {
                let selectors = SelectorParser::from_tokens(args.to_vec()).parse_selector_list()?;
                let query = self.translate_selectors(&selectors)?;
                step.conditions.push(PreCondition::Not(query));
                Ok(())
            }
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                let text: String = args.iter().map(Token::to_css).collect();
                let (a, b) = parse_nth(&text)
                    .ok_or_else(|| SelectorError::invalid_argument(name, format!("invalid an+b expression '{}'", text)))?;
                step.conditions.push(PreCondition::Nth {
                    a,
                    b,
                    from_end: name.contains("last"),
                    of_type: name.ends_with("of-type"),
                });
                Ok(())
            }
            _ => Err(SelectorError::UnknownPseudoClass(format!("{}()", name))),
        }
    }
}

fn push_post(step: &mut Step, condition: PostCondition) -> SelectorResult<()> {
    step.post_conditions.push(condition);
    Ok(())
}

fn significant(args: &[Token]) -> Vec<&Token> {
    args.iter().filter(|t| **t != Token::Whitespace).collect()
}

/// Drop the `@` of `[@attr]` outside quoted strings
fn strip_attribute_at(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut quote = None;
    let mut after_bracket = false;
    let mut escaped = false;
    for c in input.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None if c == '@' && after_bracket => {
                after_bracket = false;
                continue;
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None => {}
        }
        after_bracket = quote.is_none() && c == '[';
        out.push(c);
    }
    out
}

fn integer_argument(name: &str, args: &[Token]) -> SelectorResult<i64> {
    match significant(args).as_slice() {
        [Token::Number(n)] => n
            .parse()
            .map_err(|_| SelectorError::invalid_argument(name, format!("expected a single integer, got '{}'", n))),
        _ => Err(SelectorError::invalid_argument(name, "expected a single integer")),
    }
}

fn text_argument(name: &str, args: &[Token]) -> SelectorResult<String> {
    match significant(args).as_slice() {
        [Token::String(s)] | [Token::Ident(s)] => Ok(s.clone()),
        _ => Err(SelectorError::invalid_argument(name, "expected a single string or ident")),
    }
}

/// Parse an `an+b` expression (`odd`, `even`, `3`, `2n+1`, `-n+3`)
pub fn parse_nth(text: &str) -> Option<(i32, i32)> {
    let s: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match s.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }

    let Some(n_pos) = s.find('n') else {
        return Some((0, s.parse().ok()?));
    };

    let a = match &s[..n_pos] {
        "" | "+" => 1,
        "-" => -1,
        a => a.parse().ok()?,
    };

    let rest = &s[n_pos + 1..];
    let b = if rest.is_empty() {
        0
    } else if let Some(b) = rest.strip_prefix('+') {
        b.parse().ok()?
    } else if rest.starts_with('-') {
        rest.parse().ok()?
    } else {
        return None;
    };

    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_step(input: &str) -> Step {
        let query = Query::parse(input).unwrap();
        assert_eq!(query.chains.len(), 1);
        assert_eq!(query.chains[0].steps.len(), 1);
        query.chains[0].steps[0].clone()
    }

    #[test]
    fn test_type_is_lowercased_for_html() {
        let step = single_step("DIV");
        assert_eq!(
            step.conditions,
            vec![PreCondition::Type {
                namespace: NamespaceMatch::None,
                name: Some("div".into())
            }]
        );
    }

    #[test]
    fn test_case_sensitive_keeps_names() {
        let ns = Namespaces::new();
        let query = Translator::new(&ns, true).translate("Foo[Bar]").unwrap();
        let step = &query.chains[0].steps[0];
        assert!(matches!(&step.conditions[0], PreCondition::Type { name: Some(n), .. } if n == "Foo"));
        assert!(matches!(&step.conditions[1], PreCondition::Attribute { name, .. } if name == "Bar"));
        assert!(query.case_sensitive);
    }

    #[test]
    fn test_universal_is_unconstrained() {
        assert!(single_step("*").conditions.is_empty());
    }

    #[test]
    fn test_at_attribute_prepass() {
        let step = single_step("a[@href]");
        assert!(matches!(&step.conditions[1], PreCondition::Attribute { name, op: None, .. } if name == "href"));

        let step = single_step("a[title=\"[@x\"]");
        assert!(matches!(
            &step.conditions[1],
            PreCondition::Attribute { value: Some(v), .. } if v == "[@x"
        ));
        assert_eq!(strip_attribute_at("a[@b='[@c'][@d]"), "a[b='[@c'][d]");
    }

    #[test]
    fn test_positional_post_conditions() {
        let step = single_step("div:even:gt(0)");
        assert_eq!(step.post_conditions, vec![PostCondition::Even, PostCondition::Gt(0)]);
    }

    #[test]
    fn test_post_condition_positions() {
        assert_eq!(PostCondition::Even.holds_at(1, 3), Some(true));
        assert_eq!(PostCondition::Even.holds_at(2, 3), Some(false));
        assert_eq!(PostCondition::Odd.holds_at(2, 3), Some(true));
        assert_eq!(PostCondition::Last.holds_at(3, 3), Some(true));
        assert_eq!(PostCondition::Eq(2).holds_at(3, 3), Some(true));
        assert_eq!(PostCondition::Lt(1).holds_at(1, 3), Some(true));
        assert_eq!(PostCondition::Lt(1).holds_at(2, 3), Some(false));
        assert_eq!(PostCondition::Contains("x".into()).holds_at(1, 1), None);
        assert_eq!(PostCondition::Gt(i64::MAX).holds_at(5, 5), Some(false));
        assert_eq!(PostCondition::Lt(i64::MAX).holds_at(5, 5), Some(true));
        assert_eq!(PostCondition::Eq(i64::MAX).holds_at(1, 1), Some(false));
        assert_eq!(PostCondition::Gt(-1).holds_at(1, 1), Some(true));
    }

    #[test]
    fn test_chain_steps() {
        let query = Query::parse("div > p.a, span").unwrap();
        assert_eq!(query.chains.len(), 2);
        let steps = &query.chains[0].steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].combinator, None);
        assert_eq!(steps[1].combinator, Some(Combinator::Child));
        assert_eq!(steps[1].conditions.len(), 2);
    }

    #[test]
    fn test_input_pseudos() {
        assert_eq!(single_step(":radio").conditions, vec![PreCondition::InputType("radio".into())]);
        assert_eq!(single_step(":button").conditions, vec![PreCondition::Button]);
        assert_eq!(single_step(":input").conditions, vec![PreCondition::Input]);
    }

    #[test]
    fn test_function_arguments() {
        assert_eq!(single_step(":eq(2)").post_conditions, vec![PostCondition::Eq(2)]);
        assert_eq!(single_step(":eq(-1)").post_conditions, vec![PostCondition::Eq(-1)]);
        assert_eq!(
            single_step(":contains('Heading')").post_conditions,
            vec![PostCondition::Contains("Heading".into())]
        );
        assert_eq!(
            single_step(":contains(title)").post_conditions,
            vec![PostCondition::Contains("title".into())]
        );
        let step = single_step(".foo:has('.bar')");
        assert!(matches!(&step.post_conditions[0], PostCondition::Has(q) if q.chains.len() == 1));
    }

    #[test]
    fn test_bad_arguments() {
        for input in [":eq()", ":eq(a)", ":eq(1.5)", ":eq(1, 2)", ":gt('1')", ":contains()", ":contains(1)", ":has(div p)"] {
            assert!(
                matches!(Query::parse(input), Err(SelectorError::InvalidPseudoArgument { .. })),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_unknown_pseudo_and_elements() {
        assert_eq!(
            Query::parse("p:bogus").unwrap_err(),
            SelectorError::UnknownPseudoClass("bogus".into())
        );
        assert_eq!(
            Query::parse("p:first()").unwrap_err(),
            SelectorError::UnknownPseudoClass("first()".into())
        );
        assert_eq!(
            Query::parse("p::before").unwrap_err(),
            SelectorError::UnsupportedPseudoElement("before".into())
        );
    }

    #[test]
    fn test_not_query() {
        let step = single_step("li:not(.a, :first-child)");
        let PreCondition::Not(inner) = &step.conditions[1] else {
            panic!("expected :not");
        };
        assert_eq!(inner.chains.len(), 2);
    }

    #[test]
    fn test_namespaces() {
        let ns: Namespaces = [("svg", "http://www.w3.org/2000/svg")].into_iter().collect();
        let query = Translator::new(&ns, true).translate("svg|rect, *|circle").unwrap();
        assert_eq!(
            query.chains[0].steps[0].conditions[0],
            PreCondition::Type {
                namespace: NamespaceMatch::Uri("http://www.w3.org/2000/svg".into()),
                name: Some("rect".into())
            }
        );
        assert!(matches!(
            &query.chains[1].steps[0].conditions[0],
            PreCondition::Type { namespace: NamespaceMatch::Any, .. }
        ));

        assert_eq!(
            Query::parse("xx|rect").unwrap_err(),
            SelectorError::UnknownNamespacePrefix("xx".into())
        );
    }

    #[test]
    fn test_parse_nth() {
        assert_eq!(parse_nth("odd"), Some((2, 1)));
        assert_eq!(parse_nth("even"), Some((2, 0)));
        assert_eq!(parse_nth("3"), Some((0, 3)));
        assert_eq!(parse_nth("2n+1"), Some((2, 1)));
        assert_eq!(parse_nth("2n + 1"), Some((2, 1)));
        assert_eq!(parse_nth("-n+3"), Some((-1, 3)));
        assert_eq!(parse_nth("n"), Some((1, 0)));
        assert_eq!(parse_nth("3n-2"), Some((3, -2)));
        assert_eq!(parse_nth("bogus"), None);
        assert_eq!(parse_nth("2n1"), None);
    }

    #[test]
    fn test_nth_translation() {
        assert_eq!(
            single_step(":nth-last-of-type(2n+1)").conditions,
            vec![PreCondition::Nth { a: 2, b: 1, from_end: true, of_type: true }]
        );
        assert!(Query::parse(":nth-child(foo)").is_err());
    }
}
