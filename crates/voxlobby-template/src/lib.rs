//! Restricted placeholder templates for room names and status text.
//!
//! A template is a plain string with `{name}` slots. Each template kind has
//! a closed set of names it may use:
//!
//! | Kind     | Arguments        | Placeholders                         |
//! |----------|------------------|--------------------------------------|
//! | `title`  | [`TitleArgs`]    | `index`, `limit`, `current`, `left`  |
//! | `member` | [`MemberArgs`]   | `index`, `tag`                       |
//! | `link`   | [`LinkArgs`]     | `link`                               |
//!
//! Parsing happens once, when settings are loaded. A slot naming anything
//! outside the kind's set is a [`TemplateError`] at that point, so rendering
//! itself can never fail. Text that is not a well-formed `{identifier}`
//! (a lone `{`, `{ spaced }`) is kept literally.
//!
//! ```rust
//! use voxlobby_template::{TitleArgs, TitleTemplate};
//!
//! let template = TitleTemplate::parse("{current}/{limit} #{index}").unwrap();
//! let args = TitleArgs::new(1, 2, 1);
//! assert_eq!(template.render(&args), "1/2 #1");
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing a template string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template names a placeholder its kind does not provide.
    #[error("unknown placeholder {{{name}}} in {kind} template")]
    UnknownPlaceholder {
        /// The name found between the braces.
        name: String,
        /// The template kind (`title`, `member`, `link`).
        kind: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Placeholder
// ---------------------------------------------------------------------------

/// Every placeholder name any template kind understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Lobby index (title) or 1-based member position (member line).
    Index,
    /// Lobby capacity.
    Limit,
    /// Current participant count.
    Current,
    /// Free slots left (`limit - current`).
    Left,
    /// Participant mention.
    Tag,
    /// Join link URL.
    Link,
}

impl Placeholder {
    /// The name written between braces.
    pub fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Limit => "limit",
            Self::Current => "current",
            Self::Left => "left",
            Self::Tag => "tag",
            Self::Link => "link",
        }
    }

    /// Looks a placeholder up by its brace name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "index" => Some(Self::Index),
            "limit" => Some(Self::Limit),
            "current" => Some(Self::Current),
            "left" => Some(Self::Left),
            "tag" => Some(Self::Tag),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// The values a template kind is rendered with.
///
/// Implementors declare the closed set of placeholders they provide and
/// supply a value for each. `value` is only ever called with a member of
/// `PLACEHOLDERS`, because parsing rejects everything else.
pub trait Arguments {
    /// Kind name used in error messages.
    const KIND: &'static str;

    /// Placeholders this kind provides.
    const PLACEHOLDERS: &'static [Placeholder];

    /// Returns the substitution for `placeholder`.
    fn value(&self, placeholder: Placeholder) -> String;
}

/// Arguments for room names and status titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleArgs {
    pub index: u32,
    pub limit: usize,
    pub current: usize,
    pub left: usize,
}

impl TitleArgs {
    /// Builds title arguments, deriving `left` from `limit` and `current`.
    pub fn new(index: u32, limit: usize, current: usize) -> Self {
        Self {
            index,
            limit,
            current,
            left: limit.saturating_sub(current),
        }
    }
}

impl Arguments for TitleArgs {
    const KIND: &'static str = "title";
    const PLACEHOLDERS: &'static [Placeholder] = &[
        Placeholder::Index,
        Placeholder::Limit,
        Placeholder::Current,
        Placeholder::Left,
    ];

    fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::Index => self.index.to_string(),
            Placeholder::Limit => self.limit.to_string(),
            Placeholder::Current => self.current.to_string(),
            Placeholder::Left => self.left.to_string(),
            Placeholder::Tag | Placeholder::Link => String::new(),
        }
    }
}

/// Arguments for one participant line of a status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberArgs {
    /// 1-based position in join order.
    pub index: usize,
    pub tag: String,
}

impl Arguments for MemberArgs {
    const KIND: &'static str = "member";
    const PLACEHOLDERS: &'static [Placeholder] = &[Placeholder::Index, Placeholder::Tag];

    fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::Index => self.index.to_string(),
            Placeholder::Tag => self.tag.clone(),
            _ => String::new(),
        }
    }
}

/// Arguments for the join-link line of a status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkArgs {
    pub link: String,
}

impl Arguments for LinkArgs {
    const KIND: &'static str = "link";
    const PLACEHOLDERS: &'static [Placeholder] = &[Placeholder::Link];

    fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::Link => self.link.clone(),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// Built-in member line used when settings omit one.
pub const DEFAULT_MEMBER_LINE: &str = "[{index}] - {tag}";

/// Built-in join-link line used when settings omit one.
pub const DEFAULT_LINK: &str = "Join - {link}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A parsed template for arguments of type `A`.
///
/// The type parameter ties a template to its kind at compile time: a
/// [`TitleTemplate`] can only be rendered with [`TitleArgs`].
pub struct Template<A> {
    source: String,
    segments: Vec<Segment>,
    _args: PhantomData<fn(&A)>,
}

/// Room name and status title template.
pub type TitleTemplate = Template<TitleArgs>;
/// Status member-line template.
pub type MemberTemplate = Template<MemberArgs>;
/// Status join-link template.
pub type LinkTemplate = Template<LinkArgs>;

impl<A: Arguments> Template<A> {
    /// Parses `source`, rejecting placeholders outside `A::PLACEHOLDERS`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let segments = parse_segments(source, A::PLACEHOLDERS, A::KIND)?;
        Ok(Self {
            source: source.to_string(),
            segments,
            _args: PhantomData,
        })
    }

    /// Substitutes every placeholder with its value from `args`.
    pub fn render(&self, args: &A) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(placeholder) => out.push_str(&args.value(*placeholder)),
            }
        }
        out
    }

    /// The original template string.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholders used by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(placeholder) => Some(*placeholder),
            Segment::Text(_) => None,
        })
    }
}

impl Default for MemberTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_MEMBER_LINE.to_string(),
            segments: vec![
                Segment::Text("[".into()),
                Segment::Slot(Placeholder::Index),
                Segment::Text("] - ".into()),
                Segment::Slot(Placeholder::Tag),
            ],
            _args: PhantomData,
        }
    }
}

impl Default for LinkTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_LINK.to_string(),
            segments: vec![
                Segment::Text("Join - ".into()),
                Segment::Slot(Placeholder::Link),
            ],
            _args: PhantomData,
        }
    }
}

// Manual impls: deriving would demand `A: Clone`/`A: Debug` even though
// no `A` is ever stored.
impl<A> Clone for Template<A> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            segments: self.segments.clone(),
            _args: PhantomData,
        }
    }
}

impl<A> fmt::Debug for Template<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Template").field(&self.source).finish()
    }
}

impl<A> PartialEq for Template<A> {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<A> Eq for Template<A> {}

impl<A> Serialize for Template<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de, A: Arguments> Deserialize<'de> for Template<A> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::parse(&source).map_err(serde::de::Error::custom)
    }
}

fn parse_segments(
    source: &str,
    allowed: &[Placeholder],
    kind: &'static str,
) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                let name = &after[..close];
                let placeholder = Placeholder::from_name(name)
                    .filter(|p| allowed.contains(p))
                    .ok_or_else(|| TemplateError::UnknownPlaceholder {
                        name: name.to_string(),
                        kind,
                    })?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Slot(placeholder));
                rest = &after[close + 1..];
            }
            _ => {
                text.push('{');
                rest = after;
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(index: usize, tag: &str) -> MemberArgs {
        MemberArgs {
            index,
            tag: tag.into(),
        }
    }

    #[test]
    fn test_title_renders_all_placeholders() {
        let t = TitleTemplate::parse("Lobby #{index} {current}/{limit}. Needed {left}").unwrap();
        assert_eq!(t.render(&TitleArgs::new(3, 5, 2)), "Lobby #3 2/5. Needed 3");
    }

    #[test]
    fn test_repeated_placeholder_renders_each_time() {
        let t = TitleTemplate::parse("{index}-{index}").unwrap();
        assert_eq!(t.render(&TitleArgs::new(7, 2, 0)), "7-7");
    }

    #[test]
    fn test_plain_text_has_no_placeholders() {
        let t = LinkTemplate::parse("no slots here").unwrap();
        assert_eq!(t.placeholders().count(), 0);
        assert_eq!(t.render(&LinkArgs { link: "x".into() }), "no slots here");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = TitleTemplate::parse("Room {name}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                name: "name".into(),
                kind: "title",
            }
        );
        assert_eq!(err.to_string(), "unknown placeholder {name} in title template");
    }

    #[test]
    fn test_placeholder_from_other_kind_rejected() {
        // `tag` exists, but only member lines provide it.
        assert!(TitleTemplate::parse("{tag}").is_err());
        assert!(LinkTemplate::parse("{index}").is_err());
        assert!(MemberTemplate::parse("{link}").is_err());
    }

    #[test]
    fn test_malformed_braces_are_literal() {
        let t = LinkTemplate::parse("{ link } { {link}").unwrap();
        assert_eq!(t.render(&LinkArgs { link: "L".into() }), "{ link } { L");

        let t = TitleTemplate::parse("open { only").unwrap();
        assert_eq!(t.render(&TitleArgs::new(1, 1, 0)), "open { only");
    }

    #[test]
    fn test_substituted_values_are_not_reparsed() {
        let t = MemberTemplate::parse("{tag}").unwrap();
        assert_eq!(t.render(&member(1, "{index}")), "{index}");
    }

    #[test]
    fn test_default_member_line_matches_parsed_source() {
        let parsed = MemberTemplate::parse(DEFAULT_MEMBER_LINE).unwrap();
        let builtin = MemberTemplate::default();
        assert_eq!(builtin.source(), DEFAULT_MEMBER_LINE);
        assert_eq!(
            builtin.render(&member(2, "<@9>")),
            parsed.render(&member(2, "<@9>"))
        );
        assert_eq!(builtin.render(&member(2, "<@9>")), "[2] - <@9>");
    }

    #[test]
    fn test_default_link_line() {
        let t = LinkTemplate::default();
        assert_eq!(
            t.render(&LinkArgs {
                link: "https://example.test/abc".into()
            }),
            "Join - https://example.test/abc"
        );
    }

    #[test]
    fn test_title_args_left_saturates() {
        assert_eq!(TitleArgs::new(1, 2, 5).left, 0);
    }

    #[test]
    fn test_deserialize_validates_at_load_time() {
        let ok: TitleTemplate = serde_json::from_str(r#""Room #{index}""#).unwrap();
        assert_eq!(ok.source(), "Room #{index}");

        let err = serde_json::from_str::<TitleTemplate>(r#""Room #{idx}""#).unwrap_err();
        assert!(err.to_string().contains("unknown placeholder {idx}"));
    }

    #[test]
    fn test_serialize_writes_source() {
        let t = LinkTemplate::parse("Go {link}").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""Go {link}""#);
    }

    #[test]
    fn test_placeholder_display() {
        assert_eq!(Placeholder::Current.to_string(), "{current}");
    }
}
