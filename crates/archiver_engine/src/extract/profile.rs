//! Data-driven selector profiles.
//!
//! Every logical field of a post maps to an ordered list of [`FieldRule`]s.
//! Rules are evaluated in order and the first one that produces a non-empty
//! value wins, so a markup revision on a platform is absorbed by adding a
//! rule to the platform's profile rather than by branching in code.

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use super::text::{block_text, inline_text};
use super::ExtractionError;
use crate::Platform;

/// One structural query. Without `css` the rule reads the scope element
/// itself; without `attr` it yields the element's normalized text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    pub css: Option<String>,
    pub attr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorProfile {
    pub feed_root: Vec<String>,
    pub post: Vec<String>,
    pub exclude: Vec<String>,
    /// Elements dropped from the post body (toggles, screen-reader copies).
    pub noise: Vec<String>,
    pub id: Vec<FieldRule>,
    pub author_name: Vec<FieldRule>,
    pub author_username: Vec<FieldRule>,
    pub author_url: Vec<FieldRule>,
    pub author_avatar: Vec<FieldRule>,
    /// Optional heading placed above the body (e.g. a thread title).
    pub headline: Vec<FieldRule>,
    pub content: Vec<FieldRule>,
    pub timestamp: Vec<FieldRule>,
    pub relative_timestamps: bool,
    pub permalink: Vec<FieldRule>,
    pub images: Vec<FieldRule>,
    pub videos: Vec<FieldRule>,
    pub link_card: Vec<FieldRule>,
    pub likes: Vec<FieldRule>,
    pub comments: Vec<FieldRule>,
    pub shares: Vec<FieldRule>,
    pub views: Vec<FieldRule>,
    pub sponsored: Vec<FieldRule>,
    /// When non-empty, a sponsored rule only counts if its value equals one
    /// of these labels (case-insensitive).
    pub sponsored_labels: Vec<String>,
}

const FACEBOOK_PROFILE: &str = include_str!("../../selectors/facebook.ron");
const LINKEDIN_PROFILE: &str = include_str!("../../selectors/linkedin.ron");
const TWITTER_PROFILE: &str = include_str!("../../selectors/twitter.ron");
const REDDIT_PROFILE: &str = include_str!("../../selectors/reddit.ron");

impl SelectorProfile {
    /// The profile shipped with the crate for `platform`.
    pub fn builtin(platform: Platform) -> Result<Self, ExtractionError> {
        let source = match platform {
            Platform::Facebook => FACEBOOK_PROFILE,
            Platform::LinkedIn => LINKEDIN_PROFILE,
            Platform::Twitter => TWITTER_PROFILE,
            Platform::Reddit => REDDIT_PROFILE,
        };
        Self::from_ron(platform, source)
    }

    pub fn from_ron(platform: Platform, source: &str) -> Result<Self, ExtractionError> {
        ron::from_str(source).map_err(|err| ExtractionError::InvalidProfile {
            platform,
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Rule {
    selector: Option<Selector>,
    attr: Option<String>,
}

impl Rule {
    fn compile(rule: &FieldRule) -> Result<Self, ExtractionError> {
        let selector = rule.css.as_deref().map(compile_selector).transpose()?;
        Ok(Self {
            selector,
            attr: rule.attr.clone(),
        })
    }

    fn elements<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match &self.selector {
            Some(selector) => scope.select(selector).collect(),
            None => vec![scope],
        }
    }

    fn value(&self, element: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => element.value().attr(attr).map(|v| v.trim().to_string()),
            None => Some(inline_text(element)),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Ordered, first-match-wins list of rules for one field.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    fn compile(rules: &[FieldRule]) -> Result<Self, ExtractionError> {
        Ok(Self {
            rules: rules.iter().map(Rule::compile).collect::<Result<_, _>>()?,
        })
    }

    /// First non-empty value produced by the first rule that yields one.
    pub(crate) fn first_value(&self, scope: ElementRef<'_>) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            rule.elements(scope)
                .into_iter()
                .find_map(|element| rule.value(element))
        })
    }

    /// Every value of the first rule that yields any, in document order,
    /// paired with the element that produced it.
    pub(crate) fn all_values<'a>(&self, scope: ElementRef<'a>) -> Vec<(ElementRef<'a>, String)> {
        for rule in &self.rules {
            let values: Vec<_> = rule
                .elements(scope)
                .into_iter()
                .filter_map(|element| rule.value(element).map(|value| (element, value)))
                .collect();
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }

    /// Body text of the first matching element, keeping line structure.
    /// Returns the text and the element's inner markup.
    pub(crate) fn first_block(
        &self,
        scope: ElementRef<'_>,
        noise: &[Selector],
    ) -> Option<(String, Option<String>)> {
        self.rules.iter().find_map(|rule| {
            rule.elements(scope).into_iter().find_map(|element| {
                if rule.attr.is_some() {
                    return rule.value(element).map(|value| (value, None));
                }
                let text = block_text(element, noise);
                (!text.is_empty()).then(|| (text, Some(element.inner_html())))
            })
        })
    }

    /// Whether any rule finds an element (carrying its attribute, if the
    /// rule names one). Values are not required.
    pub(crate) fn is_present(&self, scope: ElementRef<'_>) -> bool {
        self.rules.iter().any(|rule| {
            rule.elements(scope).iter().any(|element| match &rule.attr {
                Some(attr) => element.value().attr(attr).is_some(),
                None => rule.selector.is_some(),
            })
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A [`SelectorProfile`] with every selector parsed.
#[derive(Debug, Clone)]
pub(crate) struct CompiledProfile {
    pub(crate) feed_root: Vec<Selector>,
    pub(crate) post: Vec<Selector>,
    pub(crate) exclude: Vec<Selector>,
    pub(crate) noise: Vec<Selector>,
    pub(crate) id: RuleSet,
    pub(crate) author_name: RuleSet,
    pub(crate) author_username: RuleSet,
    pub(crate) author_url: RuleSet,
    pub(crate) author_avatar: RuleSet,
    pub(crate) headline: RuleSet,
    pub(crate) content: RuleSet,
    pub(crate) timestamp: RuleSet,
    pub(crate) relative_timestamps: bool,
    pub(crate) permalink: RuleSet,
    pub(crate) images: RuleSet,
    pub(crate) videos: RuleSet,
    pub(crate) link_card: RuleSet,
    pub(crate) likes: RuleSet,
    pub(crate) comments: RuleSet,
    pub(crate) shares: RuleSet,
    pub(crate) views: RuleSet,
    pub(crate) sponsored: RuleSet,
    pub(crate) sponsored_labels: Vec<String>,
}

impl CompiledProfile {
    pub(crate) fn compile(profile: &SelectorProfile) -> Result<Self, ExtractionError> {
        if profile.post.is_empty() {
            return Err(ExtractionError::MissingField { field: "post" });
        }
        Ok(Self {
            feed_root: compile_all(&profile.feed_root)?,
            post: compile_all(&profile.post)?,
            exclude: compile_all(&profile.exclude)?,
            noise: compile_all(&profile.noise)?,
            id: RuleSet::compile(&profile.id)?,
            author_name: RuleSet::compile(&profile.author_name)?,
            author_username: RuleSet::compile(&profile.author_username)?,
            author_url: RuleSet::compile(&profile.author_url)?,
            author_avatar: RuleSet::compile(&profile.author_avatar)?,
            headline: RuleSet::compile(&profile.headline)?,
            content: RuleSet::compile(&profile.content)?,
            timestamp: RuleSet::compile(&profile.timestamp)?,
            relative_timestamps: profile.relative_timestamps,
            permalink: RuleSet::compile(&profile.permalink)?,
            images: RuleSet::compile(&profile.images)?,
            videos: RuleSet::compile(&profile.videos)?,
            link_card: RuleSet::compile(&profile.link_card)?,
            likes: RuleSet::compile(&profile.likes)?,
            comments: RuleSet::compile(&profile.comments)?,
            shares: RuleSet::compile(&profile.shares)?,
            views: RuleSet::compile(&profile.views)?,
            sponsored: RuleSet::compile(&profile.sponsored)?,
            sponsored_labels: profile
                .sponsored_labels
                .iter()
                .map(|label| label.trim().to_lowercase())
                .collect(),
        })
    }

    pub(crate) fn matches_post(&self, element: &ElementRef<'_>) -> bool {
        self.post.iter().any(|selector| selector.matches(element))
    }

    pub(crate) fn is_excluded(&self, element: &ElementRef<'_>) -> bool {
        self.exclude.iter().any(|selector| selector.matches(element))
    }

    pub(crate) fn is_sponsored(&self, scope: ElementRef<'_>) -> bool {
        if self.sponsored.is_empty() {
            return false;
        }
        if self.sponsored_labels.is_empty() {
            return self.sponsored.is_present(scope);
        }
        self.sponsored
            .all_values(scope)
            .iter()
            .any(|(_, value)| self.sponsored_labels.contains(&value.to_lowercase()))
    }
}

fn compile_selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|err| ExtractionError::InvalidSelector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

fn compile_all(list: &[String]) -> Result<Vec<Selector>, ExtractionError> {
    list.iter().map(|css| compile_selector(css)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn rule(css: Option<&str>, attr: Option<&str>) -> FieldRule {
        FieldRule {
            css: css.map(str::to_string),
            attr: attr.map(str::to_string),
        }
    }

    #[test]
    fn every_builtin_profile_compiles() {
        for platform in Platform::ALL {
            let profile = SelectorProfile::builtin(platform).unwrap();
            CompiledProfile::compile(&profile).unwrap();
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let html = Html::parse_fragment(
            r#"<div><span class="new">New layout</span><b class="old">Old layout</b></div>"#,
        );
        let rules = RuleSet::compile(&[
            rule(Some(".missing"), None),
            rule(Some(".old"), None),
            rule(Some(".new"), None),
        ])
        .unwrap();
        assert_eq!(
            rules.first_value(html.root_element()).as_deref(),
            Some("Old layout")
        );
    }

    #[test]
    fn rule_without_css_reads_scope_attribute() {
        let html = Html::parse_fragment(r#"<shreddit-post author="ferris" score="12"></shreddit-post>"#);
        let selector = Selector::parse("shreddit-post").unwrap();
        let post = html.select(&selector).next().unwrap();
        let rules = RuleSet::compile(&[rule(None, Some("author"))]).unwrap();
        assert_eq!(rules.first_value(post).as_deref(), Some("ferris"));
    }

    #[test]
    fn invalid_css_is_reported() {
        let err = RuleSet::compile(&[rule(Some("div[[["), None)]).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidSelector { .. }));
    }

    #[test]
    fn profiles_deserialize_from_ron() {
        let profile = SelectorProfile::from_ron(
            Platform::Facebook,
            r#"(post: ["article"], author_name: [(css: Some("h2"))], likes: [(attr: Some("data-likes"))])"#,
        )
        .unwrap();
        assert_eq!(profile.post, vec!["article".to_string()]);
        assert_eq!(profile.author_name, vec![rule(Some("h2"), None)]);
        assert_eq!(profile.likes, vec![rule(None, Some("data-likes"))]);
        assert!(!profile.relative_timestamps);
    }
}
