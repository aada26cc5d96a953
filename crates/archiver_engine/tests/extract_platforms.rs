use archiver_engine::{
    ExtractionError, ExtractorFactory, MediaKind, PageDocument, Platform, PostType,
    SelectorProfile,
};
use chrono::{TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;

const FACEBOOK_FEED: &str = r##"<html><body>
<div role="feed">
  <div data-pagelet="FeedUnit_0">
    <h2><strong><a href="/jane.doe.42?__cft__[0]=AZx">Jane   Doe</a></strong></h2>
    <a href="https://www.facebook.com/acme/posts/pfbid0abc?__cft__[0]=AZ&amp;__tn__=R"><abbr data-utime="1760517000">1h</abbr></a>
    <div data-ad-preview="message">
      <div dir="auto">Shipping day!<br>Second line</div>
      <div role="button">See more</div>
    </div>
    <a href="/photo/?fbid=77"><img src="https://scontent.example.com/v/photo1.jpg" alt="Team photo"></a>
    <span data-reaction-count="1.2K"></span>
  </div>
  <div data-pagelet="FeedUnit_1">
    <div data-ad-preview="message">No author on this one</div>
  </div>
  <div data-pagelet="FeedUnit_2">
    <h2><strong><a href="https://www.facebook.com/acmecorp">Acme Corp</a></strong></h2>
    <a aria-label="Sponsored" href="#">Sponsored</a>
    <div data-ad-preview="message">Buy now</div>
  </div>
</div>
</body></html>"##;

const TWITTER_TIMELINE: &str = r#"<html><body><main>
<div aria-label="Timeline: Your Home Timeline">
  <article data-testid="tweet">
    <div data-testid="User-Name">
      <a role="link" href="/ferris"><span><span>Ferris Crab</span></span></a>
      <a role="link" tabindex="-1" href="/ferris"><span>@ferris</span></a>
    </div>
    <a href="/ferris/status/1845000000000000001" dir="ltr"><time datetime="2025-10-14T18:05:00.000Z">Oct 14</time></a>
    <div data-testid="tweetText"><span>Hello </span><a href="/hashtag/rust">#rust</a><img alt="🦀" src="e.svg"></div>
    <div data-testid="tweetPhoto"><img src="https://pbs.twimg.com/media/abc?format=jpg&amp;name=small" alt="Image"></div>
    <div data-testid="tweetPhoto"><img src="https://pbs.twimg.com/media/def?format=jpg&amp;name=small" alt="Image"></div>
    <button data-testid="like"><span data-testid="app-text-transition-container">3.4K</span></button>
    <a href="/ferris/status/1845000000000000001/analytics" aria-label="12,345 views"></a>
  </article>
  <article data-testid="tweet">
    <div data-testid="User-Name">
      <a role="link" href="/corro"><span><span>Corro</span></span></a>
    </div>
    <a href="/corro/status/1845000000000000002" dir="ltr"><time datetime="2025-10-14T19:00:00.000Z">Oct 14</time></a>
    <div data-testid="tweetText">Quote tweets nest articles</div>
    <article data-testid="tweet">
      <div data-testid="User-Name"><a role="link" href="/inner"><span><span>Inner</span></span></a></div>
    </article>
  </article>
</div>
</main></body></html>"#;

const LINKEDIN_FEED: &str = r#"<html><body><main>
<div class="scaffold-finite-scroll__content">
  <div class="feed-shared-update-v2" data-urn="urn:li:activity:7120000000000000001">
    <div class="update-components-actor__title"><span aria-hidden="true">Grace Hopper</span><span class="visually-hidden">Grace Hopper</span></div>
    <a class="update-components-actor__meta-link" href="https://www.linkedin.com/in/grace-hopper?miniProfileUrn=x"></a>
    <span class="update-components-actor__sub-description"><span aria-hidden="true">3w • Edited</span></span>
    <div class="update-components-text"><span>Compilers are fun.<br>Really.</span><button>…see more</button></div>
    <span class="social-details-social-counts__reactions-count">1,024</span>
    <span class="social-details-social-counts__comments">56 comments</span>
  </div>
  <div class="feed-shared-update-v2" data-urn="urn:li:activity:7120000000000000002">
    <div class="update-components-actor__title"><span aria-hidden="true">Acme Tools</span></div>
    <span class="update-components-actor__sub-description"><span aria-hidden="true">Promoted</span></span>
    <div class="update-components-text">Try our new wrench</div>
    <div class="update-components-article"><a href="https://acme.example.com/wrench">Wrench</a></div>
  </div>
</div>
</main></body></html>"#;

const REDDIT_FEED: &str = r#"<html><body>
<shreddit-feed>
  <shreddit-post id="t3_abc123" author="ferris" post-title="Rust 2.0 when?"
      permalink="/r/rust/comments/abc123/rust_20_when/"
      created-timestamp="2025-10-14T09:12:33.456000+0000" score="1.5k" comment-count="321">
    <div slot="text-body"><p>Asking for a friend.</p></div>
  </shreddit-post>
  <shreddit-post id="t3_def456" author="crab" post-title="Look at this"
      permalink="/r/rust/comments/def456/look_at_this/"
      created-timestamp="2025-10-13T10:00:00.000000+0000" score="12">
    <div slot="post-media-container"><img src="https://i.redd.it/xyz.png" alt="a crab"></div>
  </shreddit-post>
</shreddit-feed>
</body></html>"#;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn page(html: &str, url: &str) -> PageDocument {
    PageDocument::parse(html, url)
        .unwrap()
        .with_captured_at(Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap())
}

#[test]
fn facebook_feed_skips_broken_candidates() {
    init_logging();
    let page = page(FACEBOOK_FEED, "https://www.facebook.com/");
    let extractor = ExtractorFactory::new()
        .extractor_for(Platform::Facebook)
        .unwrap();
    let records = extractor.enumerate(&page);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.id, "fb-pfbid0abc");
    assert_eq!(first.author.name, "Jane Doe");
    assert_eq!(first.author.username.as_deref(), Some("jane.doe.42"));
    assert_eq!(first.content.text, "Shipping day!\nSecond line");
    assert_eq!(
        first.timestamp.parsed,
        Some(Utc.with_ymd_and_hms(2025, 10, 15, 8, 30, 0).unwrap())
    );
    assert_eq!(
        first.source_urls.canonical.as_deref(),
        Some("https://www.facebook.com/acme/posts/pfbid0abc")
    );
    assert_eq!(first.media_items.len(), 1);
    assert_eq!(first.media_items[0].kind, MediaKind::Image);
    assert_eq!(first.media_items[0].caption.as_deref(), Some("Team photo"));
    assert_eq!(first.engagement.likes, Some(1200));
    assert_eq!(first.flags.post_type, PostType::Image);
    assert!(!first.flags.sponsored);

    let ad = &records[1];
    assert_eq!(ad.author.name, "Acme Corp");
    assert!(ad.flags.sponsored);
    assert!(ad.id.starts_with("facebook-"));
    assert_eq!(ad.source_urls.post, "https://www.facebook.com/");
}

#[test]
fn twitter_timeline_ignores_nested_quotes() {
    init_logging();
    let page = page(TWITTER_TIMELINE, "https://x.com/home");
    let extractor = ExtractorFactory::new()
        .extractor_for(Platform::Twitter)
        .unwrap();
    let records = extractor.enumerate(&page);
    assert_eq!(records.len(), 2);

    let tweet = &records[0];
    assert_eq!(tweet.id, "x-1845000000000000001");
    assert_eq!(tweet.author.name, "Ferris Crab");
    assert_eq!(tweet.author.username.as_deref(), Some("ferris"));
    assert_eq!(tweet.content.text, "Hello #rust🦀");
    assert_eq!(
        tweet.source_urls.post,
        "https://x.com/ferris/status/1845000000000000001"
    );
    assert_eq!(tweet.media_items.len(), 2);
    assert_eq!(tweet.flags.post_type, PostType::Gallery);
    assert_eq!(tweet.engagement.likes, Some(3400));
    assert_eq!(tweet.engagement.views, Some(12345));

    assert_eq!(records[1].author.name, "Corro");
}

#[test]
fn linkedin_relative_times_and_promoted_posts() {
    init_logging();
    let page = page(LINKEDIN_FEED, "https://www.linkedin.com/feed/");
    let extractor = ExtractorFactory::new()
        .extractor_for(Platform::LinkedIn)
        .unwrap();
    let records = extractor.enumerate(&page);
    assert_eq!(records.len(), 2);

    let post = &records[0];
    assert_eq!(post.id, "urn:li:activity:7120000000000000001");
    assert_eq!(post.author.name, "Grace Hopper");
    assert_eq!(post.author.username.as_deref(), Some("grace-hopper"));
    assert_eq!(post.content.text, "Compilers are fun.\nReally.");
    assert_eq!(post.timestamp.raw, "3w • Edited");
    assert_eq!(
        post.timestamp.parsed,
        Some(page.captured_at() - TimeDelta::days(21))
    );
    assert_eq!(
        post.source_urls.post,
        "https://www.linkedin.com/feed/update/urn:li:activity:7120000000000000001/"
    );
    assert_eq!(post.engagement.likes, Some(1024));
    assert_eq!(post.engagement.comments, Some(56));
    assert!(!post.flags.sponsored);

    let promoted = &records[1];
    assert!(promoted.flags.sponsored);
    assert_eq!(promoted.timestamp.parsed, None);
    assert_eq!(promoted.flags.post_type, PostType::Link);
}

#[test]
fn reddit_posts_read_component_attributes() {
    init_logging();
    let page = page(REDDIT_FEED, "https://www.reddit.com/r/rust/");
    let extractor = ExtractorFactory::new()
        .extractor_for(Platform::Reddit)
        .unwrap();
    let records = extractor.enumerate(&page);
    assert_eq!(records.len(), 2);

    let post = &records[0];
    assert_eq!(post.id, "t3_abc123");
    assert_eq!(post.author.name, "ferris");
    assert_eq!(
        post.author.profile_url.as_deref(),
        Some("https://www.reddit.com/user/ferris/")
    );
    assert_eq!(post.content.text, "Rust 2.0 when?\n\nAsking for a friend.");
    assert_eq!(
        post.source_urls.post,
        "https://www.reddit.com/r/rust/comments/abc123/rust_20_when/"
    );
    assert_eq!(post.engagement.likes, Some(1500));
    assert_eq!(post.engagement.comments, Some(321));
    assert!(post.timestamp.parsed.is_some());

    assert_eq!(records[1].media_items[0].source_url, "https://i.redd.it/xyz.png");
    assert_eq!(records[1].flags.post_type, PostType::Image);
}

#[test]
fn every_record_has_an_author_and_a_unique_id() {
    init_logging();
    let pages = [
        (Platform::Facebook, FACEBOOK_FEED, "https://www.facebook.com/"),
        (Platform::Twitter, TWITTER_TIMELINE, "https://x.com/home"),
        (Platform::LinkedIn, LINKEDIN_FEED, "https://www.linkedin.com/feed/"),
        (Platform::Reddit, REDDIT_FEED, "https://www.reddit.com/"),
    ];
    for (platform, html, url) in pages {
        let page = page(html, url);
        assert_eq!(page.platform(), Some(platform));
        let records = ExtractorFactory::new()
            .extractor_for(platform)
            .unwrap()
            .enumerate(&page);
        let mut ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), records.len(), "{platform}");
        assert!(records.iter().all(|r| !r.author.name.trim().is_empty()));
    }
}

#[test]
fn duplicated_ids_are_suffixed() {
    init_logging();
    let html = r#"<html><body><shreddit-feed>
        <shreddit-post id="t3_same" author="a"><div slot="text-body">one</div></shreddit-post>
        <shreddit-post id="t3_same" author="b"><div slot="text-body">two</div></shreddit-post>
    </shreddit-feed></body></html>"#;
    let records = ExtractorFactory::new()
        .extractor_for(Platform::Reddit)
        .unwrap()
        .enumerate(&page(html, "https://www.reddit.com/"));
    let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["t3_same", "t3_same-2"]);
}

#[test]
fn profiles_can_be_replaced_at_runtime() {
    init_logging();
    let profile = SelectorProfile::from_ron(
        Platform::Facebook,
        r#"(post: ["section.story"], author_name: [(css: Some(".who"))], content: [(css: Some(".what"))])"#,
    )
    .unwrap();
    let html = r#"<html><body>
        <section class="story"><span class="who">Ada</span><p class="what">Hi</p></section>
    </body></html>"#;
    let records = ExtractorFactory::new()
        .with_profile(Platform::Facebook, profile)
        .extractor_for(Platform::Facebook)
        .unwrap()
        .enumerate(&page(html, "https://www.facebook.com/"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].author.name, "Ada");
    assert_eq!(records[0].content.text, "Hi");
}

#[test]
fn broken_profiles_are_reported() {
    let profile = SelectorProfile {
        post: vec!["div[[".to_string()],
        ..SelectorProfile::default()
    };
    let err = ExtractorFactory::new()
        .with_profile(Platform::Reddit, profile)
        .extractor_for(Platform::Reddit)
        .err()
        .unwrap();
    assert!(matches!(err, ExtractionError::InvalidSelector { .. }));
}
