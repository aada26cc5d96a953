use archiver_engine::{
    convert, Author, Engagement, MediaFormat, MediaKind, MediaRef, Platform, PostContent,
    PostFlags, PostRecord, PostTimestamp, PostType, RenderOptions, SourceUrls, StoragePath,
    StoredAttachment,
};
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;

fn archived_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 16, 7, 0, 0).unwrap()
}

fn image(name: &str, caption: Option<&str>) -> MediaRef {
    MediaRef {
        kind: MediaKind::Image,
        source_url: format!("https://scontent.example.com/{name}"),
        caption: caption.map(str::to_string),
    }
}

fn record() -> PostRecord {
    PostRecord {
        id: "fb-pfbid0abc".to_string(),
        platform: Platform::Facebook,
        author: Author {
            name: "Jane Doe".to_string(),
            username: Some("jane.doe.42".to_string()),
            profile_url: Some("https://www.facebook.com/jane.doe.42".to_string()),
            avatar_url: None,
        },
        content: PostContent {
            text: "Shipping day!\nSecond line".to_string(),
            raw_markup: None,
        },
        timestamp: PostTimestamp {
            raw: "1760517000".to_string(),
            parsed: Some(Utc.with_ymd_and_hms(2025, 10, 15, 8, 30, 0).unwrap()),
        },
        media_items: vec![image("a.jpg", Some("The crew")), image("b.jpg", None)],
        engagement: Engagement {
            likes: Some(1200),
            comments: Some(34),
            shares: None,
            views: None,
        },
        source_urls: SourceUrls {
            post: "https://www.facebook.com/jane.doe.42/posts/pfbid0abc?__cft__=x".to_string(),
            canonical: Some("https://www.facebook.com/jane.doe.42/posts/pfbid0abc".to_string()),
        },
        flags: PostFlags {
            sponsored: false,
            post_type: PostType::Gallery,
        },
    }
}

fn stored(media: &MediaRef, name: &str) -> StoredAttachment {
    StoredAttachment {
        media: media.clone(),
        path: StoragePath::parse(&format!("Facebook/2025/10/attachments/{name}")).unwrap(),
        relative_path: format!("attachments/{name}"),
        format: Some(MediaFormat::Jpeg),
        size: 3,
    }
}

#[test]
fn renders_a_full_document() {
    let record = record();
    let attachments = vec![stored(&record.media_items[0], "fb-pfbid0abc_1.jpg")];
    let document = convert(&record, &attachments, &RenderOptions::default(), archived_at()).unwrap();

    let expected = "\
---
platform: Facebook
archived: 2025-10-16T07:00:00Z
url: https://www.facebook.com/jane.doe.42/posts/pfbid0abc
post_url: https://www.facebook.com/jane.doe.42/posts/pfbid0abc?__cft__=x
author: Jane Doe
author_username: jane.doe.42
author_url: https://www.facebook.com/jane.doe.42
posted: 2025-10-15T08:30:00Z
post_type: gallery
media_count: 1
id: fb-pfbid0abc
---

# Shipping day!

Shipping day!{BREAK}
Second line

## Media

![[attachments/fb-pfbid0abc_1.jpg]]
*The crew*

## Engagement

- Likes: 1.2K
- Comments: 34
".replace("{BREAK}", "  ");
    assert_eq!(document.to_markdown(), expected);
    assert_eq!(document.title, "Shipping day!");
    assert_eq!(document.filename, "2025-10-15 - Jane Doe - Shipping day!.md");
}

#[test]
fn only_stored_media_is_embedded() {
    let record = record();
    let attachments = vec![stored(&record.media_items[1], "fb-pfbid0abc_2.jpg")];
    let document = convert(&record, &attachments, &RenderOptions::default(), archived_at()).unwrap();

    assert_eq!(document.media_references, ["attachments/fb-pfbid0abc_2.jpg"]);
    assert_eq!(document.body.matches("![[").count(), 1);
    assert!(!document.body.contains("fb-pfbid0abc_1.jpg"));
    assert_eq!(document.frontmatter.get("media_count"), Some("1"));
}

#[test]
fn no_media_section_without_attachments() {
    let document = convert(&record(), &[], &RenderOptions::default(), archived_at()).unwrap();
    assert!(!document.body.contains("## Media"));
    assert!(document.media_references.is_empty());
    assert_eq!(document.frontmatter.get("media_count"), None);
}

#[test]
fn options_drop_optional_sections() {
    let options = RenderOptions {
        include_frontmatter: false,
        include_engagement: false,
        include_media_links: true,
        ..RenderOptions::default()
    };
    let record = record();
    let attachments = vec![stored(&record.media_items[0], "x.jpg")];
    let document = convert(&record, &attachments, &options, archived_at()).unwrap();
    let markdown = document.to_markdown();

    assert!(markdown.starts_with("# Shipping day!\n"));
    assert!(!markdown.contains("## Engagement"));
    assert!(markdown.contains("[Source](https://scontent.example.com/a.jpg)"));
}

#[test]
fn untitled_posts_fall_back_to_archive_date() {
    let mut record = record();
    record.content.text = "   ".to_string();
    record.timestamp = PostTimestamp {
        raw: "3w".to_string(),
        parsed: None,
    };
    record.engagement = Engagement::default();
    record.flags.sponsored = true;

    let document = convert(&record, &[], &RenderOptions::default(), archived_at()).unwrap();
    assert_eq!(document.title, "Untitled post");
    assert_eq!(document.filename, "2025-10-16 - Jane Doe - Untitled post.md");
    assert_eq!(document.frontmatter.get("posted"), Some("3w"));
    assert_eq!(document.frontmatter.get("sponsored"), Some("true"));
    assert_eq!(document.body, "# Untitled post\n");
}

#[test]
fn markup_characters_are_escaped() {
    let mut record = record();
    record.content.text = "*bold* claims [link]\n- not a list".to_string();
    record.engagement = Engagement::default();
    let document = convert(&record, &[], &RenderOptions::default(), archived_at()).unwrap();

    assert!(document
        .body
        .contains("\\*bold\\* claims \\[link\\]  \n\\- not a list"));
}

#[test]
fn tags_and_mentions_stay_live_in_the_body() {
    let mut record = record();
    record.content.text = "Thanks @ferris_crab!\n# Breaking news #rust_lang\n## Media".to_string();
    record.engagement = Engagement::default();
    let document = convert(&record, &[], &RenderOptions::default(), archived_at()).unwrap();

    assert_eq!(
        document.body,
        "# Thanks @ferris_crab!\n\n\
         Thanks @ferris_crab!  \n\\# Breaking news #rust_lang  \n\\## Media\n"
    );
    assert!(!document.body.contains("\n## Media"));
}

#[test]
fn titles_are_escaped_like_the_body() {
    let mut record = record();
    record.content.text = "[draft] *wip* for @ferris_crab".to_string();
    record.engagement = Engagement::default();

    let document = convert(&record, &[], &RenderOptions::default(), archived_at()).unwrap();
    assert!(document
        .body
        .starts_with("# \\[draft\\] \\*wip\\* for @ferris_crab\n"));
    assert_eq!(document.title, "[draft] *wip* for @ferris_crab");

    let plain = RenderOptions {
        preserve_formatting: false,
        ..RenderOptions::default()
    };
    let document = convert(&record, &[], &plain, archived_at()).unwrap();
    assert!(document.body.starts_with("# [draft] *wip* for @ferris_crab\n"));
}
