//! Board page rendering from a template on disk.
//!
//! The template is read and compiled on every call so edits show up without a
//! restart. Every value is HTML-escaped unless the template marks it `safe`;
//! commit data comes from upstream and is not trusted.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use minijinja::{
    AutoEscape, Environment, Error, ErrorKind, HtmlEscape, Output, State, UndefinedBehavior, Value,
};
use serde::Serialize;

use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::models::build::Build;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Template view of one build: raw upstream fields plus derived timings.
#[derive(Debug, Serialize)]
pub struct BuildRow<'a> {
    pub build_number: i64,
    pub build_status: &'a str,
    pub author: &'a str,
    pub branch: &'a str,
    pub commit_sha: &'a str,
    pub short_sha: &'a str,
    pub url: &'a str,
    /// `url` when it is an http(s) link, `#` otherwise.
    pub link: &'a str,
    pub message: &'a str,
    pub tags: &'a [String],
    pub started: bool,
    pub finished: bool,
    pub created_at: String,
    pub started_at: String,
    pub finished_at: String,
    pub queue_duration: i64,
    pub build_duration: i64,
    pub total_duration: String,
}

impl<'a> From<&'a Build> for BuildRow<'a> {
    fn from(build: &'a Build) -> Self {
        let commit = &build.commit_info;
        Self {
            build_number: build.build_number,
            build_status: &build.build_status,
            author: &commit.author,
            branch: &commit.branch,
            commit_sha: &commit.commit_sha,
            short_sha: commit.commit_sha.get(..7).unwrap_or(&commit.commit_sha),
            url: &commit.url,
            link: safe_link(&commit.url),
            message: &commit.message,
            tags: &commit.tags,
            started: build.started_at != DateTime::<Utc>::default(),
            finished: build.finished,
            created_at: format_timestamp(build.created_at),
            started_at: format_timestamp(build.started_at),
            finished_at: format_timestamp(build.finished_at),
            queue_duration: build.queue_duration(),
            build_duration: build.build_duration(),
            total_duration: format_duration(build.total_duration()),
        }
    }
}

/// Only http(s) URLs may end up in an `href`.
fn safe_link(url: &str) -> &str {
    let scheme = url
        .trim_start()
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("http") | Some("https") => url,
        _ => "#",
    }
}

#[derive(Debug, Serialize)]
struct BoardContext<'a> {
    application: &'a str,
    branch: &'a str,
    builds: Vec<BuildRow<'a>>,
}

#[derive(Clone, Debug)]
pub struct PageRenderer {
    template_path: PathBuf,
    application: String,
}

impl PageRenderer {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            template_path: config.template_path.clone(),
            application: config.application.clone(),
        }
    }

    /// Render the board for `builds`, keeping their order.
    pub async fn render(&self, branch: &str, builds: &[Build]) -> Result<String, BoardError> {
        let source = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| BoardError::TemplateRead {
                path: self.template_path.clone(),
                source,
            })?;

        let context = BoardContext {
            application: &self.application,
            branch,
            builds: builds.iter().map(BuildRow::from).collect(),
        };

        render_source(&self.template_path, &source, &context)
    }
}

fn render_source<S: Serialize>(path: &Path, source: &str, context: &S) -> Result<String, BoardError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_formatter(html_formatter);

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("main.html");
    let parse_error = |source| BoardError::TemplateParse {
        path: path.to_path_buf(),
        source,
    };

    env.add_template(name, source).map_err(parse_error)?;
    let template = env.get_template(name).map_err(parse_error)?;
    template.render(context).map_err(BoardError::Render)
}

/// Like minijinja's default formatter, but leaves `/` alone so commit URLs
/// come out readable.
fn html_formatter(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    match value.as_str() {
        Some(s) if matches!(state.auto_escape(), AutoEscape::Html) && !value.is_safe() => out
            .write_str(&escape_html(s))
            .map_err(|e| Error::new(ErrorKind::WriteFailure, "failed to write escaped value").with_source(e)),
        _ => minijinja::escape_formatter(out, state, value),
    }
}

/// A `&#x2f;` in the output can only come from a `/`: a literal one in the
/// input has its `&` escaped first.
fn escape_html(s: &str) -> String {
    HtmlEscape(s).to_string().replace("&#x2f;", "/")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// `1h2m3s` style, whole seconds, `-` prefix when negative.
pub fn format_duration(delta: TimeDelta) -> String {
    let secs = delta.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);

    let mut out = String::from(sign);
    if hours > 0 {
        let _ = write!(out, "{hours}h{minutes}m");
    } else if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{seconds}s");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED_TEMPLATE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/main.html");

    fn renderer(template_path: impl Into<PathBuf>) -> PageRenderer {
        PageRenderer {
            template_path: template_path.into(),
            application: "Fennec".to_string(),
        }
    }

    fn sample_build() -> Build {
        let json = r#"{
            "build_number": 4242,
            "build_status": "success",
            "commit_info": {
                "author": "Jane Dev",
                "branch": "release-58",
                "commit_sha": "0123456789abcdef0123456789abcdef01234567",
                "html_url": "https://github.com/mozilla-mobile/fennec/commit/0123456789abcdef",
                "message": "Bug 1436270 - Update strings",
                "tags": ["v58.0b1", "nightly"]
            },
            "created_at": "2018-03-01T10:00:00Z",
            "finished": true,
            "finished_at": "2018-03-01T10:20:05Z",
            "started_at": "2018-03-01T10:01:30Z"
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn row_carries_derived_metrics() {
        let build = sample_build();
        let row = BuildRow::from(&build);
        assert_eq!(row.short_sha, "0123456");
        assert_eq!(row.queue_duration, 7);
        assert_eq!(row.build_duration, (1115 + 15) / 15);
        assert_eq!(row.total_duration, "20m5s");
        assert_eq!(row.created_at, "2018-03-01 10:00:00");
        assert!(row.started);
        assert_eq!(row.link, row.url);
    }

    #[test]
    fn only_http_urls_become_links() {
        assert_eq!(safe_link("https://example.com/c/1"), "https://example.com/c/1");
        assert_eq!(safe_link("HTTP://example.com"), "HTTP://example.com");
        assert_eq!(safe_link("javascript:alert(1)"), "#");
        assert_eq!(safe_link("  JavaScript:alert(1)"), "#");
        assert_eq!(safe_link("data:text/html;base64,PHNjcmlwdD4="), "#");
        assert_eq!(safe_link("/relative/path"), "#");
        assert_eq!(safe_link(""), "#");
    }

    #[tokio::test]
    async fn script_urls_never_reach_href() {
        let mut build = sample_build();
        build.commit_info.url = "javascript:alert(document.cookie)".to_string();

        let html = renderer(SHIPPED_TEMPLATE).render("", &[build]).await.unwrap();

        assert!(!html.contains("href=\"javascript:"));
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("javascript:alert(document.cookie)"));
    }

    #[tokio::test]
    async fn queued_build_shows_no_tick_counts() {
        let json = r#"{
            "build_number": 4243,
            "build_status": "queued",
            "commit_info": {"author": "a", "branch": "master", "commit_sha": "abc", "html_url": "", "message": "m", "tags": []},
            "created_at": "2018-03-01T10:00:00Z",
            "finished": false,
            "finished_at": null,
            "started_at": null
        }"#;
        let build: Build = serde_json::from_str(json).unwrap();
        let row = BuildRow::from(&build);
        assert!(!row.started);
        assert!(row.queue_duration < 0);

        let html = renderer(SHIPPED_TEMPLATE)
            .render("", std::slice::from_ref(&build))
            .await
            .unwrap();

        assert!(!html.contains(&build.queue_duration().to_string()));
        assert!(!html.contains("1970-01-01"));
        assert!(html.contains("running"));
    }

    #[test]
    fn escaping_keeps_slashes_and_literal_entities() {
        assert_eq!(escape_html("https://a.b/c?d=1&e=2"), "https://a.b/c?d=1&amp;e=2");
        assert_eq!(escape_html("&#x2f;"), "&amp;#x2f;");
        assert_eq!(escape_html("<a href='x'>"), "&lt;a href=&#x27;x&#x27;&gt;");
    }

    #[test]
    fn short_sha_tolerates_short_values() {
        let mut build = sample_build();
        build.commit_info.commit_sha = "abc".to_string();
        assert_eq!(BuildRow::from(&build).short_sha, "abc");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(TimeDelta::zero()), "0s");
        assert_eq!(format_duration(TimeDelta::seconds(45)), "45s");
        assert_eq!(format_duration(TimeDelta::seconds(120)), "2m0s");
        assert_eq!(format_duration(TimeDelta::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(TimeDelta::seconds(3600)), "1h0m0s");
        assert_eq!(format_duration(TimeDelta::seconds(-65)), "-1m5s");
    }

    #[tokio::test]
    async fn shipped_template_shows_every_build_field() {
        let build = sample_build();
        let html = renderer(SHIPPED_TEMPLATE)
            .render("release-58", std::slice::from_ref(&build))
            .await
            .unwrap();

        for expected in [
            "Fennec",
            "4242",
            "success",
            "Jane Dev",
            "release-58",
            "0123456789abcdef0123456789abcdef01234567",
            "https://github.com/mozilla-mobile/fennec/commit/0123456789abcdef",
            "Bug 1436270 - Update strings",
            "v58.0b1",
            "nightly",
            "2018-03-01 10:00:00",
            "20m5s",
        ] {
            assert!(html.contains(expected), "missing {expected:?} in output");
        }
    }

    #[tokio::test]
    async fn shipped_template_keeps_upstream_order() {
        let first = sample_build();
        let mut second = sample_build();
        second.build_number = 4241;

        let html = renderer(SHIPPED_TEMPLATE)
            .render("", &[first, second])
            .await
            .unwrap();

        let newer = html.find("4242").unwrap();
        let older = html.find("4241").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn empty_build_list_renders_no_rows() {
        let html = renderer(SHIPPED_TEMPLATE).render("", &[]).await.unwrap();
        assert!(html.contains("Fennec"));
        assert!(!html.contains("class=\"build "));
    }

    #[tokio::test]
    async fn untrusted_fields_are_escaped() {
        let mut build = sample_build();
        build.commit_info.message = "<script>alert('x')</script>".to_string();
        build.commit_info.author = "\"><img src=x onerror=alert(1)>".to_string();
        build.commit_info.tags = vec!["<b>tag</b>".to_string()];

        let html = renderer(SHIPPED_TEMPLATE)
            .render("<i>branch</i>", &[build])
            .await
            .unwrap();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<b>tag</b>"));
        assert!(!html.contains("<i>branch</i>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(html.contains("&lt;b&gt;tag&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn missing_template_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(dir.path().join("absent.html"))
            .render("", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::TemplateRead { .. }));
        assert_eq!(err.stage(), "template_load");
    }

    #[tokio::test]
    async fn malformed_template_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.html");
        std::fs::write(&path, "{% for build in builds %}<p>{{ build.build_number }}").unwrap();

        let err = renderer(&path).render("", &[]).await.unwrap_err();
        assert!(matches!(err, BoardError::TemplateParse { .. }));
        assert_eq!(err.stage(), "template_load");
    }

    #[tokio::test]
    async fn unknown_field_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.html");
        std::fs::write(&path, "<h1>{{ application }}</h1>{{ maintainer }}").unwrap();

        let err = renderer(&path).render("", &[]).await.unwrap_err();
        assert!(matches!(err, BoardError::Render(_)));
        assert_eq!(err.stage(), "render");
    }

    #[tokio::test]
    async fn custom_template_sees_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.html");
        std::fs::write(
            &path,
            "{{ application }}:{% for b in builds %}{{ b.build_number }}/{{ b.queue_duration }}{% endfor %}",
        )
        .unwrap();

        let html = renderer(&path).render("", &[sample_build()]).await.unwrap();
        assert_eq!(html, "Fennec:4242/7");
    }
}
