use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static RE_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid regex: blank lines"));

static RE_MD_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([\\`*_{}\[\]()#+\-.!~|>])").expect("invalid regex: markdown escapes")
});

pub(crate) fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What to read from the first element a strategy's selector matches.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    Text,
    Attr(&'static str),
}

/// One candidate (selector, target) pair in a field's fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub selector: &'static str,
    pub target: Target,
}

/// A named field with its strategies in priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub strategies: &'static [Strategy],
}

pub const TITLE_SPEC: FieldSpec = FieldSpec {
    name: "title",
    strategies: &[
        Strategy {
            selector: r#"div[data-testid="report-title"] span.line-clamp-2"#,
            target: Target::Text,
        },
        Strategy {
            selector: r#"div[data-testid="report-title"]"#,
            target: Target::Text,
        },
    ],
};

pub const DETAIL_URL_SPEC: FieldSpec = FieldSpec {
    name: "url",
    strategies: &[
        Strategy {
            selector: r".md\:text-md a",
            target: Target::Attr("href"),
        },
        Strategy {
            selector: r#"a[href*="/reports/"]"#,
            target: Target::Attr("href"),
        },
    ],
};

/// The fixed, non-exhaustive metadata fields of a hacktivity item.
/// Any of these may be absent from a given item.
pub const METADATA_SPECS: &[FieldSpec] = &[
    FieldSpec {
        name: "bounty",
        strategies: &[
            Strategy {
                selector: ".spec-amount-in-currency span",
                target: Target::Text,
            },
            Strategy {
                selector: ".spec-amount-in-currency",
                target: Target::Text,
            },
        ],
    },
    FieldSpec {
        name: "severity",
        strategies: &[
            Strategy {
                selector: r#"span[data-testid="report-severity"] span span span span span"#,
                target: Target::Text,
            },
            Strategy {
                selector: r#"span[data-testid="report-severity"]"#,
                target: Target::Text,
            },
        ],
    },
    FieldSpec {
        name: "date",
        strategies: &[Strategy {
            selector: "span[title]",
            target: Target::Attr("title"),
        }],
    },
];

/// Try `spec`'s strategies in order against `node` and return the
/// first non-empty value. Every strategy attempt is fault-isolated: a
/// selector that fails to parse or matches nothing just falls through
/// to the next one. `None` means "not observed" and callers must omit
/// the field rather than store an empty placeholder.
pub fn extract_field(node: ElementRef, spec: &FieldSpec) -> Option<String> {
    for strategy in spec.strategies {
        let Ok(selector) = Selector::parse(strategy.selector) else {
            log::debug!(
                "Skipping unparsable selector '{}' for field '{}'",
                strategy.selector,
                spec.name
            );
            continue;
        };

        let Some(element) = node.select(&selector).next() else {
            continue;
        };

        let value = match strategy.target {
            Target::Text => normalize_whitespace(&elem_text(element)),
            Target::Attr(attr) => element
                .value()
                .attr(attr)
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
        };

        if !value.is_empty() {
            return Some(value);
        }
    }
    None
}

/// Which markup shape a detail page's body was found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTier {
    /// Structured report markup inside `#report-information`.
    Report,
    /// Fallback plain-summary template.
    Summary,
}

const BODY_TIERS: &[(BodyTier, &str)] = &[
    (
        BodyTier::Report,
        "div#report-information div.spec-vulnerability-information div.interactive-markdown",
    ),
    (BodyTier::Summary, "div.spec-full-summary-content"),
];

/// Locate the report body container on a detail page, trying the
/// structured-report markup first and the plain-summary template
/// second. Returns the matched tier and the container's inner HTML.
pub fn locate_body(html: &str) -> Option<(BodyTier, String)> {
    let document = Html::parse_document(html);

    for (tier, selector) in BODY_TIERS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&sel).next() {
            log::info!("Report content found with {:?} tier selector", tier);
            return Some((*tier, element.inner_html()));
        }
    }
    None
}

/// Remove injected decorative SVGs and embedded code blocks from a
/// body fragment. The tier that matched is passed in so shape-specific
/// cleanup never has to re-detect the template. Code is excluded: the
/// extraction target is the narrative description, not payload code.
/// Idempotent up to whitespace normalization.
pub fn strip_noise(tier: BodyTier, html: &str) -> String {
    let mut fragment = Html::parse_fragment(html);

    // Both templates currently inject the same decorative menu SVGs.
    let decorative = match tier {
        BodyTier::Report | BodyTier::Summary => "svg.injected-svg",
    };
    detach_matching(&mut fragment, decorative);

    let code_blocks = detach_matching(&mut fragment, "div.interactive-markdown__code");
    if code_blocks > 0 {
        log::info!("Removed {} code blocks from report content", code_blocks);
    }

    fragment.root_element().inner_html()
}

fn detach_matching(fragment: &mut Html, selector: &str) -> usize {
    let Ok(sel) = Selector::parse(selector) else {
        return 0;
    };
    let ids: Vec<_> = fragment.select(&sel).map(|el| el.id()).collect();
    let count = ids.len();
    for id in ids {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    count
}

/// Flatten sanitized markup to readable markdown. The converter
/// backslash-escapes markdown punctuation it finds in text nodes;
/// those escapes are collapsed so literal punctuation survives
/// verbatim and re-running the conversion on its own output only
/// renormalizes whitespace.
pub fn to_markdown(html: &str) -> String {
    let markdown = htmd::convert(html).unwrap_or_default();
    let markdown = RE_MD_ESCAPE.replace_all(&markdown, "$1");
    RE_BLANK_LINES.replace_all(&markdown, "\n\n").trim().to_string()
}

/// Full body pipeline for one detail page: tiered location, noise
/// stripping, markdown conversion. `None` means no tier matched.
pub fn extract_report_body(html: &str) -> Option<String> {
    let (tier, raw) = locate_body(html)?;
    Some(to_markdown(&strip_noise(tier, &raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    #[test]
    fn first_strategy_wins_over_later_ones() {
        const SPEC: FieldSpec = FieldSpec {
            name: "probe",
            strategies: &[
                Strategy {
                    selector: "span.primary",
                    target: Target::Text,
                },
                Strategy {
                    selector: "span.secondary",
                    target: Target::Text,
                },
            ],
        };

        let doc = root(r#"<div><span class="primary">first</span><span class="secondary">second</span></div>"#);
        let value = extract_field(doc.root_element(), &SPEC);
        assert_eq!(value.as_deref(), Some("first"));
    }

    #[test]
    fn failed_strategy_falls_through_to_next() {
        const SPEC: FieldSpec = FieldSpec {
            name: "probe",
            strategies: &[
                // Unparsable selector: must be isolated, not abort extraction.
                Strategy {
                    selector: "span..[",
                    target: Target::Text,
                },
                // Matches nothing.
                Strategy {
                    selector: "span.missing",
                    target: Target::Text,
                },
                Strategy {
                    selector: "span.secondary",
                    target: Target::Text,
                },
            ],
        };

        let doc = root(r#"<div><span class="secondary">fallback</span></div>"#);
        let value = extract_field(doc.root_element(), &SPEC);
        assert_eq!(value.as_deref(), Some("fallback"));
    }

    #[test]
    fn empty_matches_do_not_win() {
        const SPEC: FieldSpec = FieldSpec {
            name: "probe",
            strategies: &[
                Strategy {
                    selector: "span.primary",
                    target: Target::Text,
                },
                Strategy {
                    selector: "span.secondary",
                    target: Target::Text,
                },
            ],
        };

        let doc = root(r#"<div><span class="primary">   </span><span class="secondary">real</span></div>"#);
        let value = extract_field(doc.root_element(), &SPEC);
        assert_eq!(value.as_deref(), Some("real"));
    }

    #[test]
    fn exhausted_chain_yields_none() {
        const SPEC: FieldSpec = FieldSpec {
            name: "probe",
            strategies: &[Strategy {
                selector: "span.primary",
                target: Target::Text,
            }],
        };

        let doc = root("<div><p>unrelated</p></div>");
        assert_eq!(extract_field(doc.root_element(), &SPEC), None);
    }

    #[test]
    fn attribute_target_reads_attribute() {
        const SPEC: FieldSpec = FieldSpec {
            name: "date",
            strategies: &[Strategy {
                selector: "span[title]",
                target: Target::Attr("title"),
            }],
        };

        let doc = root(r#"<div><span title="June 3, 2024">3 months ago</span></div>"#);
        let value = extract_field(doc.root_element(), &SPEC);
        assert_eq!(value.as_deref(), Some("June 3, 2024"));
    }

    const REPORT_TIER_PAGE: &str = r#"
        <html><body>
            <div id="report-information">
                <div class="spec-vulnerability-information">
                    <div class="interactive-markdown">
                        <svg class="injected-svg"><title>menu</title></svg>
                        <p>A heap overflow in the <strong>parser</strong>.</p>
                        <div class="interactive-markdown__code"><pre>payload()</pre></div>
                        <p>Impact: remote code execution.</p>
                    </div>
                </div>
            </div>
        </body></html>
    "#;

    const SUMMARY_TIER_PAGE: &str = r#"
        <html><body>
            <div class="spec-full-summary-content">
                <svg class="injected-svg"><title>menu</title></svg>
                <p>Summary-only disclosure without full report markup.</p>
            </div>
        </body></html>
    "#;

    #[test]
    fn locate_body_prefers_report_tier() {
        let (tier, html) = locate_body(REPORT_TIER_PAGE).expect("tier should match");
        assert_eq!(tier, BodyTier::Report);
        assert!(html.contains("heap overflow"));
    }

    #[test]
    fn locate_body_falls_back_to_summary_tier() {
        let (tier, html) = locate_body(SUMMARY_TIER_PAGE).expect("tier should match");
        assert_eq!(tier, BodyTier::Summary);
        assert!(html.contains("Summary-only disclosure"));
    }

    #[test]
    fn locate_body_exhaustion_is_none() {
        assert_eq!(locate_body("<html><body><p>404</p></body></html>"), None);
    }

    #[test]
    fn strip_noise_removes_svg_and_code_blocks() {
        let html = r#"<svg class="injected-svg"><title>menu</title></svg>
            <p>keep me</p>
            <div class="interactive-markdown__code"><pre>drop me</pre></div>"#;

        let clean = strip_noise(BodyTier::Report, html);
        assert!(clean.contains("keep me"));
        assert!(!clean.contains("drop me"));
        assert!(!clean.contains("injected-svg"));
    }

    #[test]
    fn strip_noise_is_idempotent() {
        let html = r#"<p>intro</p>
            <svg class="injected-svg"><title>menu</title></svg>
            <div class="interactive-markdown__code"><pre>x = 1</pre></div>
            <p>outro</p>"#;

        let once = strip_noise(BodyTier::Report, html);
        let twice = strip_noise(BodyTier::Report, &once);
        assert_eq!(normalize_whitespace(&once), normalize_whitespace(&twice));

        // And on noise-free input it is a pure no-op.
        let plain = "<p>nothing to remove</p>";
        assert_eq!(
            normalize_whitespace(&strip_noise(BodyTier::Summary, plain)),
            normalize_whitespace(plain)
        );
    }

    #[test]
    fn extract_report_body_from_report_tier() {
        let body = extract_report_body(REPORT_TIER_PAGE).expect("body should extract");
        assert!(body.contains("heap overflow"));
        assert!(body.contains("Impact: remote code execution."));
        assert!(!body.contains("payload()"));
    }

    #[test]
    fn extract_report_body_from_summary_tier() {
        let body = extract_report_body(SUMMARY_TIER_PAGE).expect("body should extract");
        assert!(body.contains("Summary-only disclosure"));
        assert!(!body.contains("menu"));
    }

    #[test]
    fn extract_report_body_none_when_no_tier_matches() {
        assert_eq!(extract_report_body("<html><body></body></html>"), None);
    }

    #[test]
    fn to_markdown_is_stable_on_its_own_output() {
        let html = "<p>Fix uses <strong>bold</strong> and a literal *star* and _underscore_.</p>";

        let once = to_markdown(html);
        assert!(once.contains("**bold**"));
        assert!(once.contains("*star*"));
        assert!(!once.contains('\\'), "no escape layer may survive: {once}");

        let twice = to_markdown(&once);
        assert_eq!(normalize_whitespace(&once), normalize_whitespace(&twice));
    }

    #[test]
    fn to_markdown_keeps_literal_backslashes_stable() {
        let once = to_markdown(r"<p>path C:\tmp and regex \d+</p>");
        let twice = to_markdown(&once);
        assert_eq!(normalize_whitespace(&once), normalize_whitespace(&twice));
    }

    #[test]
    fn to_markdown_collapses_blank_runs() {
        let markdown = to_markdown("<p>one</p>\n\n\n\n<p>two</p>");
        assert!(markdown.contains("one"));
        assert!(markdown.contains("two"));
        assert!(!markdown.contains("\n\n\n"));
    }
}
