//! Items → text.

use crate::model::ConfigItem;

/// One file's contribution to a merged namespace document.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub name: &'a str,
    pub items: &'a [ConfigItem],
}

fn render_item(item: &ConfigItem) -> String {
    match item.comment.as_deref() {
        Some(comment) if !comment.is_empty() => {
            format!("# {}\n{}={}", comment, item.key, item.value)
        }
        _ => format!("{}={}", item.key, item.value),
    }
}

/// Serialize items in order, one `key=value` per line.
pub fn serialize(items: &[ConfigItem]) -> String {
    items.iter().map(render_item).collect::<Vec<_>>().join("\n")
}

/// Merge several files into the published document.
///
/// ```text
/// [app.conf]
/// a=1
///
/// [db.conf]
/// # primary
/// host=db1
/// ```
pub fn render_document(sections: &[Section<'_>]) -> String {
    sections
        .iter()
        .map(|section| format!("[{}]\n{}\n", section.name, serialize(section.items)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse;

    fn sample() -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("host", "db1").with_comment("primary database"),
            ConfigItem::new("port", "5432"),
            ConfigItem::new("pool", "16").with_comment("connections # per worker"),
        ]
    }

    #[test]
    fn test_serialize_layout() {
        assert_eq!(
            serialize(&sample()),
            "# primary database\nhost=db1\nport=5432\n# connections # per worker\npool=16"
        );
        assert_eq!(serialize(&[]), "");
    }

    #[test]
    fn test_round_trip_preserves_content_and_order() {
        let items = sample();
        let parsed = parse(&serialize(&items));
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.items, items);
    }

    #[test]
    fn test_render_document_sections() {
        let app = vec![ConfigItem::new("x", "5")];
        let db = sample();
        let doc = render_document(&[
            Section { name: "app.conf", items: &app },
            Section { name: "db.conf", items: &db },
        ]);
        assert!(doc.starts_with("[app.conf]\nx=5\n\n[db.conf]\n# primary database\nhost=db1"));
        assert!(doc.ends_with("pool=16\n"));
    }

    #[test]
    fn test_render_empty_namespace() {
        assert_eq!(render_document(&[]), "");
    }

    mod round_trip {
        use proptest::prelude::*;

        use crate::codec::{collapse_duplicates, parse, serialize};
        use crate::model::ConfigItem;

        /// Trimmed keys without `=`; the empty key is in range.
        fn arb_key() -> impl Strategy<Value = String> {
            "([a-z][a-z0-9_. ]{0,6}[a-z0-9])?"
        }

        /// Trimmed values without `=`; may be empty or contain `#`.
        fn arb_value() -> impl Strategy<Value = String> {
            "([a-zA-Z0-9_:/.#-]([a-zA-Z0-9_:/. #-]{0,10}[a-zA-Z0-9_:/.#-])?)?"
        }

        fn arb_comment() -> impl Strategy<Value = Option<String>> {
            proptest::option::of("[a-zA-Z0-9=#]([a-zA-Z0-9 =#]{0,10}[a-zA-Z0-9=#])?")
        }

        fn arb_items(max_count: usize) -> impl Strategy<Value = Vec<ConfigItem>> {
            proptest::collection::hash_set(arb_key(), 0..max_count).prop_flat_map(|keys| {
                let keys: Vec<String> = keys.into_iter().collect();
                let n = keys.len();
                proptest::collection::vec((arb_value(), arb_comment()), n..=n).prop_map(
                    move |rest| {
                        keys.clone()
                            .into_iter()
                            .zip(rest)
                            .map(|(key, (value, comment))| ConfigItem { key, value, comment })
                            .collect::<Vec<_>>()
                    },
                )
            })
        }

        proptest! {
            /// Serialized items parse back to the same sequence.
            #[test]
            fn prop_serialize_then_parse_is_identity(items in arb_items(12)) {
                let parsed = parse(&serialize(&items));
                prop_assert!(parsed.warnings.is_empty());
                prop_assert_eq!(parsed.items, items);
            }

            /// Collapsing leaves unique keys and is stable on its own output.
            #[test]
            fn prop_collapse_is_idempotent(
                items in arb_items(8),
                repeats in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
                value in arb_value(),
            ) {
                let mut input = items.clone();
                if !items.is_empty() {
                    for idx in repeats {
                        let mut item = idx.get(&items).clone();
                        item.value = value.clone();
                        input.push(item);
                    }
                }

                let once = collapse_duplicates(input);
                prop_assert_eq!(once.len(), items.len());
                let keys: Vec<&str> = once.iter().map(|i| i.key.as_str()).collect();
                let expected: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
                prop_assert_eq!(keys, expected);
                prop_assert_eq!(collapse_duplicates(once.clone()), once);
            }
        }
    }
}
