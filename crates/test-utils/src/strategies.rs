//! Proptest strategies over the repository identifier types.

use nebula_repository_types::{Name, Tag, Version};
use proptest::prelude::*;

/// Any tag.
pub fn tag() -> impl Strategy<Value = Tag> {
    any::<[u8; 20]>().prop_map(Tag::from_bytes)
}

/// Any version with 1–4 components in 1..1000.
pub fn version() -> impl Strategy<Value = Version> {
    prop::collection::vec(1u32..1000, 1..5)
        .prop_map(|components| Version::new(components).expect("components are positive"))
}

/// Any valid hierarchical name with 1–4 segments.
pub fn name() -> impl Strategy<Value = Name> {
    prop::collection::vec("[A-Za-z0-9][A-Za-z0-9.-]{0,11}", 1..5).prop_map(|segments| {
        Name::new(format!("/{}", segments.join("/"))).expect("generated segments are valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_generated_names_round_trip(name in name()) {
            let parsed: Name = name.as_str().parse().unwrap();
            prop_assert_eq!(parsed, name);
        }

        #[test]
        fn prop_generated_versions_order_below_next(version in version()) {
            prop_assert!(version < version.next());
        }

        #[test]
        fn prop_generated_tags_round_trip(tag in tag()) {
            let parsed: Tag = tag.to_string().parse().unwrap();
            prop_assert_eq!(parsed, tag);
        }
    }
}
