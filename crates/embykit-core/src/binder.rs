//! Canonical/derived field pairs kept consistent in both directions.

/// Pure, total conversion between a canonical value and its derived view.
pub trait FieldCodec {
    type Canonical: Clone + PartialEq;
    type Derived: Clone + PartialEq;

    fn encode(canonical: &Self::Canonical) -> Self::Derived;
    fn decode(derived: &Self::Derived) -> Self::Canonical;
}

/// Which side of a binder was written most recently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LastEdited {
    #[default]
    Canonical,
    Derived,
}

/// Holds a canonical field and its derived rendering.
///
/// Each setter treats the written side as the source of truth for that
/// update and recomputes the other side directly, so a recomputation is
/// never observed as a fresh edit.
pub struct DerivedFieldBinder<C: FieldCodec> {
    canonical: C::Canonical,
    derived: C::Derived,
    last_edited: LastEdited,
}

impl<C: FieldCodec> DerivedFieldBinder<C> {
    pub fn new(canonical: C::Canonical) -> Self {
        let derived = C::encode(&canonical);
        Self {
            canonical,
            derived,
            last_edited: LastEdited::Canonical,
        }
    }

    pub fn from_derived(derived: C::Derived) -> Self {
        let canonical = C::decode(&derived);
        Self {
            canonical,
            derived,
            last_edited: LastEdited::Derived,
        }
    }

    pub fn canonical(&self) -> &C::Canonical {
        &self.canonical
    }

    pub fn derived(&self) -> &C::Derived {
        &self.derived
    }

    pub fn last_edited(&self) -> LastEdited {
        self.last_edited
    }

    pub fn set_canonical(&mut self, canonical: C::Canonical) {
        self.derived = C::encode(&canonical);
        self.canonical = canonical;
        self.last_edited = LastEdited::Canonical;
    }

    /// The derived value is kept exactly as typed; only the canonical side is
    /// recomputed.
    pub fn set_derived(&mut self, derived: C::Derived) {
        self.canonical = C::decode(&derived);
        self.derived = derived;
        self.last_edited = LastEdited::Derived;
    }

    /// True when the derived side decodes to the canonical side.
    pub fn is_consistent(&self) -> bool {
        C::decode(&self.derived) == self.canonical
    }
}

impl<C: FieldCodec> Clone for DerivedFieldBinder<C> {
    fn clone(&self) -> Self {
        Self {
            canonical: self.canonical.clone(),
            derived: self.derived.clone(),
            last_edited: self.last_edited,
        }
    }
}

impl<C: FieldCodec> std::fmt::Debug for DerivedFieldBinder<C>
where
    C::Canonical: std::fmt::Debug,
    C::Derived: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFieldBinder")
            .field("canonical", &self.canonical)
            .field("derived", &self.derived)
            .field("last_edited", &self.last_edited)
            .finish()
    }
}

impl<C: FieldCodec> PartialEq for DerivedFieldBinder<C> {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical && self.derived == other.derived
    }
}

/// Ordered list of identifiers rendered as a comma-separated string.
pub struct CommaList;

impl FieldCodec for CommaList {
    type Canonical = Vec<String>;
    type Derived = String;

    fn encode(list: &Vec<String>) -> String {
        list.join(", ")
    }

    fn decode(text: &String) -> Vec<String> {
        split_comma_list(text)
    }
}

/// Split on commas, trim, drop empty segments.
pub fn split_comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn decode_handles_empty_and_whitespace() {
        assert!(split_comma_list("").is_empty());
        assert!(split_comma_list("   ").is_empty());
        assert!(split_comma_list(" , ,").is_empty());
    }

    #[test]
    fn decode_trims_and_drops_empty_segments() {
        assert_eq!(split_comma_list(" google,, yandex ,"), list(&["google", "yandex"]));
    }

    #[test]
    fn list_survives_encode_decode() {
        let engines = list(&["bing", "google", "baidu"]);
        assert_eq!(CommaList::decode(&CommaList::encode(&engines)), engines);
    }

    #[test]
    fn string_is_normalized_by_decode_encode() {
        let text = "  google ,,yandex , ".to_string();
        assert_eq!(CommaList::encode(&CommaList::decode(&text)), "google, yandex");
    }

    #[test]
    fn setting_canonical_rewrites_derived() {
        let mut binder = DerivedFieldBinder::<CommaList>::new(list(&["bing"]));
        binder.set_canonical(list(&["google", "bing"]));
        assert_eq!(binder.derived(), "google, bing");
        assert_eq!(binder.last_edited(), LastEdited::Canonical);
        assert!(binder.is_consistent());
    }

    #[test]
    fn setting_derived_rewrites_canonical_and_keeps_text() {
        let mut binder = DerivedFieldBinder::<CommaList>::new(list(&["bing", "google"]));
        binder.set_derived("google,  yandex ".to_string());
        assert_eq!(binder.canonical(), &list(&["google", "yandex"]));
        assert_eq!(binder.derived(), "google,  yandex ");
        assert_eq!(binder.last_edited(), LastEdited::Derived);
        assert!(binder.is_consistent());
    }

    #[test]
    fn last_writer_wins_across_alternating_edits() {
        let mut binder = DerivedFieldBinder::<CommaList>::new(Vec::new());
        binder.set_derived("a, b".to_string());
        binder.set_canonical(list(&["c"]));
        assert_eq!(binder.derived(), "c");
        binder.set_derived("".to_string());
        assert!(binder.canonical().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // Items as a user would type them: no commas, no surrounding whitespace.
    fn arb_item() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_.-][A-Za-z0-9_. -]{0,10}[A-Za-z0-9_.-]|[A-Za-z0-9_.-]"
    }

    fn normalized(text: &str) -> String {
        text.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    proptest! {
        #[test]
        fn any_list_survives_encode_decode(items in prop::collection::vec(arb_item(), 0..8)) {
            prop_assert_eq!(CommaList::decode(&CommaList::encode(&items)), items);
        }

        #[test]
        fn any_string_is_normalized_by_decode_encode(text in any::<String>()) {
            let rendered = CommaList::encode(&CommaList::decode(&text));
            prop_assert_eq!(&rendered, &normalized(&text));
            prop_assert_eq!(CommaList::decode(&rendered), CommaList::decode(&text));
        }

        #[test]
        fn binder_is_consistent_after_any_edit_sequence(
            edits in prop::collection::vec(
                prop_oneof![
                    prop::collection::vec(arb_item(), 0..5).prop_map(Ok::<Vec<String>, String>),
                    any::<String>().prop_map(Err::<Vec<String>, String>),
                ],
                1..10,
            )
        ) {
            let mut binder = DerivedFieldBinder::<CommaList>::new(Vec::new());
            for edit in edits {
                match edit {
                    Ok(list) => {
                        binder.set_canonical(list.clone());
                        prop_assert_eq!(binder.canonical(), &list);
                    }
                    Err(text) => {
                        binder.set_derived(text.clone());
                        prop_assert_eq!(binder.derived(), &text);
                    }
                }
                prop_assert!(binder.is_consistent());
            }
        }
    }
}
