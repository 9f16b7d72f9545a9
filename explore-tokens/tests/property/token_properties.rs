use std::sync::LazyLock;

use explore_core::traits::TokenCounter;
use explore_tokens::{TiktokenCounter, WordCounter};
use proptest::prelude::*;

// Building the cl100k_base encoder dominates runtime; share one across cases.
static TIKTOKEN: LazyLock<TiktokenCounter> =
    LazyLock::new(|| TiktokenCounter::new(1_000).unwrap());

proptest! {
    #[test]
    fn word_count_is_additive_across_a_space(a in "[a-z ]{0,60}", b in "[a-z ]{0,60}") {
        let joined = format!("{a} {b}");
        prop_assert_eq!(
            WordCounter.count(&joined),
            WordCounter.count(&a) + WordCounter.count(&b)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn tiktoken_cached_equals_uncached(s in ".{0,200}") {
        prop_assert_eq!(TIKTOKEN.count(&s), TIKTOKEN.count_uncached(&s));
    }

    #[test]
    fn tiktoken_subadditivity(a in ".{0,100}", b in ".{0,100}") {
        let combined = format!("{}{}", a, b);
        prop_assert!(
            TIKTOKEN.count(&combined) <= TIKTOKEN.count(&a) + TIKTOKEN.count(&b) + 1,
            "subadditivity violated for {:?} + {:?}",
            a,
            b
        );
    }
}
