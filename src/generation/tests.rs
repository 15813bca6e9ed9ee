use super::*;

#[test]
fn token_usage_totals() {
    let usage = TokenUsage::new(120, 30);
    assert_eq!(usage.total_tokens, 150);

    let mut sum = TokenUsage::default();
    sum += usage;
    sum += TokenUsage::new(10, 5);
    assert_eq!(sum, TokenUsage::new(130, 35));
}

#[test]
fn tracker_counts_missing_usage_as_zero() {
    let mut tracker = UsageTracker::new();
    tracker.record(None);

    assert_eq!(tracker.usage(), TokenUsage::default());
    assert_eq!(tracker.calls(), 1);
    assert_eq!(tracker.calls_without_usage(), 1);
}

#[test]
fn tracker_accumulates_reported_usage() {
    let mut tracker = UsageTracker::new();
    tracker.record(Some(TokenUsage::new(40, 2)));
    tracker.record(None);
    tracker.record(Some(TokenUsage::new(8, 1)));

    assert_eq!(tracker.usage().total_tokens, 51);
    assert_eq!(tracker.calls(), 3);
    assert_eq!(tracker.calls_without_usage(), 1);
}

#[test]
fn generation_builder() {
    let generation = Generation::new("Paris").with_usage(TokenUsage::new(3, 1));
    assert_eq!(generation.text, "Paris");
    assert_eq!(generation.usage.map(|u| u.total_tokens), Some(4));

    assert_eq!(Generation::new("").usage, None);
}
