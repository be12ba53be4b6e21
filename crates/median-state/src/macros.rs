/// Runs a block, logs how long it took at `debug` level and returns
/// `(result, duration)`.
#[macro_export]
macro_rules! measure_time {
    ($label:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = { $block };
        let duration = start.elapsed();
        $crate::tracing::debug!(label = $label, ?duration, "Execution time");
        (result, duration)
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_measure_time_returns_block_value() {
        let (value, duration) = measure_time!("sum", { (1..=10).sum::<u32>() });
        assert_eq!(value, 55);
        assert!(duration.as_secs() < 60);
    }
}
