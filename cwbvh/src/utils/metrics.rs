/// Runs `f`, logging how long it took when the `metrics` feature is enabled.
#[cfg(feature = "metrics")]
pub fn measure<T>(metric: &str, f: impl FnOnce() -> T) -> T {
    use std::time::Instant;

    let tt = Instant::now();
    let result = f();
    let tt = tt.elapsed();

    log::info!("{}: {}", metric, humantime::format_duration(tt));

    result
}

#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn measure<T>(_metric: &str, f: impl FnOnce() -> T) -> T {
    f()
}
