use rand::Rng;

/// True with probability `prob`/1000.
pub(crate) fn pick_with_prob<R: Rng>(rng: &mut R, prob: u32) -> bool {
    debug_assert!(prob <= 1000);
    rng.gen_range(0..1000) < prob
}

/// Uniform pick from the inclusive range `[lo, hi]`.
pub(crate) fn pick_rand<R: Rng>(rng: &mut R, lo: u32, hi: u32) -> u32 {
    debug_assert!(lo <= hi);
    rng.gen_range(lo..=hi)
}
